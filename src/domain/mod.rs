// Domain layer: document model and the ports the pipelines talk through.

pub mod model;
pub mod ports;
