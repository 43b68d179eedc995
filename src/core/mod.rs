pub mod etl;
pub mod migrate;

pub use crate::domain::model::{DocumentOutcome, MigrationStatus, Record, TransformResult};
pub use crate::domain::ports::{DocumentStore, Pipeline, Storage};
pub use crate::utils::error::Result;
