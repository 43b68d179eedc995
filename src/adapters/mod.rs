// Adapters layer: concrete implementations for external systems (document stores, local files).

pub mod backup_file;
pub mod firestore;
pub mod storage;
