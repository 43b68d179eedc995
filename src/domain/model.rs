use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One document of the store, addressed by its path (`users/<uid>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub path: String,
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(path: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Migrated,
    /// No legacy fields; already migrated or never written by the old client.
    Skipped,
    /// Legacy fields next to new-shape ones; left alone so newer data survives.
    MixedShape,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Migrated => "migrated",
            Self::Skipped => "skipped",
            Self::MixedShape => "mixed_shape",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub path: String,
    pub status: MigrationStatus,
    pub semesters: Vec<String>,
    pub course_entries: usize,
    pub unmapped_fields: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// Records as they should be stored after the run.
    pub processed_records: Vec<Record>,
    /// Records exactly as they were extracted.
    pub source_records: Vec<Record>,
    pub outcomes: Vec<DocumentOutcome>,
}
