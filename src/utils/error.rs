use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigratorError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Document store returned {status}: {message}")]
    StoreError { status: u16, message: String },

    #[error("Failed to decode document: {message}")]
    DecodeError { message: String },

    #[error("missing semester for course list (field `{field}`)")]
    MissingSemester { field: String },

    #[error("field `{field}` has an unexpected shape, expected {expected}")]
    UnexpectedShape {
        field: String,
        expected: &'static str,
    },

    #[error("course key `{key}` does not name a semester")]
    MalformedCourseKey { key: String },

    #[error("migration of document {path} failed: {source}")]
    DocumentFailed {
        path: String,
        #[source]
        source: Box<MigratorError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Storage,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MigratorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TomlParseError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::HttpError(_) | Self::StoreError { .. } => ErrorCategory::Network,
            Self::IoError(_) | Self::ZipError(_) | Self::CsvError(_) => ErrorCategory::Storage,
            Self::SerializationError(_)
            | Self::DecodeError { .. }
            | Self::MissingSemester { .. }
            | Self::UnexpectedShape { .. }
            | Self::MalformedCourseKey { .. } => ErrorCategory::Data,
            Self::DocumentFailed { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::HttpError(_) => ErrorSeverity::Medium,
            // 5xx and 429 are worth retrying, anything else needs a fix first
            Self::StoreError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) | Self::ZipError(_) => ErrorSeverity::Critical,
            Self::DocumentFailed { source, .. } => source.severity(),
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::TomlParseError(_) => {
                "Check the configuration file for TOML syntax errors".to_string()
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration value and run again".to_string()
            }
            Self::MissingConfigError { field } => {
                format!("Add `{}` to the configuration file", field)
            }
            Self::HttpError(_) => {
                "Check network connectivity and the store base_url, then retry".to_string()
            }
            Self::StoreError { status: 401, .. } | Self::StoreError { status: 403, .. } => {
                "Refresh the access token (e.g. `gcloud auth print-access-token`)".to_string()
            }
            Self::StoreError { .. } => {
                "Verify project_id, database and collection, then retry".to_string()
            }
            Self::IoError(_) | Self::ZipError(_) | Self::CsvError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            Self::SerializationError(_) | Self::DecodeError { .. } => {
                "Inspect the source document for values that are not valid JSON".to_string()
            }
            Self::MissingSemester { .. } => {
                "Add a `Semester` field to the document or fix it by hand".to_string()
            }
            Self::UnexpectedShape { .. } | Self::MalformedCourseKey { .. } => {
                "Fix the document by hand; this shape cannot be migrated automatically"
                    .to_string()
            }
            Self::DocumentFailed { path, source } => {
                format!("{} (document: {})", source.recovery_suggestion(), path)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not talk to the document store: {}", self),
            ErrorCategory::Storage => format!("Could not write output: {}", self),
            ErrorCategory::Data => format!("Document could not be migrated: {}", self),
            ErrorCategory::System => format!("Unexpected system failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigratorError>;
