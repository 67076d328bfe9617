use thiserror::Error;

/// Result type for trigger configuration operations
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Errors raised while loading or compiling trigger configuration
#[derive(Error, Debug)]
pub enum TriggerError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration is neither valid JSON nor valid TOML
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration declares a schema this build does not understand
    #[error("schema_version {0} is not supported (expected 1)")]
    UnsupportedSchema(u32),

    /// Configuration defines no problem types at all
    #[error("Trigger configuration defines no problem types")]
    NoProblemTypes,

    /// A problem type definition is unusable
    #[error("Invalid problem type '{key}': {reason}")]
    InvalidType { key: String, reason: String },

    /// A trigger or raw pattern failed to compile
    #[error("Invalid pattern for problem type '{key}': {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },
}

impl TriggerError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn invalid_type(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidType {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
