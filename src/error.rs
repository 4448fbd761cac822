use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlComposeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Query builder error: {0}")]
    Builder(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("Legacy format error at byte {offset}: {message}")]
    LegacyFormat { offset: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SqlComposeError {
    pub(crate) fn legacy(offset: usize, message: impl Into<String>) -> Self {
        SqlComposeError::LegacyFormat {
            offset,
            message: message.into(),
        }
    }
}
