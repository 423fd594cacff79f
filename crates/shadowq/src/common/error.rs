use std::path::PathBuf;

use thiserror::Error;

use crate::common::error::SqError::GenericError;
use crate::event::parse::LogParseError;

#[derive(Debug, Error)]
pub enum SqError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    LogParseError(#[from] LogParseError),
    #[error("Workflow error: {0}")]
    WorkflowError(#[from] shadowsim::Error),
    #[error("Invalid input {}:{line}: {reason}", path.display())]
    InputError {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for SqError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for SqError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

impl From<anyhow::Error> for SqError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}
