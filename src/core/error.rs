//! Error types for core module
//!
//! Provides custom error types for core functionality: settings persistence and
//! lesson content loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the core module
#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings or lesson file I/O error
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings or lesson serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Lesson content that cannot be used at all
    #[error("Invalid lesson '{lesson_id}': {message}")]
    InvalidLesson { lesson_id: String, message: String },

    /// Configuration directory could not be resolved or created
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
