//! Application error types for change tracking and snippet rendering.
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Not a container: expected {0}")]
    NotAContainer(&'static str),

    #[error("Detached view: {0}")]
    Detached(String),

    #[error("Snippet error: {0}")]
    Snippet(String),
}

/// Convenience alias used across the core crate.
pub type AppResult<T> = Result<T, AppError>;
