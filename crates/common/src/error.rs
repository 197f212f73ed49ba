//! Error types shared across ClipTrim crates.

use std::path::PathBuf;

/// Top-level error type for ClipTrim operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipTrimError {
    /// The transcode engine could not be initialized. Every task fails the
    /// same way until the engine becomes available.
    #[error("Failed to load video processing engine: {message}")]
    EngineLoad { message: String },

    #[error("Execution error: {message}")]
    Execution { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Directory scan error: {message}")]
    DirectoryScan { message: String },

    #[error("Invalid trim request: {message}")]
    InvalidRequest { message: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Task {id} is {status} and cannot be removed")]
    TaskBusy { id: String, status: String },

    #[error("Export queue is no longer running")]
    QueueClosed,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipTrimError.
pub type ClipResult<T> = Result<T, ClipTrimError>;

impl ClipTrimError {
    pub fn engine_load(msg: impl Into<String>) -> Self {
        Self::EngineLoad {
            message: msg.into(),
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    pub fn directory_scan(msg: impl Into<String>) -> Self {
        Self::DirectoryScan {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    /// Whether this error means the engine itself is unusable, as opposed to
    /// a single task going wrong.
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, Self::EngineLoad { .. })
    }
}
