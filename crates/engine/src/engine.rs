//! The transcode engine boundary.

use std::sync::Arc;

use cliptrim_common::error::{ClipResult, ClipTrimError};
use cliptrim_model::task::ProgressSample;

/// Receives progress samples while a command runs.
pub type ProgressFn = dyn Fn(ProgressSample) + Send + Sync;

/// A loaded transcode engine with its own isolated file workspace.
///
/// Files are addressed by plain names; the engine decides where they live.
#[async_trait::async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Store `data` under `name` in the engine workspace.
    async fn write_file(&self, name: &str, data: &[u8]) -> ClipResult<()>;

    /// Read back a file produced by a command.
    async fn read_file(&self, name: &str) -> ClipResult<Vec<u8>>;

    /// Remove a file from the workspace.
    async fn delete_file(&self, name: &str) -> ClipResult<()>;

    /// Run one command. Every progress sample the engine emits is passed to
    /// `progress` as it arrives.
    async fn exec(&self, args: &[String], progress: &ProgressFn) -> ClipResult<()>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Produces a ready-to-use engine.
///
/// Loading may be slow and may fail if the engine binary is missing.
#[async_trait::async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> ClipResult<Arc<dyn TranscodeEngine>>;
}

/// Reject workspace names that could escape the engine workspace.
pub fn validate_workspace_name(name: &str) -> ClipResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(ClipTrimError::execution(format!(
            "Invalid engine workspace file name: {name:?}"
        )));
    }
    Ok(())
}
