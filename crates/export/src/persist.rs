//! Saving finished clips.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cliptrim_common::error::ClipResult;
use cliptrim_model::task::SavedLocation;

use crate::download::{Download, DownloadSink};
use crate::naming::NamingResolver;
use crate::storage::DirectoryHandle;

/// Default name of the subdirectory clips are written into.
pub const DEFAULT_EXPORT_SUBDIR: &str = "export";

/// The name a clip was saved under, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedOutput {
    pub filename: String,
    pub location: SavedLocation,
}

/// Writes clips into a directory when one was granted, and falls back to a
/// download otherwise or when the directory write fails.
#[derive(Debug, Clone)]
pub struct PersistenceStrategy {
    naming: Arc<NamingResolver>,
    downloads: Arc<dyn DownloadSink>,
    subdir: String,
}

impl PersistenceStrategy {
    pub fn new(naming: Arc<NamingResolver>, downloads: Arc<dyn DownloadSink>) -> Self {
        Self {
            naming,
            downloads,
            subdir: DEFAULT_EXPORT_SUBDIR.to_string(),
        }
    }

    /// Use a different export subdirectory name.
    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    /// Persist `bytes`.
    ///
    /// Directory failures are logged and never surface; only a failing
    /// download is returned as an error.
    pub async fn save(
        &self,
        bytes: Vec<u8>,
        duration_secs: f64,
        directory: Option<&Arc<dyn DirectoryHandle>>,
    ) -> ClipResult<SavedOutput> {
        if let Some(dir) = directory {
            match self.save_to_directory(dir.as_ref(), &bytes, duration_secs).await {
                Ok(filename) => {
                    tracing::info!(
                        dir = %dir.display_name(),
                        subdir = %self.subdir,
                        filename = %filename,
                        "Clip saved to directory"
                    );
                    return Ok(SavedOutput {
                        filename,
                        location: SavedLocation::Directory,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        dir = %dir.display_name(),
                        error = %err,
                        "Directory save failed, falling back to download"
                    );
                }
            }
        }
        self.save_as_download(bytes, duration_secs).await
    }

    async fn save_to_directory(
        &self,
        dir: &dyn DirectoryHandle,
        bytes: &[u8],
        duration_secs: f64,
    ) -> ClipResult<String> {
        let export_dir = dir.get_or_create_subdir(&self.subdir).await?;
        let filename = self
            .naming
            .next_in_directory(export_dir.as_ref(), duration_secs)
            .await?;

        let mut file = export_dir.create_file(&filename).await?;
        let written = file.write(bytes).await;
        let closed = file.close().await;
        written?;
        closed?;
        Ok(filename)
    }

    async fn save_as_download(&self, bytes: Vec<u8>, duration_secs: f64) -> ClipResult<SavedOutput> {
        let suggested = self.naming.next_fallback(duration_secs);
        let filename = self.downloads.trigger(Download::new(suggested, bytes)).await?;
        tracing::info!(filename = %filename, "Clip handed to download");
        Ok(SavedOutput {
            filename,
            location: SavedLocation::Download,
        })
    }
}
