//! The fallback download path.
//!
//! When a clip cannot be written into a granted directory it is handed to a
//! [`DownloadSink`], the native stand-in for a browser's save-as-download.

use std::fmt;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use cliptrim_common::error::{ClipResult, ClipTrimError};

/// A transient, owned reference to finished clip bytes.
///
/// It lives only until the sink has triggered the download; the sink takes
/// it by value and the bytes are released as soon as `trigger` returns.
pub struct Download {
    filename: String,
    bytes: Vec<u8>,
}

impl Download {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Suggested file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Receives clips that could not be saved into a directory.
#[async_trait::async_trait]
pub trait DownloadSink: Send + Sync + fmt::Debug {
    /// Deliver the clip. Returns the file name actually used, which may
    /// differ from the suggested one.
    async fn trigger(&self, download: Download) -> ClipResult<String>;
}

/// Saves downloads into a folder, browser style: an existing `name.mp4`
/// makes the next one `name (1).mp4`, then `name (2).mp4`, and so on.
#[derive(Debug, Clone)]
pub struct DownloadsFolder {
    dir: PathBuf,
}

/// Give up renaming after this many collisions.
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

impl DownloadsFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl DownloadSink for DownloadsFolder {
    async fn trigger(&self, download: Download) -> ClipResult<String> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ClipTrimError::persistence(format!(
                "Failed to create downloads folder {}: {e}",
                self.dir.display()
            ))
        })?;

        for attempt in 0..MAX_RENAME_ATTEMPTS {
            let name = deduplicated_name(download.filename(), attempt);
            let path = self.dir.join(&name);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(ClipTrimError::persistence(format!(
                        "Failed to create download {}: {e}",
                        path.display()
                    )))
                }
            };

            let written = match file.write_all(download.bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            written.map_err(|e| {
                ClipTrimError::persistence(format!("Failed to write {}: {e}", path.display()))
            })?;

            tracing::info!(path = %path.display(), bytes = download.bytes().len(), "Download saved");
            return Ok(name);
        }

        Err(ClipTrimError::persistence(format!(
            "Too many downloads named like {} in {}",
            download.filename(),
            self.dir.display()
        )))
    }
}

/// `clip.mp4`, `clip (1).mp4`, `clip (2).mp4`, ...
fn deduplicated_name(filename: &str, attempt: u32) -> String {
    if attempt == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{filename} ({attempt})"),
    }
}
