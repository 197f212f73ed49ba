//! Source media accepted for import.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cliptrim_common::error::{ClipResult, ClipTrimError};

/// Container suffixes accepted on import, matched case-insensitively.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "webm", "mkv"];

/// Extension of every exported clip.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Whether a file name carries one of the accepted container suffixes.
pub fn is_accepted_source(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Keep only the paths whose names look like importable video.
///
/// Anything else is skipped without error.
pub fn filter_sources<I, P>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    paths
        .into_iter()
        .map(Into::into)
        .filter(|path| {
            let accepted = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(is_accepted_source)
                .unwrap_or(false);
            if !accepted {
                tracing::debug!(path = %path.display(), "Skipping unsupported source");
            }
            accepted
        })
        .collect()
}

/// A source video fully buffered in memory.
///
/// The byte buffer is shared, so cloning a `SourceMedia` into several tasks
/// does not copy the file.
#[derive(Clone)]
pub struct SourceMedia {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceMedia {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a source file from disk.
    pub fn load(path: &Path) -> ClipResult<Self> {
        if !path.exists() {
            return Err(ClipTrimError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    /// Display name (file name without directories).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMedia")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}
