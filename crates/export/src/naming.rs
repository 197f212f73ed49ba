//! Output file naming.
//!
//! Clips saved into a directory continue that directory's numbering; clips
//! handed to the download fallback use a per-session counter instead.

use std::sync::atomic::{AtomicU64, Ordering};

use cliptrim_common::error::{ClipResult, ClipTrimError};
use cliptrim_model::naming::ExportName;
use cliptrim_model::trim::round_duration_secs;

use crate::storage::{DirEntry, DirectoryHandle, EntryKind};

/// Picks output names for finished clips.
#[derive(Debug)]
pub struct NamingResolver {
    next_fallback: AtomicU64,
}

impl Default for NamingResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingResolver {
    pub fn new() -> Self {
        Self {
            next_fallback: AtomicU64::new(1),
        }
    }

    /// Next free name inside `dir`: one past the largest existing sequence.
    ///
    /// A directory that cannot be listed is treated as empty. Fails only when
    /// the directory already holds the largest representable sequence.
    pub async fn next_in_directory(
        &self,
        dir: &dyn DirectoryHandle,
        duration_secs: f64,
    ) -> ClipResult<String> {
        let max = match dir.entries().await {
            Ok(entries) => max_sequence(&entries),
            Err(err) => {
                tracing::warn!(
                    dir = %dir.display_name(),
                    error = %err,
                    "Could not scan export directory, numbering from 1"
                );
                0
            }
        };
        let sequence = max.checked_add(1).ok_or_else(|| {
            ClipTrimError::persistence(format!(
                "No sequence number left after {max} in {}",
                dir.display_name()
            ))
        })?;
        Ok(ExportName::new(sequence, round_duration_secs(duration_secs)).to_string())
    }

    /// Next name from the session counter, for clips without a directory.
    pub fn next_fallback(&self, duration_secs: f64) -> String {
        let sequence = self.next_fallback.fetch_add(1, Ordering::Relaxed);
        ExportName::new(sequence, round_duration_secs(duration_secs)).to_string()
    }
}

/// Largest sequence among files following the export convention, 0 if none.
pub fn max_sequence(entries: &[DirEntry]) -> u64 {
    entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::File)
        .filter_map(|entry| ExportName::parse(&entry.name))
        .map(|name| name.sequence)
        .max()
        .unwrap_or(0)
}
