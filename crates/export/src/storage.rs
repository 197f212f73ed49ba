//! The directory persistence boundary.
//!
//! A [`DirectoryHandle`] is a capability for one user-granted location: it
//! can list its entries, create subdirectories, and create files, and
//! nothing outside of it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use cliptrim_common::error::{ClipResult, ClipTrimError};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Capability for a user-granted directory.
#[async_trait::async_trait]
pub trait DirectoryHandle: Send + Sync + fmt::Debug {
    /// Open the named subdirectory, creating it if absent.
    async fn get_or_create_subdir(&self, name: &str) -> ClipResult<Arc<dyn DirectoryHandle>>;

    /// List the direct children of this directory.
    async fn entries(&self) -> ClipResult<Vec<DirEntry>>;

    /// Create (or truncate) a file and open it for writing.
    async fn create_file(&self, name: &str) -> ClipResult<Box<dyn WritableFile>>;

    /// Human-readable location for logs and messages.
    fn display_name(&self) -> String;
}

/// An open, writable file inside a [`DirectoryHandle`].
#[async_trait::async_trait]
pub trait WritableFile: Send {
    async fn write(&mut self, data: &[u8]) -> ClipResult<()>;

    /// Flush and release the file. Must be called even after a failed write.
    async fn close(self: Box<Self>) -> ClipResult<()>;
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn child(&self, name: &str) -> ClipResult<PathBuf> {
        validate_entry_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait::async_trait]
impl DirectoryHandle for FsDirectory {
    async fn get_or_create_subdir(&self, name: &str) -> ClipResult<Arc<dyn DirectoryHandle>> {
        let path = self.child(name)?;
        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            ClipTrimError::persistence(format!(
                "Failed to create directory {}: {e}",
                path.display()
            ))
        })?;
        Ok(Arc::new(FsDirectory::new(path)))
    }

    async fn entries(&self) -> ClipResult<Vec<DirEntry>> {
        let mut read_dir = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            ClipTrimError::directory_scan(format!("{}: {e}", self.root.display()))
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| ClipTrimError::directory_scan(format!("{}: {e}", self.root.display())))?
        {
            // Non UTF-8 names can never match an export name.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let kind = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => EntryKind::Directory,
                Ok(_) => EntryKind::File,
                Err(e) => {
                    tracing::debug!(name = %name, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            entries.push(DirEntry { name, kind });
        }
        Ok(entries)
    }

    async fn create_file(&self, name: &str) -> ClipResult<Box<dyn WritableFile>> {
        let path = self.child(name)?;
        let file = tokio::fs::File::create(&path).await.map_err(|e| {
            ClipTrimError::persistence(format!("Failed to create {}: {e}", path.display()))
        })?;
        Ok(Box::new(FsWritableFile { file, path }))
    }

    fn display_name(&self) -> String {
        self.root.display().to_string()
    }
}

struct FsWritableFile {
    file: tokio::fs::File,
    path: PathBuf,
}

#[async_trait::async_trait]
impl WritableFile for FsWritableFile {
    async fn write(&mut self, data: &[u8]) -> ClipResult<()> {
        self.file.write_all(data).await.map_err(|e| {
            ClipTrimError::persistence(format!("Failed to write {}: {e}", self.path.display()))
        })
    }

    async fn close(mut self: Box<Self>) -> ClipResult<()> {
        self.file.flush().await?;
        self.file.sync_all().await.map_err(|e| {
            ClipTrimError::persistence(format!("Failed to sync {}: {e}", self.path.display()))
        })
    }
}

fn validate_entry_name(name: &str) -> ClipResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(ClipTrimError::persistence(format!(
            "Invalid entry name: {name:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_subdir_write_and_list() {
        let tmp = tempfile::tempdir().unwrap();
        let root = FsDirectory::new(tmp.path());

        let sub = root.get_or_create_subdir("export").await.unwrap();
        let again = root.get_or_create_subdir("export").await.unwrap();
        assert_eq!(sub.display_name(), again.display_name());

        let mut file = sub.create_file("1_5s.mp4").await.unwrap();
        file.write(b"clip").await.unwrap();
        file.close().await.unwrap();

        let on_disk = std::fs::read(tmp.path().join("export").join("1_5s.mp4")).unwrap();
        assert_eq!(on_disk, b"clip");

        let entries = root.entries().await.unwrap();
        assert_eq!(entries, vec![DirEntry::directory("export")]);
        let entries = sub.entries().await.unwrap();
        assert_eq!(entries, vec![DirEntry::file("1_5s.mp4")]);
    }

    #[tokio::test]
    async fn test_create_file_truncates_existing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.mp4"), b"old and long").unwrap();
        let dir = FsDirectory::new(tmp.path());

        let mut file = dir.create_file("a.mp4").await.unwrap();
        file.write(b"new").await.unwrap();
        file.close().await.unwrap();

        assert_eq!(std::fs::read(tmp.path().join("a.mp4")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_missing_directory_fails_scan() {
        let dir = FsDirectory::new("/nonexistent/cliptrim/dir");
        let err = dir.entries().await.unwrap_err();
        assert!(matches!(err, ClipTrimError::DirectoryScan { .. }));
    }

    #[tokio::test]
    async fn test_names_cannot_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = FsDirectory::new(tmp.path());
        assert!(dir.create_file("../escape.mp4").await.is_err());
        assert!(dir.get_or_create_subdir("..").await.is_err());
    }
}
