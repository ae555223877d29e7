//! Transient file store for per-request media files.
//!
//! Each voice request gets a pair of files (container + decoded audio) in a
//! shared scratch directory, named by the request's file stem so concurrent
//! requests never collide. Deleting is idempotent: a missing file is fine,
//! and any other deletion failure is logged and swallowed so cleanup never
//! masks the primary result of the pipeline.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Directory of transient media files.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    /// Open the store, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// The scratch directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derive the path for a request-scoped file named `{stem}.{extension}`
    pub fn path_for(&self, stem: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", stem, extension))
    }

    /// Delete a file if present.
    ///
    /// Missing files are not an error. Other deletion failures are logged
    /// at warn and swallowed.
    pub async fn release(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove scratch file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_path_naming() {
        let temp = TempDir::new().unwrap();
        let store = ScratchStore::open(temp.path()).await.unwrap();

        let path = store.path_for("42-abc", "ogg");
        assert_eq!(path, temp.path().join("42-abc.ogg"));
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("voices");

        let store = ScratchStore::open(&dir).await.unwrap();
        assert!(store.dir().exists());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = ScratchStore::open(temp.path()).await.unwrap();

        let path = store.path_for("1", "ogg");
        tokio::fs::write(&path, b"audio").await.unwrap();

        store.release(&path).await;
        assert!(!path.exists());

        // Second release of the same path must not fail
        store.release(&path).await;
    }
}
