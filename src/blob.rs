//! Local-directory content store.
//!
//! Each blob is written to `<root>/<uuid>`; the UUID string is the handle.
//! Handles are validated as UUIDs before touching the filesystem, so a
//! handle can never address a path outside the root.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use copycheck_core::store::ContentStore;
use copycheck_core::{Error, Result};

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Open (and create if needed) a blob directory.
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, handle: &str) -> Result<PathBuf> {
        let id = Uuid::parse_str(handle)
            .map_err(|_| Error::not_found(format!("blob {}", handle)))?;
        Ok(self.root.join(id.to_string()))
    }
}

fn io_err(handle: &str, e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::not_found(format!("blob {}", handle))
    } else {
        Error::storage(format!("blob {}: {}", handle, e))
    }
}

#[async_trait]
impl ContentStore for LocalBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<String> {
        let handle = Uuid::new_v4().to_string();
        let path = self.root.join(&handle);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::storage(format!("failed to write {}: {}", path.display(), e)))?;
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Vec<u8>> {
        let path = self.path_for(handle)?;
        tokio::fs::read(&path).await.map_err(|e| io_err(handle, e))
    }

    async fn delete(&self, handle: &str) -> Result<()> {
        let path = self.path_for(handle)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_err(handle, e))
    }
}
