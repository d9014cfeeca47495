//! Write-once key/value storage for published hash tables.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use vecjoin_common::error::{Error, Result};

/// `{base}/{prefix}{position}/{file}`
pub fn hashtable_path(base_dir: &str, prefix: &str, position: usize, file_name: &str) -> String {
    format!(
        "{}/{}{}/{}",
        base_dir.trim_end_matches('/'),
        prefix,
        position,
        file_name
    )
}

/// Storage shared by every task of a query. Blobs are immutable once put.
#[cfg_attr(test, mockall::automock)]
pub trait BlobStore: Send + Sync {
    fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Stores `bytes` at `path`; a blob already at `path` is a storage error.
    fn put_if_absent(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    fn exists(&self, path: &str) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let blob = self
            .blobs
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::storage(path, "no such blob"))?;
        Ok(blob.as_ref().clone())
    }

    fn put_if_absent(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let mut blobs = self.blobs.write();
        if blobs.contains_key(path) {
            return Err(Error::storage(path, "blob already exists"));
        }
        blobs.insert(path.to_string(), Arc::new(bytes));
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(path))
    }
}

/// Blobs as files under `root`. Store paths are taken relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalFsBlobStore {
    root: PathBuf,
}

impl LocalFsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a store path under `root`. Paths that climb out of the root
    /// through `..` are rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::storage(path, "path escapes the store root"));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalFsBlobStore {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path)?).map_err(|e| Error::storage(path, e))
    }

    fn put_if_absent(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let abs = self.resolve(path)?;
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(path, e))?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::storage(path, "blob already exists"),
                _ => Error::storage(path, e),
            })?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::storage(path, e))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        self.resolve(path)?
            .try_exists()
            .map_err(|e| Error::storage(path, e))
    }
}
