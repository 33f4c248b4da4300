// Key-value blob stores backing the persisted list

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Opaque string storage addressed by key
pub trait BlobStore {
    /// Read the value stored under `key`, or `None` if nothing was ever written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Blob store keeping one `<key>.json` file per key in a directory
#[derive(Debug)]
pub struct FileBlobStore {
    base_path: PathBuf,
}

impl FileBlobStore {
    /// Open or create a blob store rooted at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(path = ?base_path, "Opened file blob store");
        Ok(Self { base_path })
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read blob {:?}", path)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, |file| file.write_all(value.as_bytes()))?;

        debug!(key, bytes = value.len(), "Wrote blob");
        Ok(())
    }
}

impl FileBlobStore {
    /// Replace `path` with whatever `write` produces, or leave it untouched
    ///
    /// The value goes to a temp file in the store directory and is renamed
    /// over `path` only after it is fully synced, so readers see either the
    /// old value or the new one. Writers are serialized on a `.lock` sidecar.
    fn write_atomic<F>(&self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .context("Failed to open blob lock file")?;

        // Lock is released when `lock` is dropped
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let mut temp = NamedTempFile::new_in(&self.base_path).context("Failed to create temp file")?;
        write(temp.as_file_mut()).context("Failed to write blob")?;
        temp.as_file().sync_all().context("Failed to flush blob")?;
        temp.persist(path)
            .with_context(|| format!("Failed to replace blob {:?}", path))?;

        Ok(())
    }
}

/// In-memory blob store with an optional size quota
#[derive(Debug, Default, Clone)]
pub struct MemoryBlobStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any write whose value is longer than `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Seed an entry directly, bypassing the quota
    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match self.quota {
            Some(quota) if value.len() > quota => {
                return Err(eyre!(
                    "Quota exceeded writing {}: {} bytes (max {})",
                    key,
                    value.len(),
                    quota
                ));
            }
            _ => {}
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Blob key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Blob key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid blob key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}
