/*!
 * Storage backends for the archiver.
 *
 * The archiver only needs keyed reads and writes of JSON documents, so a
 * backend is a small trait. `FileStorage` maps keys to files in a project
 * directory; `MemoryStorage` keeps everything in a map for tests and
 * short-lived sessions.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::ArchiveError;
use crate::file_utils::FileManager;

use super::archiver::is_valid_project_id;

/// Keyed document store used by `TimelineArchiver`
pub trait ArchiveStorage {
    /// Read a document, `None` when it does not exist
    fn read(&self, key: &str) -> Result<Option<String>, ArchiveError>;

    /// Create or replace a document
    fn write(&self, key: &str, content: &str) -> Result<(), ArchiveError>;

    /// Remove a document; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), ArchiveError>;

    fn exists(&self, key: &str) -> bool;
}

fn storage_error(error: anyhow::Error) -> ArchiveError {
    ArchiveError::Storage(format!("{:#}", error))
}

/// One directory per project, one file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `root/project_id`, created if missing
    pub fn new<P: AsRef<Path>>(root: P, project_id: &str) -> Result<Self, ArchiveError> {
        if !is_valid_project_id(project_id) {
            return Err(ArchiveError::InvalidProject(project_id.to_string()));
        }
        let dir = root.as_ref().join(project_id);
        FileManager::ensure_dir(&dir).map_err(storage_error)?;
        debug!("Archive storage at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ArchiveStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ArchiveError> {
        let path = self.path(key);
        if !FileManager::file_exists(&path) {
            return Ok(None);
        }
        FileManager::read_to_string(&path)
            .map(Some)
            .map_err(storage_error)
    }

    fn write(&self, key: &str, content: &str) -> Result<(), ArchiveError> {
        FileManager::write_atomic(self.path(key), content).map_err(storage_error)
    }

    fn remove(&self, key: &str) -> Result<(), ArchiveError> {
        FileManager::remove_file(self.path(key)).map_err(storage_error)
    }

    fn exists(&self, key: &str) -> bool {
        FileManager::file_exists(self.path(key))
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl ArchiveStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ArchiveError> {
        Ok(self.documents.read().get(key).cloned())
    }

    fn write(&self, key: &str, content: &str) -> Result<(), ArchiveError> {
        self.documents
            .write()
            .insert(key.to_string(), content.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ArchiveError> {
        self.documents.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.documents.read().contains_key(key)
    }
}
