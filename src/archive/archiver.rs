/*!
 * Content-addressed timeline versions.
 *
 * A version id is the first 12 hex characters of the SHA-256 of the
 * canonical JSON of a scene list with scratch fields removed, so saving
 * the same timeline twice yields the same id and stores it once.
 */

use chrono::Utc;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::ArchiveError;
use crate::file_utils::FileManager;
use crate::scene::{Scene, strip_scratch, total_duration};

use super::models::{HISTORY_FILE, History, VersionComparison, VersionFile, VersionInfo};
use super::storage::{ArchiveStorage, FileStorage, MemoryStorage};

/// Length of a version id in hex characters
pub const VERSION_ID_LEN: usize = 12;

static VERSION_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{12}$").expect("version id pattern is valid"));

static PROJECT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").expect("project id pattern is valid")
});

/// Directory name for archives under the user's data directory
const DEFAULT_ARCHIVE_DIRNAME: &str = "scenefit";

/// Default archive root: `<data dir>/scenefit/projects`
pub fn default_archive_root() -> Option<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .map(|base| base.join(DEFAULT_ARCHIVE_DIRNAME).join("projects"))
}

/// Project ids with an archive under `root`
pub fn list_projects<P: AsRef<Path>>(root: P) -> Result<Vec<String>, ArchiveError> {
    let dirs = FileManager::find_dirs_containing(root, HISTORY_FILE)
        .map_err(|e| ArchiveError::Storage(format!("{:#}", e)))?;
    Ok(dirs
        .iter()
        .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect())
}

/// Whether a string has the shape of a version id
pub fn is_valid_version_id(version_id: &str) -> bool {
    VERSION_ID_PATTERN.is_match(version_id)
}

/// Whether a project id is a single safe directory name
pub fn is_valid_project_id(project_id: &str) -> bool {
    PROJECT_ID_PATTERN.is_match(project_id)
}

/// Version id for a scene list
pub fn compute_version_id(scenes: &[Scene]) -> Result<String, ArchiveError> {
    let canonical = serde_json::to_string(&strip_scratch(scenes.to_vec()))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Ok(digest[..VERSION_ID_LEN].to_string())
}

fn version_key(version_id: &str) -> String {
    format!("{}.json", version_id)
}

/// Saves, loads and compares versions of one project's timeline
pub struct TimelineArchiver<S: ArchiveStorage = FileStorage> {
    project_id: String,
    storage: S,
}

impl TimelineArchiver<FileStorage> {
    /// Open (or create) the project directory `root/project_id`
    pub fn open<P: AsRef<Path>>(root: P, project_id: &str) -> Result<Self, ArchiveError> {
        let storage = FileStorage::new(root, project_id)?;
        Ok(Self::with_storage(project_id, storage))
    }
}

impl TimelineArchiver<MemoryStorage> {
    pub fn in_memory(project_id: &str) -> Self {
        Self::with_storage(project_id, MemoryStorage::new())
    }
}

impl<S: ArchiveStorage> TimelineArchiver<S> {
    pub fn with_storage(project_id: &str, storage: S) -> Self {
        Self {
            project_id: project_id.to_string(),
            storage,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // =========================================================================
    // History
    // =========================================================================

    fn load_history(&self) -> Result<History, ArchiveError> {
        match self.storage.read(HISTORY_FILE)? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(History::default()),
        }
    }

    fn save_history(&self, history: &History) -> Result<(), ArchiveError> {
        let content = serde_json::to_string_pretty(history)?;
        self.storage.write(HISTORY_FILE, &content)
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Save a timeline and make it current. Saving identical content again
    /// returns the same id and only updates the note.
    pub fn save(&self, scenes: &[Scene], note: &str) -> Result<String, ArchiveError> {
        let version_id = compute_version_id(scenes)?;
        let mut history = self.load_history()?;

        let stored = history.versions.contains_key(&version_id)
            && self.storage.exists(&version_key(&version_id));

        if stored {
            debug!("Version {} already archived, updating note", version_id);
            if let Some(info) = history.versions.get_mut(&version_id) {
                info.note = note.to_string();
            }
            self.rewrite_metadata(&version_id, &history)?;
        } else {
            let data = strip_scratch(scenes.to_vec());
            let metadata = VersionInfo {
                version_id: version_id.clone(),
                timestamp: Utc::now().to_rfc3339(),
                note: note.to_string(),
                scene_count: data.len(),
                total_duration: total_duration(&data),
                sequence: history.next_sequence,
            };
            history.next_sequence += 1;

            let file = VersionFile {
                metadata: metadata.clone(),
                data,
            };
            self.storage
                .write(&version_key(&version_id), &serde_json::to_string_pretty(&file)?)?;
            history.versions.insert(version_id.clone(), metadata);
            info!(
                "Archived version {} of {} ({} scenes)",
                version_id,
                self.project_id,
                file.data.len()
            );
        }

        history.current = Some(version_id.clone());
        self.save_history(&history)?;
        Ok(version_id)
    }

    /// Keep the metadata block of a version file in sync with the index
    fn rewrite_metadata(&self, version_id: &str, history: &History) -> Result<(), ArchiveError> {
        let Some(metadata) = history.versions.get(version_id) else {
            return Ok(());
        };
        let mut file = self.load_version(version_id)?;
        file.metadata = metadata.clone();
        self.storage
            .write(&version_key(version_id), &serde_json::to_string_pretty(&file)?)
    }

    /// Version file including its metadata
    pub fn load_version(&self, version_id: &str) -> Result<VersionFile, ArchiveError> {
        let not_found = || ArchiveError::VersionNotFound {
            version_id: version_id.to_string(),
        };
        if !is_valid_version_id(version_id) {
            return Err(not_found());
        }

        let content = self.storage.read(&version_key(version_id))?.ok_or_else(not_found)?;
        serde_json::from_str(&content).map_err(|e| {
            warn!("Version file {} is corrupt: {}", version_id, e);
            not_found()
        })
    }

    /// Scenes of a version
    pub fn load(&self, version_id: &str) -> Result<Vec<Scene>, ArchiveError> {
        Ok(self.load_version(version_id)?.data)
    }

    /// Version metadata, oldest first unless `newest_first`
    pub fn list(
        &self,
        limit: Option<usize>,
        newest_first: bool,
    ) -> Result<Vec<VersionInfo>, ArchiveError> {
        let history = self.load_history()?;
        let mut versions: Vec<VersionInfo> = history.ordered().into_iter().cloned().collect();
        if newest_first {
            versions.reverse();
        }
        if let Some(limit) = limit {
            versions.truncate(limit);
        }
        Ok(versions)
    }

    /// Metadata of the current version
    pub fn current(&self) -> Result<Option<VersionInfo>, ArchiveError> {
        let history = self.load_history()?;
        Ok(history
            .current
            .as_ref()
            .and_then(|id| history.versions.get(id))
            .cloned())
    }

    /// Make an existing version current and return its scenes
    pub fn checkout(&self, version_id: &str) -> Result<Vec<Scene>, ArchiveError> {
        let scenes = self.load(version_id)?;
        let mut history = self.load_history()?;
        if !history.versions.contains_key(version_id) {
            return Err(ArchiveError::VersionNotFound {
                version_id: version_id.to_string(),
            });
        }
        history.current = Some(version_id.to_string());
        self.save_history(&history)?;
        info!("Checked out version {} of {}", version_id, self.project_id);
        Ok(scenes)
    }

    /// Delete a version. The last remaining version cannot be deleted.
    pub fn delete(&self, version_id: &str) -> Result<(), ArchiveError> {
        let mut history = self.load_history()?;
        if !history.versions.contains_key(version_id) {
            return Err(ArchiveError::VersionNotFound {
                version_id: version_id.to_string(),
            });
        }
        if history.versions.len() == 1 {
            return Err(ArchiveError::CannotDeleteLastVersion {
                version_id: version_id.to_string(),
            });
        }

        history.versions.remove(version_id);
        if history.current.as_deref() == Some(version_id) {
            history.current = history.latest().map(|v| v.version_id.clone());
            debug!("Current version reassigned to {:?}", history.current);
        }
        self.save_history(&history)?;
        self.storage.remove(&version_key(version_id))?;
        info!("Deleted version {} of {}", version_id, self.project_id);
        Ok(())
    }

    /// Compare two versions scene by scene
    pub fn compare(
        &self,
        version_a: &str,
        version_b: &str,
    ) -> Result<VersionComparison, ArchiveError> {
        let a = self.load(version_a)?;
        let b = self.load(version_b)?;

        let by_id = |scenes: &[Scene]| -> BTreeMap<String, Scene> {
            scenes.iter().map(|s| (s.id.clone(), s.clone())).collect()
        };
        let map_a = by_id(&a);
        let map_b = by_id(&b);

        let added = b
            .iter()
            .filter(|s| !map_a.contains_key(&s.id))
            .map(|s| s.id.clone())
            .collect();
        let removed = a
            .iter()
            .filter(|s| !map_b.contains_key(&s.id))
            .map(|s| s.id.clone())
            .collect();
        let changed = map_a
            .iter()
            .filter(|(id, scene)| map_b.get(*id).is_some_and(|other| other != *scene))
            .map(|(id, _)| id.clone())
            .collect();

        Ok(VersionComparison {
            version_a: version_a.to_string(),
            version_b: version_b.to_string(),
            scene_diff: b.len() as i64 - a.len() as i64,
            duration_diff: total_duration(&b) - total_duration(&a),
            added,
            removed,
            changed,
        })
    }

    // =========================================================================
    // Exchange
    // =========================================================================

    /// Write a version file to `path`
    pub fn export<P: AsRef<Path>>(&self, version_id: &str, path: P) -> Result<PathBuf, ArchiveError> {
        let file = self.load_version(version_id)?;
        let path = path.as_ref().to_path_buf();
        FileManager::write_atomic(&path, &serde_json::to_string_pretty(&file)?)
            .map_err(|e| ArchiveError::Storage(format!("{:#}", e)))?;
        info!("Exported version {} to {:?}", version_id, path);
        Ok(path)
    }

    /// Import a version file (or a bare scene list) and save it.
    /// The id is recomputed from the content.
    pub fn import<P: AsRef<Path>>(&self, path: P, note: Option<&str>) -> Result<String, ArchiveError> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .map_err(|e| ArchiveError::Storage(format!("{:#}", e)))?;

        let (scenes, stored_note) = match serde_json::from_str::<VersionFile>(&content) {
            Ok(file) => (file.data, Some(file.metadata.note)),
            Err(_) => match serde_json::from_str::<Vec<Scene>>(&content) {
                Ok(scenes) => (scenes, None),
                Err(e) => {
                    return Err(ArchiveError::InvalidImport(format!("{:?}: {}", path, e)));
                }
            },
        };

        let note = note
            .map(str::to_string)
            .or(stored_note)
            .unwrap_or_else(|| "imported".to_string());
        let version_id = self.save(&scenes, &note)?;
        info!("Imported {:?} as version {}", path, version_id);
        Ok(version_id)
    }
}
