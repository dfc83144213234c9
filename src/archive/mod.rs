/*!
 * Timeline version archive.
 *
 * Layout on disk: `<root>/<project_id>/history.json` indexes the versions,
 * and each version lives in `<root>/<project_id>/<version_id>.json`.
 */

pub mod archiver;
pub mod models;
pub mod storage;

pub use archiver::{
    TimelineArchiver, compute_version_id, default_archive_root, is_valid_project_id,
    is_valid_version_id, list_projects,
};
pub use models::{History, VersionComparison, VersionFile, VersionInfo};
pub use storage::{ArchiveStorage, FileStorage, MemoryStorage};
