/*!
 * Archive records.
 *
 * These structures are the on-disk shape of a project: one `history.json`
 * index plus one `<version_id>.json` file per saved version.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scene::Scene;

/// Name of the per-project index file
pub const HISTORY_FILE: &str = "history.json";

/// Metadata describing one saved version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Content hash prefix identifying the version
    pub version_id: String,
    /// RFC 3339 save time
    pub timestamp: String,
    /// Free-form note; updated when identical content is saved again
    #[serde(default)]
    pub note: String,
    pub scene_count: usize,
    #[serde(default)]
    pub total_duration: f64,
    /// Monotonic save counter, breaks timestamp ties
    #[serde(default)]
    pub sequence: u64,
}

/// Index of all versions in a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionInfo>,
    /// Next value for `VersionInfo::sequence`
    #[serde(default)]
    pub next_sequence: u64,
}

impl History {
    /// Versions ordered oldest first
    pub fn ordered(&self) -> Vec<&VersionInfo> {
        let mut versions: Vec<&VersionInfo> = self.versions.values().collect();
        versions.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
        versions
    }

    /// Most recently saved version
    pub fn latest(&self) -> Option<&VersionInfo> {
        self.ordered().last().copied()
    }
}

/// Content of a version file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionFile {
    pub metadata: VersionInfo,
    pub data: Vec<Scene>,
}

/// Differences between two versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionComparison {
    pub version_a: String,
    pub version_b: String,
    /// `scene_count(b) - scene_count(a)`
    pub scene_diff: i64,
    /// `total_duration(b) - total_duration(a)`
    pub duration_diff: f64,
    /// Scene ids only present in b
    pub added: Vec<String>,
    /// Scene ids only present in a
    pub removed: Vec<String>,
    /// Scene ids present in both with different content
    pub changed: Vec<String>,
}

impl VersionComparison {
    pub fn is_identical(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}
