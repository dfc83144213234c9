/*!
 * Protection rules shared by every timeline stage.
 *
 * A scene's effective protection is the stronger of what upstream
 * declared and what the policy infers: a protected tag or an importance
 * at or above the critical threshold always makes a scene critical.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::scene::{ImportanceLevel, ProtectionLevel, ProtectionStrategy, Scene};

/// Shared protection and sizing rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePolicy {
    /// Tags that mark a scene as critical
    #[serde(default = "default_protected_tags")]
    pub protected_tags: BTreeSet<String>,

    /// Importance at or above which a scene is critical
    #[serde(default = "default_critical_importance")]
    pub critical_importance: f64,

    /// Importance at or above which a scene is high
    #[serde(default = "default_high_importance")]
    pub high_importance: f64,

    /// Importance at or above which a scene is medium
    #[serde(default = "default_medium_importance")]
    pub medium_importance: f64,

    /// Floor for every duration-adjusting stage, in seconds
    #[serde(default = "default_min_scene_duration")]
    pub min_scene_duration: f64,

    /// When false, declared protection levels and NO_TRIM/NO_COMPRESS are ignored.
    /// LOCK is always honoured, and so is criticality inferred from a
    /// protected tag or the importance score.
    #[serde(default = "default_true")]
    pub respect_protection: bool,
}

impl Default for ScenePolicy {
    fn default() -> Self {
        Self {
            protected_tags: default_protected_tags(),
            critical_importance: default_critical_importance(),
            high_importance: default_high_importance(),
            medium_importance: default_medium_importance(),
            min_scene_duration: default_min_scene_duration(),
            respect_protection: true,
        }
    }
}

impl ScenePolicy {
    /// Whether the scene carries one of the protected tags
    pub fn has_protected_tag(&self, scene: &Scene) -> bool {
        scene.tags.iter().any(|t| self.protected_tags.contains(t))
    }

    /// Protection level after applying tag and importance inference
    pub fn effective_level(&self, scene: &Scene) -> ProtectionLevel {
        if self.has_protected_tag(scene) || scene.importance >= self.critical_importance {
            return ProtectionLevel::Critical;
        }
        if self.respect_protection {
            scene.declared_level()
        } else {
            ProtectionLevel::None
        }
    }

    /// Never mutated by duration-adjusting stages
    pub fn is_locked(&self, scene: &Scene) -> bool {
        scene.is_transition() || scene.has_strategy(ProtectionStrategy::Lock)
    }

    /// Boundaries must stay where they are when closing gaps
    pub fn is_gap_protected(&self, scene: &Scene) -> bool {
        if self.is_locked(scene) {
            return true;
        }
        self.effective_level(scene).is_strong()
            || (self.respect_protection && scene.has_strategy(ProtectionStrategy::NoTrim))
    }

    /// Excluded from proportional compression
    pub fn is_compression_protected(&self, scene: &Scene) -> bool {
        if self.is_locked(scene) {
            return true;
        }
        let no_compress = scene.has_strategy(ProtectionStrategy::NoCompress)
            || scene.compression.as_ref().is_some_and(|c| c.no_compress);
        self.effective_level(scene).is_strong() || (self.respect_protection && no_compress)
    }

    /// Importance tier used by the overflow rescuer
    pub fn importance_level(&self, scene: &Scene) -> ImportanceLevel {
        let level = self.effective_level(scene);
        let no_compress = self.respect_protection
            && (scene.has_strategy(ProtectionStrategy::NoCompress)
                || scene.compression.as_ref().is_some_and(|c| c.no_compress));

        if level == ProtectionLevel::Critical || no_compress {
            ImportanceLevel::Critical
        } else if level == ProtectionLevel::High || scene.importance >= self.high_importance {
            ImportanceLevel::High
        } else if scene.importance >= self.medium_importance {
            ImportanceLevel::Medium
        } else {
            ImportanceLevel::Low
        }
    }

    /// Smallest duration a stage may shrink this scene to.
    /// Scenes already shorter than the minimum are never grown.
    pub fn floor_for(&self, scene: &Scene) -> f64 {
        let baseline = scene.baseline_duration();
        let allowed = scene
            .compression
            .as_ref()
            .map(|c| baseline * c.allowed_ratio.clamp(0.0, 1.0))
            .unwrap_or(0.0);
        self.min_scene_duration.max(allowed).min(baseline.max(0.0))
    }
}

fn default_protected_tags() -> BTreeSet<String> {
    ["critical", "highlight", "climax", "opening", "ending"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_critical_importance() -> f64 {
    0.9
}

fn default_high_importance() -> f64 {
    0.7
}

fn default_medium_importance() -> f64 {
    0.4
}

fn default_min_scene_duration() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}
