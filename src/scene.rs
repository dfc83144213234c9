/*!
 * Scene data model.
 *
 * A `Scene` is one time-stamped segment of a remix timeline. Core timing
 * fields are always present; protection and compression metadata are
 * explicit options so the protected/compressible split can be checked
 * without probing ad-hoc keys. Fields written by the pipeline while it
 * works (`original_duration`, `importance_level`, `adjustment`) are
 * scratch state and can be removed with [`Scene::strip_scratch`].
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Ordered list of scenes; adjacency is significant
pub type SceneList = Vec<Scene>;

/// Explicit protection level attached to a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtectionLevel {
    #[default]
    None,
    Medium,
    High,
    Critical,
}

impl ProtectionLevel {
    /// High and critical scenes are the ones stages refuse to touch
    pub fn is_strong(self) -> bool {
        self >= ProtectionLevel::High
    }
}

/// Individual protection strategies a scene may opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtectionStrategy {
    /// Boundaries must not be moved to close gaps
    NoTrim,
    /// Duration must not be reduced by proportional compression
    NoCompress,
    /// No transition may be inserted next to this scene
    NoTransition,
    /// Never mutated by any duration-adjusting stage
    Lock,
}

/// Protection metadata supplied by upstream analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtectionInfo {
    #[serde(default)]
    pub level: ProtectionLevel,
    #[serde(default)]
    pub strategies: BTreeSet<ProtectionStrategy>,
}

impl ProtectionInfo {
    pub fn new(level: ProtectionLevel) -> Self {
        Self {
            level,
            strategies: BTreeSet::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: ProtectionStrategy) -> Self {
        self.strategies.insert(strategy);
        self
    }
}

/// Compression restrictions supplied by upstream analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionInfo {
    /// Free-form restriction level reported upstream
    #[serde(default)]
    pub restriction_level: u8,
    /// Smallest fraction of its duration the scene may be compressed to
    #[serde(default = "default_allowed_ratio")]
    pub allowed_ratio: f64,
    /// Whether the scene must not be compressed at all
    #[serde(default)]
    pub no_compress: bool,
}

impl Default for CompressionInfo {
    fn default() -> Self {
        Self {
            restriction_level: 0,
            allowed_ratio: default_allowed_ratio(),
            no_compress: false,
        }
    }
}

/// Importance tier assigned by the overflow rescuer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ImportanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Whether a scene carries source content or was synthesized by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    #[default]
    Content,
    Transition,
}

/// Visual style of a synthesized transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    Dynamic,
    Slide,
    Fade,
    Crossfade,
}

impl TransitionType {
    /// Base duration in seconds before importance/compression weighting
    pub fn base_duration(self) -> f64 {
        match self {
            Self::Dynamic => 0.030,
            Self::Slide => 0.080,
            Self::Fade => 0.100,
            Self::Crossfade => 0.050,
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dynamic => "dynamic",
            Self::Slide => "slide",
            Self::Fade => "fade",
            Self::Crossfade => "crossfade",
        };
        write!(f, "{}", name)
    }
}

/// Describes a synthesized transition scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub transition_type: TransitionType,
    /// Ids of the two scenes the transition bridges
    pub source_scenes: [String; 2],
}

/// Audit record written by the overflow rescuer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentInfo {
    pub original_duration: f64,
    pub adjusted_duration: f64,
    pub compression_ratio: f64,
    pub mode: String,
}

/// One segment of the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,

    #[serde(default = "default_importance")]
    pub importance: f64,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<ProtectionInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionInfo>,

    /// Caller-supplied compression rate, read by the transition inserter
    #[serde(default)]
    pub compression_rate: f64,

    #[serde(default)]
    pub kind: SceneKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionInfo>,

    // Scratch state below; never part of the caller-visible contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance_level: Option<ImportanceLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<AdjustmentInfo>,
}

impl Scene {
    /// Create a content scene spanning `[start_time, end_time]`
    pub fn new(id: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            duration: end_time - start_time,
            importance: default_importance(),
            tags: BTreeSet::new(),
            protection: None,
            compression: None,
            compression_rate: 0.0,
            kind: SceneKind::Content,
            transition: None,
            original_duration: None,
            importance_level: None,
            adjustment: None,
        }
    }

    /// Create a content scene from a start time and a duration
    pub fn with_duration(id: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self::new(id, start_time, start_time + duration)
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn protected(mut self, protection: ProtectionInfo) -> Self {
        self.protection = Some(protection);
        self
    }

    pub fn compression(mut self, compression: CompressionInfo) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn compression_rate(mut self, rate: f64) -> Self {
        self.compression_rate = rate;
        self
    }

    /// Keep the start, move the end
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
        self.end_time = self.start_time + duration;
    }

    /// Keep the end, move the start
    pub fn set_start(&mut self, start_time: f64) {
        self.start_time = start_time;
        self.duration = self.end_time - start_time;
    }

    /// Keep the start, move the end
    pub fn set_end(&mut self, end_time: f64) {
        self.end_time = end_time;
        self.duration = end_time - self.start_time;
    }

    /// Move both boundaries by `offset` seconds
    pub fn shift(&mut self, offset: f64) {
        self.start_time += offset;
        self.end_time = self.start_time + self.duration;
    }

    /// Scale both boundaries around zero
    pub fn scale(&mut self, ratio: f64) {
        self.start_time *= ratio;
        self.duration *= ratio;
        self.end_time = self.start_time + self.duration;
    }

    /// Whether the scene explicitly opted into a protection strategy
    pub fn has_strategy(&self, strategy: ProtectionStrategy) -> bool {
        self.protection
            .as_ref()
            .is_some_and(|p| p.strategies.contains(&strategy))
    }

    /// Protection level declared on the scene itself
    pub fn declared_level(&self) -> ProtectionLevel {
        self.protection.as_ref().map(|p| p.level).unwrap_or_default()
    }

    pub fn is_transition(&self) -> bool {
        self.kind == SceneKind::Transition
    }

    /// Duration the scene had when a stage first touched it
    pub fn baseline_duration(&self) -> f64 {
        self.original_duration.unwrap_or(self.duration)
    }

    /// Remove pipeline scratch fields
    pub fn strip_scratch(&mut self) {
        self.original_duration = None;
        self.importance_level = None;
        self.adjustment = None;
    }
}

/// Sum of all scene durations
pub fn total_duration(scenes: &[Scene]) -> f64 {
    scenes.iter().map(|s| s.duration).sum()
}

/// Remove scratch fields from every scene of a list
pub fn strip_scratch(mut scenes: Vec<Scene>) -> Vec<Scene> {
    for scene in &mut scenes {
        scene.strip_scratch();
    }
    scenes
}

/// Scale `durations` down towards `budget`, never below each `floors[i]`.
///
/// Scenes pinned at their floor drop out and the ratio is recomputed over
/// the rest, so the result sums to `max(budget, sum(floors))` whenever the
/// input exceeds the budget. The ratio is never above 1.
pub(crate) fn fit_to_budget(durations: &[f64], floors: &[f64], budget: f64) -> Vec<f64> {
    let mut result = durations.to_vec();
    let total: f64 = durations.iter().sum();
    if total <= budget {
        return result;
    }

    let mut pinned = vec![false; durations.len()];
    for _ in 0..=durations.len() {
        let pinned_total: f64 = result
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| **p)
            .map(|(d, _)| *d)
            .sum();
        let free_total: f64 = durations
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|(d, _)| *d)
            .sum();
        if free_total <= 0.0 {
            break;
        }

        let ratio = ((budget - pinned_total) / free_total).clamp(0.0, 1.0);
        let mut newly_pinned = false;
        for i in 0..durations.len() {
            if pinned[i] {
                continue;
            }
            let scaled = durations[i] * ratio;
            if scaled <= floors[i] {
                result[i] = floors[i];
                pinned[i] = true;
                newly_pinned = true;
            } else {
                result[i] = scaled;
            }
        }
        if !newly_pinned {
            break;
        }
    }
    result
}

fn default_importance() -> f64 {
    0.5
}

fn default_allowed_ratio() -> f64 {
    0.0
}
