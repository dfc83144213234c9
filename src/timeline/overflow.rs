/*!
 * Overflow rescue.
 *
 * The escalation authority of the timeline pipeline. When the scene total
 * still exceeds the target, scenes are sorted into importance tiers and a
 * compression ladder is climbed:
 *
 * - `Soft`: everyone shrinks a little, weighted by tier
 * - `Moderate`: low and medium tiers first, then high, then critical
 * - `Aggressive`: fixed per-tier ratios until the target is met
 * - `LastResort`: critical scenes keep most of their time, the rest is
 *   redistributed
 * - `Failed`: the target is structurally unreachable
 *
 * Every compression pass is computed from the durations the scenes had
 * when rescue started, so a pass depends only on its mode and the target.
 */

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::OverflowError;
use crate::protection::ScenePolicy;
use crate::scene::{AdjustmentInfo, ImportanceLevel, Scene, fit_to_budget, total_duration};

/// Bisection steps used to solve the soft-mode scale factor
const SOFT_SOLVER_STEPS: usize = 60;

/// States of the rescue ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueState {
    Soft,
    Moderate,
    Aggressive,
    LastResort,
    Failed,
}

impl RescueState {
    /// Next rung of the ladder
    pub fn escalate(self) -> Self {
        match self {
            Self::Soft => Self::Moderate,
            Self::Moderate => Self::Aggressive,
            Self::Aggressive => Self::LastResort,
            Self::LastResort | Self::Failed => Self::Failed,
        }
    }

    /// Whether this state is one of the iterative compression modes
    pub fn is_compression_mode(self) -> bool {
        matches!(self, Self::Soft | Self::Moderate | Self::Aggressive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
            Self::LastResort => "last_resort",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RescueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per importance tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl LevelTable {
    pub fn get(&self, level: ImportanceLevel) -> f64 {
        match level {
            ImportanceLevel::Critical => self.critical,
            ImportanceLevel::High => self.high,
            ImportanceLevel::Medium => self.medium,
            ImportanceLevel::Low => self.low,
        }
    }
}

/// Configuration for the overflow rescuer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowConfig {
    /// Maximum compression passes before last resort
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Allowed excess as a fraction of the target
    #[serde(default = "default_tolerance_ratio")]
    pub tolerance_ratio: f64,

    /// Upgrade the starting mode when many scenes are critical
    #[serde(default = "default_true")]
    pub auto_mode_select: bool,

    /// Overflow ratios below this start in soft mode
    #[serde(default = "default_soft_overflow_limit")]
    pub soft_overflow_limit: f64,

    /// Overflow ratios below this start in moderate mode
    #[serde(default = "default_moderate_overflow_limit")]
    pub moderate_overflow_limit: f64,

    /// Critical share above which soft is upgraded to moderate
    #[serde(default = "default_soft_upgrade_share")]
    pub soft_upgrade_critical_share: f64,

    /// Critical share above which moderate is upgraded to aggressive
    #[serde(default = "default_moderate_upgrade_share")]
    pub moderate_upgrade_critical_share: f64,

    /// Soft-mode retention weights per tier
    #[serde(default = "default_level_factors")]
    pub level_factors: LevelTable,

    /// Smallest ratio soft mode applies to any scene
    #[serde(default = "default_soft_min_ratio")]
    pub soft_min_ratio: f64,

    /// Moderate-mode lowest ratio per tier
    #[serde(default = "default_moderate_floors")]
    pub moderate_floors: LevelTable,

    /// Aggressive-mode fixed ratio per tier
    #[serde(default = "default_aggressive_ratios")]
    pub aggressive_ratios: LevelTable,

    /// Share of original duration critical scenes keep in last resort
    #[serde(default = "default_last_resort_critical_ratio")]
    pub last_resort_critical_ratio: f64,
}

impl Default for OverflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance_ratio: default_tolerance_ratio(),
            auto_mode_select: true,
            soft_overflow_limit: default_soft_overflow_limit(),
            moderate_overflow_limit: default_moderate_overflow_limit(),
            soft_upgrade_critical_share: default_soft_upgrade_share(),
            moderate_upgrade_critical_share: default_moderate_upgrade_share(),
            level_factors: default_level_factors(),
            soft_min_ratio: default_soft_min_ratio(),
            moderate_floors: default_moderate_floors(),
            aggressive_ratios: default_aggressive_ratios(),
            last_resort_critical_ratio: default_last_resort_critical_ratio(),
        }
    }
}

/// Summary of a rescue run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescueReport {
    /// Mode the ladder started in, `None` when no rescue was needed
    pub initial_mode: Option<RescueState>,
    /// State that produced the returned durations
    pub final_state: Option<RescueState>,
    /// Compression passes run
    pub iterations: usize,
    pub original_duration: f64,
    pub final_duration: f64,
    /// Share of content scenes in the critical tier
    pub critical_share: f64,
}

/// Output of a successful rescue
#[derive(Debug, Clone)]
pub struct RescueOutcome {
    pub scenes: Vec<Scene>,
    pub report: RescueReport,
}

/// Brings an overflowing timeline back under its target
pub struct OverflowRescuer {
    config: OverflowConfig,
    policy: ScenePolicy,
}

impl OverflowRescuer {
    pub fn new(config: OverflowConfig, policy: ScenePolicy) -> Self {
        Self { config, policy }
    }

    pub fn with_defaults() -> Self {
        Self::new(OverflowConfig::default(), ScenePolicy::default())
    }

    pub fn config(&self) -> &OverflowConfig {
        &self.config
    }

    /// Absolute tolerance for a target
    pub fn tolerance(&self, target: f64) -> f64 {
        self.config.tolerance_ratio * target
    }

    /// Rescue with automatic mode selection
    pub fn handle(&self, scenes: &[Scene], target: f64) -> Result<RescueOutcome, OverflowError> {
        self.run(scenes, target, None)
    }

    /// Rescue starting from a fixed mode, with auto-upgrade disabled.
    /// `Failed` is not a starting point and runs as `LastResort`.
    pub fn handle_with_mode(
        &self,
        scenes: &[Scene],
        target: f64,
        mode: RescueState,
    ) -> Result<RescueOutcome, OverflowError> {
        let mode = match mode {
            RescueState::Failed => RescueState::LastResort,
            other => other,
        };
        self.run(scenes, target, Some(mode))
    }

    /// Pick the starting mode for an overflow ratio
    pub fn select_mode(&self, overflow_ratio: f64, critical_share: f64) -> RescueState {
        let mut mode = if overflow_ratio < self.config.soft_overflow_limit {
            RescueState::Soft
        } else if overflow_ratio < self.config.moderate_overflow_limit {
            RescueState::Moderate
        } else {
            RescueState::Aggressive
        };

        if !self.config.auto_mode_select {
            return mode;
        }

        if mode == RescueState::Soft && critical_share > self.config.soft_upgrade_critical_share {
            info!(
                "Critical share {:.1}% upgrades soft rescue to moderate",
                critical_share * 100.0
            );
            mode = RescueState::Moderate;
        }
        if mode == RescueState::Moderate
            && critical_share > self.config.moderate_upgrade_critical_share
        {
            info!(
                "Critical share {:.1}% upgrades moderate rescue to aggressive",
                critical_share * 100.0
            );
            mode = RescueState::Aggressive;
        }
        mode
    }

    fn run(
        &self,
        scenes: &[Scene],
        target: f64,
        forced: Option<RescueState>,
    ) -> Result<RescueOutcome, OverflowError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(OverflowError::InvalidTarget(target));
        }

        let original_duration = total_duration(scenes);
        let mut working = self.assign_levels(scenes);
        let critical_share = self.critical_share(&working);

        if scenes.is_empty() || original_duration <= target {
            debug!(
                "Total {:.2}s within target {:.2}s, no rescue needed",
                original_duration, target
            );
            return Ok(RescueOutcome {
                scenes: scenes.to_vec(),
                report: RescueReport {
                    initial_mode: None,
                    final_state: None,
                    iterations: 0,
                    original_duration,
                    final_duration: original_duration,
                    critical_share,
                },
            });
        }

        let overflow_ratio = (original_duration - target) / original_duration;
        let tolerance = self.tolerance(target);
        let initial = match forced {
            Some(mode) => mode,
            None => self.select_mode(overflow_ratio, critical_share),
        };
        info!(
            "Overflow detected: {:.2}s against {:.2}s ({:.1}% over), starting in {} mode",
            original_duration,
            target,
            overflow_ratio * 100.0,
            initial
        );

        let mut state = initial;
        let mut iterations = 0;
        let mut current = original_duration;

        while state.is_compression_mode() && iterations < self.config.max_iterations {
            iterations += 1;
            match state {
                RescueState::Soft => self.apply_soft(&mut working, target),
                RescueState::Moderate => self.apply_moderate(&mut working, target),
                RescueState::Aggressive => self.apply_aggressive(&mut working, target),
                _ => unreachable!("loop only runs compression modes"),
            }
            current = total_duration(&working);
            debug!("Pass {} ({}): total {:.2}s", iterations, state, current);

            if current <= target + tolerance {
                break;
            }
            let next = state.escalate();
            info!(
                "{} rescue left {:.2}s over target, escalating to {}",
                state,
                current - target,
                next
            );
            state = next;
        }

        if current > target + tolerance {
            if state.is_compression_mode() {
                state = RescueState::LastResort;
            }
            warn!(
                "Applying last-resort reallocation: {:.2}s against {:.2}s",
                current, target
            );
            self.apply_last_resort(&mut working, target);
            current = total_duration(&working);

            if current > target + tolerance {
                error!(
                    "Overflow rescue failed: {:.2}s still exceeds target {:.2}s",
                    current, target
                );
                return Err(OverflowError::CriticalOverflow {
                    current,
                    target,
                    deficit: current - target,
                });
            }
        }

        for scene in &mut working {
            if let Some(original) = scene.original_duration {
                let ratio = if original > 0.0 {
                    scene.duration / original
                } else {
                    1.0
                };
                scene.adjustment = Some(AdjustmentInfo {
                    original_duration: original,
                    adjusted_duration: scene.duration,
                    compression_ratio: ratio,
                    mode: state.as_str().to_string(),
                });
            }
        }

        info!(
            "Overflow rescue finished in {} mode after {} passes: {:.2}s -> {:.2}s",
            state, iterations, original_duration, current
        );

        Ok(RescueOutcome {
            scenes: working,
            report: RescueReport {
                initial_mode: Some(initial),
                final_state: Some(state),
                iterations,
                original_duration,
                final_duration: current,
                critical_share,
            },
        })
    }

    /// Copy scenes and record tier plus starting duration on adjustable ones
    fn assign_levels(&self, scenes: &[Scene]) -> Vec<Scene> {
        scenes
            .iter()
            .map(|scene| {
                let mut scene = scene.clone();
                scene.importance_level = Some(self.policy.importance_level(&scene));
                if !self.policy.is_locked(&scene) {
                    scene.original_duration = Some(scene.duration);
                }
                scene
            })
            .collect()
    }

    fn critical_share(&self, scenes: &[Scene]) -> f64 {
        let content: Vec<&Scene> = scenes.iter().filter(|s| !s.is_transition()).collect();
        if content.is_empty() {
            return 0.0;
        }
        let critical = content
            .iter()
            .filter(|s| s.importance_level == Some(ImportanceLevel::Critical))
            .count();
        critical as f64 / content.len() as f64
    }

    fn level_of(scene: &Scene) -> ImportanceLevel {
        scene.importance_level.unwrap_or(ImportanceLevel::Medium)
    }

    /// Restore every adjustable scene to its starting duration
    fn reset(scenes: &mut [Scene]) {
        for scene in scenes.iter_mut() {
            if let Some(original) = scene.original_duration {
                scene.set_duration(original);
            }
        }
    }

    fn soft_total(&self, scenes: &[Scene], scale: f64) -> f64 {
        scenes
            .iter()
            .map(|scene| match scene.original_duration {
                Some(original) => {
                    let ratio = (self.config.level_factors.get(Self::level_of(scene)) * scale)
                        .clamp(self.config.soft_min_ratio, 1.0);
                    (original * ratio).max(self.policy.floor_for(scene))
                }
                None => scene.duration,
            })
            .sum()
    }

    /// Uniform shrink weighted by tier: each scene keeps `factor × scale`
    /// of its time, with `scale` the largest value that meets the target.
    fn apply_soft(&self, scenes: &mut [Scene], target: f64) {
        let min_factor = [
            self.config.level_factors.critical,
            self.config.level_factors.high,
            self.config.level_factors.medium,
            self.config.level_factors.low,
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
        .max(f64::EPSILON);

        let mut low = 0.0;
        let mut high = 1.0 / min_factor;
        if self.soft_total(scenes, low) <= target {
            for _ in 0..SOFT_SOLVER_STEPS {
                let mid = (low + high) / 2.0;
                if self.soft_total(scenes, mid) <= target {
                    low = mid;
                } else {
                    high = mid;
                }
            }
        }
        let scale = low;

        for scene in scenes.iter_mut() {
            if let Some(original) = scene.original_duration {
                let ratio = (self.config.level_factors.get(Self::level_of(scene)) * scale)
                    .clamp(self.config.soft_min_ratio, 1.0);
                let floor = self.policy.floor_for(scene);
                scene.set_duration((original * ratio).max(floor));
            }
        }
    }

    /// Tiered shrink: low and medium first, then high, then critical
    fn apply_moderate(&self, scenes: &mut [Scene], target: f64) {
        Self::reset(scenes);
        let floors = self.config.moderate_floors;
        let groups: [(&[ImportanceLevel], f64); 3] = [
            (
                &[ImportanceLevel::Low, ImportanceLevel::Medium],
                floors.low.min(floors.medium),
            ),
            (&[ImportanceLevel::High], floors.high),
            (&[ImportanceLevel::Critical], floors.critical),
        ];

        for (levels, group_floor) in groups {
            let excess = total_duration(scenes) - target;
            if excess <= 0.0 {
                break;
            }
            let in_group =
                |s: &Scene| s.original_duration.is_some() && levels.contains(&Self::level_of(s));
            let group_total: f64 = scenes
                .iter()
                .filter(|s| in_group(s))
                .map(|s| s.duration)
                .sum();
            if group_total <= 0.0 {
                continue;
            }

            let ratio = (1.0 - excess / group_total).max(group_floor);
            for scene in scenes.iter_mut().filter(|s| in_group(s)) {
                let floor = self.policy.floor_for(scene);
                let new_duration = (scene.duration * ratio).max(floor);
                scene.set_duration(new_duration);
            }
        }
    }

    /// Fixed per-tier ratios, lowest tier first, stopping once on target
    fn apply_aggressive(&self, scenes: &mut [Scene], target: f64) {
        Self::reset(scenes);
        let ratios = self.config.aggressive_ratios;
        for level in [
            ImportanceLevel::Low,
            ImportanceLevel::Medium,
            ImportanceLevel::High,
            ImportanceLevel::Critical,
        ] {
            let ratio = ratios.get(level);
            for scene in scenes
                .iter_mut()
                .filter(|s| s.original_duration.is_some() && Self::level_of(s) == level)
            {
                let floor = self.policy.floor_for(scene);
                let new_duration = (scene.baseline_duration() * ratio).max(floor);
                scene.set_duration(new_duration);
            }
            if total_duration(scenes) <= target {
                break;
            }
        }
    }

    /// Critical scenes keep most of their time; everything else shares the rest
    fn apply_last_resort(&self, scenes: &mut [Scene], target: f64) {
        Self::reset(scenes);

        let fixed: f64 = scenes
            .iter()
            .filter(|s| s.original_duration.is_none())
            .map(|s| s.duration)
            .sum();
        let available = target - fixed;
        let min = self.policy.min_scene_duration;

        let mut critical_idx = Vec::new();
        let mut other_idx = Vec::new();
        for (i, scene) in scenes.iter().enumerate() {
            if scene.original_duration.is_none() {
                continue;
            }
            if Self::level_of(scene) == ImportanceLevel::Critical {
                critical_idx.push(i);
            } else {
                other_idx.push(i);
            }
        }

        let floor_of = |s: &Scene| min.min(s.baseline_duration());
        let critical_floors: Vec<f64> = critical_idx.iter().map(|&i| floor_of(&scenes[i])).collect();
        let other_floors: Vec<f64> = other_idx.iter().map(|&i| floor_of(&scenes[i])).collect();
        let critical_keep: Vec<f64> = critical_idx
            .iter()
            .zip(&critical_floors)
            .map(|(&i, &floor)| {
                (scenes[i].baseline_duration() * self.config.last_resort_critical_ratio).max(floor)
            })
            .collect();

        let keep_total: f64 = critical_keep.iter().sum();
        let other_floor_total: f64 = other_floors.iter().sum();

        let (critical_new, other_new) = if keep_total + other_floor_total > available {
            debug!("Critical scenes alone exceed the budget, shrinking them proportionally");
            let budget = available - other_floor_total;
            (
                fit_to_budget(&critical_keep, &critical_floors, budget),
                other_floors.clone(),
            )
        } else {
            let remaining = available - keep_total;
            let originals: Vec<f64> = other_idx
                .iter()
                .map(|&i| scenes[i].baseline_duration())
                .collect();
            (
                critical_keep.clone(),
                fit_to_budget(&originals, &other_floors, remaining),
            )
        };

        for (&i, &duration) in critical_idx.iter().zip(&critical_new) {
            scenes[i].set_duration(duration);
        }
        for (&i, &duration) in other_idx.iter().zip(&other_new) {
            scenes[i].set_duration(duration);
        }
    }
}

impl Default for OverflowRescuer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_max_iterations() -> usize {
    5
}

fn default_tolerance_ratio() -> f64 {
    0.01
}

fn default_true() -> bool {
    true
}

fn default_soft_overflow_limit() -> f64 {
    0.05
}

fn default_moderate_overflow_limit() -> f64 {
    0.15
}

fn default_soft_upgrade_share() -> f64 {
    0.5
}

fn default_moderate_upgrade_share() -> f64 {
    0.7
}

fn default_level_factors() -> LevelTable {
    LevelTable {
        critical: 1.0,
        high: 0.95,
        medium: 0.9,
        low: 0.8,
    }
}

fn default_soft_min_ratio() -> f64 {
    0.85
}

fn default_moderate_floors() -> LevelTable {
    LevelTable {
        critical: 0.9,
        high: 0.8,
        medium: 0.7,
        low: 0.7,
    }
}

fn default_aggressive_ratios() -> LevelTable {
    LevelTable {
        critical: 0.95,
        high: 0.85,
        medium: 0.7,
        low: 0.6,
    }
}

fn default_last_resort_critical_ratio() -> f64 {
    0.9
}
