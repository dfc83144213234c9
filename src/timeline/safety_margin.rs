/*!
 * Safety margin enforcement.
 *
 * Keeps a configurable fraction of the target duration in reserve so that
 * downstream rounding (frame snapping, container padding) cannot push the
 * final cut over the limit. Only compressible scenes absorb the reduction;
 * protected scenes keep their exact durations.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::protection::ScenePolicy;
use crate::scene::{Scene, total_duration};

/// Lowest uniform ratio applied to compressible scenes
const MIN_UNIFORM_RATIO: f64 = 0.2;

/// Configuration for the safety margin keeper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyMarginConfig {
    /// Fraction of the target kept in reserve
    #[serde(default = "default_margin_ratio")]
    pub margin_ratio: f64,

    #[serde(default = "default_min_margin")]
    pub min_margin: f64,

    #[serde(default = "default_max_margin")]
    pub max_margin: f64,

    /// Share of the target above which a timeline is considered unsafe
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
}

impl Default for SafetyMarginConfig {
    fn default() -> Self {
        Self {
            margin_ratio: default_margin_ratio(),
            min_margin: default_min_margin(),
            max_margin: default_max_margin(),
            critical_threshold: default_critical_threshold(),
        }
    }
}

/// Result of a safety check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetyCheck {
    pub safe: bool,
    /// current / target
    pub ratio: f64,
    /// Ratio the timeline must be scaled by to become safe (1.0 when safe)
    pub compression_ratio: f64,
    pub safe_target: f64,
}

/// Structured report of an `adjust` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginReport {
    pub original_duration: f64,
    pub new_duration: f64,
    pub adjusted_count: usize,
    pub protected_count: usize,
    /// Uniform ratio applied to compressible scenes
    pub applied_ratio: f64,
    /// Why nothing was changed, when nothing was
    pub reason: Option<String>,
}

/// Output of `adjust`
#[derive(Debug, Clone)]
pub struct MarginAdjustment {
    pub scenes: Vec<Scene>,
    pub report: MarginReport,
}

/// Keeps a reserve between the timeline total and the target
#[derive(Debug, Clone)]
pub struct SafetyMarginKeeper {
    config: SafetyMarginConfig,
    policy: ScenePolicy,
    margin: f64,
}

impl SafetyMarginKeeper {
    pub fn new(config: SafetyMarginConfig, policy: ScenePolicy) -> Self {
        let margin = config.margin_ratio.clamp(config.min_margin, config.max_margin);
        Self {
            config,
            policy,
            margin,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SafetyMarginConfig::default(), ScenePolicy::default())
    }

    /// Current margin ratio after clamping
    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Change the margin; the value is clamped to the configured bounds
    pub fn set_margin(&mut self, margin_ratio: f64) -> f64 {
        self.margin = margin_ratio.clamp(self.config.min_margin, self.config.max_margin);
        debug!("Safety margin set to {:.1}%", self.margin * 100.0);
        self.margin
    }

    /// Target reduced by the margin
    pub fn apply_margin(&self, target: f64) -> f64 {
        target * (1.0 - self.margin)
    }

    /// Compare a duration against the critical share of the target
    pub fn check_safety(&self, current: f64, target: f64) -> SafetyCheck {
        let safe_target = target * self.config.critical_threshold;
        let ratio = if target > 0.0 {
            current / target
        } else {
            f64::INFINITY
        };
        let safe = ratio <= self.config.critical_threshold;
        let compression_ratio = if safe || current <= 0.0 {
            1.0
        } else {
            safe_target / current
        };

        SafetyCheck {
            safe,
            ratio,
            compression_ratio,
            safe_target,
        }
    }

    /// Shrink compressible scenes so the total fits inside the margin
    pub fn adjust(&self, scenes: &[Scene], target: f64) -> MarginAdjustment {
        let original_duration = total_duration(scenes);
        let safe_duration = self.apply_margin(target);

        let protected: Vec<bool> = scenes
            .iter()
            .map(|s| self.policy.is_compression_protected(s))
            .collect();
        let protected_count = protected.iter().filter(|p| **p).count();

        let unchanged = |reason: &str| MarginAdjustment {
            scenes: scenes.to_vec(),
            report: MarginReport {
                original_duration,
                new_duration: original_duration,
                adjusted_count: 0,
                protected_count,
                applied_ratio: 1.0,
                reason: Some(reason.to_string()),
            },
        };

        if original_duration <= safe_duration {
            return unchanged("within safe duration");
        }

        let compressible_total: f64 = scenes
            .iter()
            .zip(&protected)
            .filter(|(_, p)| !**p)
            .map(|(s, _)| s.duration)
            .sum();
        if compressible_total <= 0.0 {
            info!("Safety margin: no compressible scenes, deferring to overflow rescue");
            return unchanged("no compressible scenes");
        }

        let reduction = original_duration - safe_duration;
        let ratio = (1.0 - reduction / compressible_total).max(MIN_UNIFORM_RATIO);

        let mut adjusted_count = 0;
        let mut result = Vec::with_capacity(scenes.len());
        for (scene, is_protected) in scenes.iter().zip(&protected) {
            let mut scene = scene.clone();
            if !*is_protected {
                let floor = self.policy.floor_for(&scene);
                let new_duration = (scene.duration * ratio).max(floor).min(scene.duration);
                if new_duration < scene.duration {
                    scene.set_duration(new_duration);
                    adjusted_count += 1;
                }
            }
            result.push(scene);
        }

        let new_duration = total_duration(&result);
        info!(
            "Safety margin: {:.2}s -> {:.2}s (safe {:.2}s, ratio {:.3}, {} adjusted, {} protected)",
            original_duration, new_duration, safe_duration, ratio, adjusted_count, protected_count
        );

        MarginAdjustment {
            scenes: result,
            report: MarginReport {
                original_duration,
                new_duration,
                adjusted_count,
                protected_count,
                applied_ratio: ratio,
                reason: None,
            },
        }
    }
}

impl Default for SafetyMarginKeeper {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_margin_ratio() -> f64 {
    0.05
}

fn default_min_margin() -> f64 {
    0.02
}

fn default_max_margin() -> f64 {
    0.15
}

fn default_critical_threshold() -> f64 {
    0.95
}
