/*!
 * Millisecond gap elimination.
 *
 * Upstream cut detection often leaves tiny holes between adjacent scenes.
 * Gaps inside the configured window are closed by moving the boundary of
 * the unprotected neighbour; smaller gaps are ignored as noise and larger
 * gaps are treated as intentional.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::protection::ScenePolicy;
use crate::scene::Scene;

/// Float slack when comparing gap sizes, in milliseconds
const GAP_EPSILON_MS: f64 = 1e-6;

/// Configuration for gap erasing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapEraserConfig {
    /// Smallest gap worth closing, in milliseconds
    #[serde(default = "default_min_gap_threshold")]
    pub min_gap_threshold: f64,

    /// Largest gap still considered a rounding artifact, in milliseconds
    #[serde(default = "default_max_gap_threshold")]
    pub max_gap_threshold: f64,

    /// Extend the earlier scene rather than pulling back the later one
    #[serde(default = "default_true")]
    pub prefer_end_adjustment: bool,
}

impl Default for GapEraserConfig {
    fn default() -> Self {
        Self {
            min_gap_threshold: default_min_gap_threshold(),
            max_gap_threshold: default_max_gap_threshold(),
            prefer_end_adjustment: true,
        }
    }
}

/// Which boundary was moved to close a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapSide {
    /// Move `prev.end_time` forward
    PrevEnd,
    /// Move `curr.start_time` back
    CurrStart,
}

/// Output of a gap erasing pass
#[derive(Debug, Clone)]
pub struct GapEraseResult {
    /// Scenes with eligible gaps closed
    pub scenes: Vec<Scene>,
    /// Gaps that fell inside the threshold window
    pub gaps_found: usize,
    /// Gaps actually closed
    pub gaps_erased: usize,
    /// Gaps left because both neighbours were protected
    pub skipped_protected: usize,
    /// Total time closed, in milliseconds
    pub erased_ms: f64,
}

/// Closes micro-gaps between adjacent scenes
pub struct GapEraser {
    config: GapEraserConfig,
    policy: ScenePolicy,
}

impl GapEraser {
    pub fn new(config: GapEraserConfig, policy: ScenePolicy) -> Self {
        Self { config, policy }
    }

    pub fn with_defaults() -> Self {
        Self::new(GapEraserConfig::default(), ScenePolicy::default())
    }

    pub fn config(&self) -> &GapEraserConfig {
        &self.config
    }

    /// Gap between two scenes in milliseconds (negative when they overlap)
    pub fn gap_ms(prev: &Scene, curr: &Scene) -> f64 {
        (curr.start_time - prev.end_time) * 1000.0
    }

    /// Whether a gap falls inside the configured window
    pub fn is_erasable(&self, gap_ms: f64) -> bool {
        gap_ms + GAP_EPSILON_MS >= self.config.min_gap_threshold
            && gap_ms - GAP_EPSILON_MS <= self.config.max_gap_threshold
            && gap_ms > 0.0
    }

    /// Close every eligible gap, returning a new list
    pub fn erase(&self, scenes: &[Scene]) -> GapEraseResult {
        let mut result: Vec<Scene> = scenes.to_vec();
        let mut gaps_found = 0;
        let mut gaps_erased = 0;
        let mut skipped_protected = 0;
        let mut erased_ms = 0.0;

        for i in 1..result.len() {
            let gap = Self::gap_ms(&result[i - 1], &result[i]);
            if !self.is_erasable(gap) {
                continue;
            }
            gaps_found += 1;

            let side = match self.choose_side(&result[i - 1], &result[i]) {
                Some(side) => side,
                None => {
                    debug!(
                        "Keeping {:.1}ms gap between protected scenes {} and {}",
                        gap,
                        result[i - 1].id,
                        result[i].id
                    );
                    skipped_protected += 1;
                    continue;
                }
            };

            match side {
                GapSide::PrevEnd => {
                    let target = result[i].start_time;
                    result[i - 1].set_end(target);
                }
                GapSide::CurrStart => {
                    let target = result[i - 1].end_time;
                    result[i].set_start(target);
                }
            }

            debug!(
                "Closed {:.1}ms gap between {} and {} ({:?})",
                gap,
                result[i - 1].id,
                result[i].id,
                side
            );
            gaps_erased += 1;
            erased_ms += gap;
        }

        if gaps_found > 0 {
            info!(
                "Gap eraser: {} of {} gaps closed ({:.1}ms), {} protected",
                gaps_erased, gaps_found, erased_ms, skipped_protected
            );
        }

        GapEraseResult {
            scenes: result,
            gaps_found,
            gaps_erased,
            skipped_protected,
            erased_ms,
        }
    }

    fn choose_side(&self, prev: &Scene, curr: &Scene) -> Option<GapSide> {
        let prev_protected = self.policy.is_gap_protected(prev);
        let curr_protected = self.policy.is_gap_protected(curr);

        match (prev_protected, curr_protected) {
            (true, true) => None,
            (false, true) => Some(GapSide::PrevEnd),
            (true, false) => Some(GapSide::CurrStart),
            (false, false) if self.config.prefer_end_adjustment => Some(GapSide::PrevEnd),
            (false, false) => Some(GapSide::CurrStart),
        }
    }
}

impl Default for GapEraser {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_min_gap_threshold() -> f64 {
    1.0
}

fn default_max_gap_threshold() -> f64 {
    50.0
}

fn default_true() -> bool {
    true
}
