/*!
 * Transition insertion between heavily compressed scenes.
 *
 * When two neighbours were squeezed hard, a hard cut between them reads
 * as a glitch. This stage carves a short synthetic transition out of the
 * two neighbours, half from each side, so the total duration is unchanged.
 * A transition always starts where the shortened previous scene ends and
 * lasts exactly its clamped duration. Any gap left between the pair stays
 * between the transition and the next scene.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::protection::ScenePolicy;
use crate::scene::{ProtectionStrategy, Scene, SceneKind, TransitionInfo, TransitionType};

/// Configuration for transition insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Mean compression rate of a pair above which a transition is inserted
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: f64,

    /// Shortest transition, in seconds
    #[serde(default = "default_min_transition_duration")]
    pub min_transition_duration: f64,

    /// Longest transition, in seconds
    #[serde(default = "default_max_transition_duration")]
    pub max_transition_duration: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            compression_threshold: default_compression_threshold(),
            min_transition_duration: default_min_transition_duration(),
            max_transition_duration: default_max_transition_duration(),
        }
    }
}

/// Output of a transition pass
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub scenes: Vec<Scene>,
    /// Number of transition scenes added
    pub inserted: usize,
    /// Pairs over the threshold that were left alone
    pub skipped: usize,
}

/// Inserts synthetic transition scenes
pub struct TransitionInserter {
    config: TransitionConfig,
    policy: ScenePolicy,
}

impl TransitionInserter {
    pub fn new(config: TransitionConfig, policy: ScenePolicy) -> Self {
        Self { config, policy }
    }

    pub fn with_defaults() -> Self {
        Self::new(TransitionConfig::default(), ScenePolicy::default())
    }

    /// Pick a transition style from the tags of either neighbour
    pub fn select_type(prev: &Scene, next: &Scene) -> TransitionType {
        let has_any = |names: &[&str]| {
            names
                .iter()
                .any(|n| prev.tags.contains(*n) || next.tags.contains(*n))
        };

        if has_any(&["action", "dynamic"]) {
            TransitionType::Dynamic
        } else if has_any(&["transition", "scene_change"]) {
            TransitionType::Slide
        } else if has_any(&["emotion", "mood"]) {
            TransitionType::Fade
        } else {
            TransitionType::Crossfade
        }
    }

    /// Weighted, clamped transition length in seconds
    pub fn transition_duration(&self, kind: TransitionType, prev: &Scene, next: &Scene) -> f64 {
        let importance_factor = (prev.importance + next.importance) / 2.0;
        let compression_factor = (prev.compression_rate + next.compression_rate) / 2.0;
        let weighted =
            kind.base_duration() * (1.0 - importance_factor * 0.3 + compression_factor * 0.5);
        weighted.clamp(
            self.config.min_transition_duration,
            self.config.max_transition_duration,
        )
    }

    /// Insert transitions between every eligible pair
    pub fn insert(&self, scenes: &[Scene]) -> TransitionResult {
        if scenes.len() < 2 {
            return TransitionResult {
                scenes: scenes.to_vec(),
                inserted: 0,
                skipped: 0,
            };
        }

        let mut output: Vec<Scene> = Vec::with_capacity(scenes.len() * 2);
        let mut inserted = 0;
        let mut skipped = 0;

        output.push(scenes[0].clone());
        for next in &scenes[1..] {
            let mut next = next.clone();
            // The previous scene may already have lost time to an earlier transition.
            let prev_idx = output.len() - 1;

            let pair_rate = (output[prev_idx].compression_rate + next.compression_rate) / 2.0;
            if pair_rate <= self.config.compression_threshold {
                output.push(next);
                continue;
            }

            match self.build_transition(&output[prev_idx], &next) {
                Some((kind, duration)) => {
                    let half = duration / 2.0;
                    let prev = &mut output[prev_idx];
                    let new_prev_end = prev.end_time - half;
                    prev.set_end(new_prev_end);
                    let new_next_start = next.start_time + half;
                    next.set_start(new_next_start);

                    let transition = make_transition(kind, duration, prev, &next);
                    debug!(
                        "Inserted {} transition ({:.3}s) between {} and {}",
                        kind, transition.duration, prev.id, next.id
                    );
                    output.push(transition);
                    inserted += 1;
                }
                None => skipped += 1,
            }
            output.push(next);
        }

        if inserted > 0 || skipped > 0 {
            info!(
                "Transition inserter: {} inserted, {} eligible pairs skipped",
                inserted, skipped
            );
        }

        TransitionResult {
            scenes: output,
            inserted,
            skipped,
        }
    }

    fn build_transition(&self, prev: &Scene, next: &Scene) -> Option<(TransitionType, f64)> {
        let blocked = |s: &Scene| {
            self.policy.is_locked(s) || s.has_strategy(ProtectionStrategy::NoTransition)
        };
        if blocked(prev) || blocked(next) {
            debug!("Transition blocked between {} and {}", prev.id, next.id);
            return None;
        }

        if self.policy.effective_level(prev).is_strong()
            && self.policy.effective_level(next).is_strong()
        {
            debug!("Both {} and {} are protected, no transition", prev.id, next.id);
            return None;
        }

        let kind = Self::select_type(prev, next);
        let duration = self.transition_duration(kind, prev, next);
        let half = duration / 2.0;
        let min = self.policy.min_scene_duration;
        if prev.duration - half < min || next.duration - half < min {
            debug!(
                "Transition between {} and {} would undercut minimum duration",
                prev.id, next.id
            );
            return None;
        }

        Some((kind, duration))
    }
}

impl Default for TransitionInserter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn make_transition(kind: TransitionType, duration: f64, prev: &Scene, next: &Scene) -> Scene {
    let mut scene = Scene::with_duration(
        format!("transition_{}_{}", prev.id, next.id),
        prev.end_time,
        duration,
    );
    scene.kind = SceneKind::Transition;
    scene.tags.insert("transition".to_string());
    scene.importance = (prev.importance + next.importance) / 2.0;
    scene.transition = Some(TransitionInfo {
        transition_type: kind,
        source_scenes: [prev.id.clone(), next.id.clone()],
    });
    scene
}

fn default_compression_threshold() -> f64 {
    0.3
}

fn default_min_transition_duration() -> f64 {
    0.02
}

fn default_max_transition_duration() -> f64 {
    0.5
}
