/*!
 * End-to-end reconciliation.
 *
 * Runs the timeline stages in their fixed order: gap erasing, transition
 * insertion, safety margin, overflow rescue. Each stage receives the
 * previous stage's output and the per-stage reports are collected.
 */

use log::{debug, info};
use serde::Serialize;

use crate::errors::OverflowError;
use crate::protection::ScenePolicy;
use crate::scene::{Scene, total_duration};

use super::gap_eraser::{GapEraser, GapEraserConfig};
use super::overflow::{OverflowConfig, OverflowRescuer, RescueReport};
use super::safety_margin::{MarginReport, SafetyMarginConfig, SafetyMarginKeeper};
use super::transitions::{TransitionConfig, TransitionInserter};

/// Gap stage counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapSummary {
    pub gaps_found: usize,
    pub gaps_erased: usize,
    pub skipped_protected: usize,
    pub erased_ms: f64,
}

/// Transition stage counters; `ran` is false when no rates were supplied
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitionSummary {
    pub ran: bool,
    pub inserted: usize,
    pub skipped: usize,
}

/// Reports from every stage of one reconcile run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub target: f64,
    pub input_duration: f64,
    pub final_duration: f64,
    pub gaps: GapSummary,
    pub transitions: TransitionSummary,
    pub margin: MarginReport,
    /// `None` when the margin stage already met the target
    pub rescue: Option<RescueReport>,
}

/// Output of a reconcile run
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub scenes: Vec<Scene>,
    pub report: ReconcileReport,
}

/// Composes the four timeline stages
pub struct ReconcilePipeline {
    gap_eraser: GapEraser,
    transitions: TransitionInserter,
    margin: SafetyMarginKeeper,
    rescuer: OverflowRescuer,
}

impl ReconcilePipeline {
    pub fn new(
        policy: ScenePolicy,
        gap: GapEraserConfig,
        transition: TransitionConfig,
        margin: SafetyMarginConfig,
        rescue: OverflowConfig,
    ) -> Self {
        Self {
            gap_eraser: GapEraser::new(gap, policy.clone()),
            transitions: TransitionInserter::new(transition, policy.clone()),
            margin: SafetyMarginKeeper::new(margin, policy.clone()),
            rescuer: OverflowRescuer::new(rescue, policy),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            ScenePolicy::default(),
            GapEraserConfig::default(),
            TransitionConfig::default(),
            SafetyMarginConfig::default(),
            OverflowConfig::default(),
        )
    }

    pub fn margin_keeper(&self) -> &SafetyMarginKeeper {
        &self.margin
    }

    /// Run every stage against `target` seconds
    pub fn reconcile(
        &self,
        scenes: &[Scene],
        target: f64,
    ) -> Result<ReconcileOutcome, OverflowError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(OverflowError::InvalidTarget(target));
        }

        let input_duration = total_duration(scenes);
        info!(
            "Reconciling {} scenes ({:.2}s) against target {:.2}s",
            scenes.len(),
            input_duration,
            target
        );

        let erased = self.gap_eraser.erase(scenes);
        let gaps = GapSummary {
            gaps_found: erased.gaps_found,
            gaps_erased: erased.gaps_erased,
            skipped_protected: erased.skipped_protected,
            erased_ms: erased.erased_ms,
        };

        let (scenes, transitions) = if erased.scenes.iter().any(|s| s.compression_rate > 0.0) {
            let result = self.transitions.insert(&erased.scenes);
            let summary = TransitionSummary {
                ran: true,
                inserted: result.inserted,
                skipped: result.skipped,
            };
            (result.scenes, summary)
        } else {
            debug!("No compression rates supplied, skipping transitions");
            (erased.scenes, TransitionSummary::default())
        };

        let adjusted = self.margin.adjust(&scenes, target);
        let margin = adjusted.report;

        let (scenes, rescue) = if total_duration(&adjusted.scenes) > target {
            let outcome = self.rescuer.handle(&adjusted.scenes, target)?;
            (outcome.scenes, Some(outcome.report))
        } else {
            debug!("Within target after safety margin, skipping overflow rescue");
            (adjusted.scenes, None)
        };

        let final_duration = total_duration(&scenes);
        info!(
            "Reconciled {:.2}s -> {:.2}s ({} scenes)",
            input_duration,
            final_duration,
            scenes.len()
        );

        Ok(ReconcileOutcome {
            scenes,
            report: ReconcileReport {
                target,
                input_duration,
                final_duration,
                gaps,
                transitions,
                margin,
                rescue,
            },
        })
    }
}

impl Default for ReconcilePipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}
