/*!
 * Timeline stages.
 *
 * Each stage is a pure transformation over a scene list; `pipeline`
 * composes them in the order gap erasing, transitions, safety margin,
 * overflow rescue.
 */

pub mod gap_eraser;
pub mod overflow;
pub mod pipeline;
pub mod safety_margin;
pub mod transitions;

pub use gap_eraser::{GapEraseResult, GapEraser, GapEraserConfig};
pub use overflow::{
    LevelTable, OverflowConfig, OverflowRescuer, RescueOutcome, RescueReport, RescueState,
};
pub use pipeline::{ReconcileOutcome, ReconcilePipeline, ReconcileReport};
pub use safety_margin::{
    MarginAdjustment, MarginReport, SafetyCheck, SafetyMarginConfig, SafetyMarginKeeper,
};
pub use transitions::{TransitionConfig, TransitionInserter, TransitionResult};
