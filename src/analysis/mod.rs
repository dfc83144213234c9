/*!
 * Duration analysis.
 */

pub mod duration;

pub use duration::{
    AnalyzerConfig, DurationAnalyzer, DurationProbe, DurationReport, MeasurementMethod, MediaAsset,
};
