/*!
 * Asset duration measurement with cross-validation.
 *
 * The primary measurement is frame count over frame rate. When that is
 * unusable, frame timestamps are enumerated; container metadata serves as
 * both the secondary check and the last fallback.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;

/// Raw duration sources of a media asset
pub trait DurationProbe {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// `(frame_count, frame_rate)` when the stream header provides them
    fn frame_stats(&self) -> Option<(u64, f64)>;

    /// Duration declared by the container, in seconds
    fn container_duration(&self) -> Option<f64>;

    /// Presentation timestamps of every frame, in seconds
    fn frame_timestamps(&self) -> Option<Vec<f64>>;
}

/// Serializable asset description implementing `DurationProbe`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_timestamps: Option<Vec<f64>>,
}

impl DurationProbe for MediaAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_stats(&self) -> Option<(u64, f64)> {
        match (self.frame_count, self.frame_rate) {
            (Some(count), Some(fps)) => Some((count, fps)),
            _ => None,
        }
    }

    fn container_duration(&self) -> Option<f64> {
        self.container_duration
    }

    fn frame_timestamps(&self) -> Option<Vec<f64>> {
        self.frame_timestamps.clone()
    }
}

/// Which source produced the reported duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMethod {
    FrameCount,
    FrameTimestamps,
    ContainerMetadata,
}

/// Result of analysing one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationReport {
    pub duration: f64,
    pub method: MeasurementMethod,
    /// Container duration when it was available and not already used
    pub secondary: Option<f64>,
    pub discrepancy: Option<f64>,
    /// False when the two measurements disagree beyond tolerance
    pub consistent: bool,
}

/// Configuration for the duration analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Allowed disagreement between measurements, in seconds
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
        }
    }
}

/// Measures and cross-checks asset durations
pub struct DurationAnalyzer {
    config: AnalyzerConfig,
}

impl DurationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AnalyzerConfig::default())
    }

    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    /// Measure an asset's duration
    pub fn analyze<P: DurationProbe + ?Sized>(
        &self,
        asset: &P,
    ) -> Result<DurationReport, AnalysisError> {
        let secondary = asset
            .container_duration()
            .filter(|d| d.is_finite() && *d > 0.0);

        let primary = match Self::from_frame_stats(asset) {
            Some(duration) => Some((duration, MeasurementMethod::FrameCount)),
            None => {
                debug!(
                    "Frame statistics unusable for {}, enumerating timestamps",
                    asset.name()
                );
                Self::from_timestamps(asset).map(|d| (d, MeasurementMethod::FrameTimestamps))
            }
        };

        let Some((duration, method)) = primary else {
            return match secondary {
                Some(duration) => {
                    debug!("Using container metadata for {}", asset.name());
                    Ok(DurationReport {
                        duration,
                        method: MeasurementMethod::ContainerMetadata,
                        secondary: None,
                        discrepancy: None,
                        consistent: true,
                    })
                }
                None => Err(AnalysisError::MeasurementUnavailable {
                    asset: asset.name().to_string(),
                }),
            };
        };

        let discrepancy = secondary.map(|s| (duration - s).abs());
        let consistent = discrepancy.is_none_or(|d| d <= self.config.tolerance);
        if let (false, Some(d)) = (consistent, discrepancy) {
            warn!(
                "Duration disagreement for {}: {:.3}s by {:?}, {:.3}s from container (off by {:.3}s)",
                asset.name(),
                duration,
                method,
                secondary.unwrap_or_default(),
                d
            );
        }

        Ok(DurationReport {
            duration,
            method,
            secondary,
            discrepancy,
            consistent,
        })
    }

    /// Check a duration against the container metadata.
    /// Returns false when no container duration is available.
    pub fn verify<P: DurationProbe + ?Sized>(&self, asset: &P, duration: f64) -> bool {
        match asset.container_duration() {
            Some(secondary) if secondary.is_finite() && secondary > 0.0 => {
                (duration - secondary).abs() <= self.config.tolerance
            }
            _ => false,
        }
    }

    fn from_frame_stats<P: DurationProbe + ?Sized>(asset: &P) -> Option<f64> {
        let (count, fps) = asset.frame_stats()?;
        if count == 0 || !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        Some(count as f64 / fps)
    }

    /// Span of the timestamps plus one mean frame interval
    fn from_timestamps<P: DurationProbe + ?Sized>(asset: &P) -> Option<f64> {
        let mut stamps = asset.frame_timestamps()?;
        stamps.retain(|t| t.is_finite());
        if stamps.len() < 2 {
            return None;
        }
        stamps.sort_by(f64::total_cmp);
        let first = stamps[0];
        let last = stamps[stamps.len() - 1];
        let span = last - first;
        if span <= 0.0 {
            return None;
        }
        let mean_interval = span / (stamps.len() - 1) as f64;
        Some(span + mean_interval)
    }
}

impl Default for DurationAnalyzer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_tolerance() -> f64 {
    0.05
}
