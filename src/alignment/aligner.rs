/*!
 * Multi-track alignment.
 *
 * Picks a base track and brings every other track to its duration with
 * the edit that suits its media type: audio is shifted when the drift is
 * small and stretched otherwise, video is stretched inside a safe ratio
 * window and cropped or padded outside it, subtitles have their cues
 * rescaled, and anything else is cropped or padded.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::AlignmentError;

use super::track::{AlignStrategy, AlignmentRecord, Track, TrackType};

/// Configuration for the multi-track aligner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Duration differences at or below this are left alone, in seconds
    #[serde(default = "default_alignment_threshold")]
    pub alignment_threshold: f64,

    /// Largest drift audio may absorb by shifting, in milliseconds
    #[serde(default = "default_max_shift_ms")]
    pub max_shift_ms: f64,

    /// Shift audio rather than stretch it when the drift allows
    #[serde(default = "default_true")]
    pub prefer_audio_intact: bool,

    /// Smallest video stretch ratio
    #[serde(default = "default_min_stretch_ratio")]
    pub min_stretch_ratio: f64,

    /// Video may be lengthened up to `1 / max_stretch_ratio`
    #[serde(default = "default_max_stretch_ratio")]
    pub max_stretch_ratio: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            alignment_threshold: default_alignment_threshold(),
            max_shift_ms: default_max_shift_ms(),
            prefer_audio_intact: true,
            min_stretch_ratio: default_min_stretch_ratio(),
            max_stretch_ratio: default_max_stretch_ratio(),
        }
    }
}

/// Aligns tracks to a common base duration
pub struct MultiTrackAligner {
    config: AlignmentConfig,
}

impl MultiTrackAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AlignmentConfig::default())
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Choose the base: explicit flag, then main video, then first video,
    /// then the longest track
    pub fn find_base<'a>(&self, tracks: &'a BTreeMap<String, Track>) -> Option<&'a str> {
        if let Some((id, _)) = tracks.iter().find(|(_, t)| t.is_base) {
            return Some(id);
        }
        if let Some((id, _)) = tracks
            .iter()
            .find(|(_, t)| t.track_type == TrackType::Video && t.is_main)
        {
            return Some(id);
        }
        if let Some((id, _)) = tracks
            .iter()
            .find(|(_, t)| t.track_type == TrackType::Video)
        {
            return Some(id);
        }
        tracks
            .iter()
            .max_by(|a, b| a.1.duration.total_cmp(&b.1.duration))
            .map(|(id, _)| id.as_str())
    }

    /// Align every non-base track to the base duration
    pub fn align(
        &self,
        tracks: &BTreeMap<String, Track>,
    ) -> Result<BTreeMap<String, Track>, AlignmentError> {
        for track in tracks.values() {
            if !track.duration.is_finite() || track.duration <= 0.0 {
                return Err(AlignmentError::InvalidDuration {
                    track_id: track.id.clone(),
                    duration: track.duration,
                });
            }
        }

        let mut aligned = tracks.clone();
        if tracks.len() < 2 {
            debug!("Fewer than two tracks, nothing to align");
            return Ok(aligned);
        }

        let Some(base_id) = self.find_base(tracks) else {
            return Ok(aligned);
        };
        let base_duration = tracks[base_id].duration;
        info!("Aligning to base track {} ({:.3}s)", base_id, base_duration);

        for (id, track) in aligned.iter_mut() {
            if id == base_id {
                continue;
            }
            let diff = track.duration - base_duration;
            if diff.abs() <= self.config.alignment_threshold {
                debug!("Track {} within threshold ({:+.3}s)", id, diff);
                continue;
            }
            self.align_track(track, base_duration);
        }

        Ok(aligned)
    }

    /// Bring a single track to `target` seconds
    pub fn align_track(&self, track: &mut Track, target: f64) {
        let original = track.duration;
        let record = match track.track_type {
            TrackType::Audio => self.align_audio(track, target),
            TrackType::Video => self.align_video(track, target),
            TrackType::Subtitle => Self::align_subtitle(track, target),
            TrackType::Other => Self::crop_or_pad(track, target),
        };
        info!(
            "Aligned {} track {}: {:.3}s -> {:.3}s ({:?})",
            track.track_type, track.id, original, track.duration, record.strategy
        );
        track.alignment = Some(record);
    }

    fn align_audio(&self, track: &mut Track, target: f64) -> AlignmentRecord {
        let original = track.duration;
        let diff = original - target;

        if self.config.prefer_audio_intact && diff.abs() <= self.config.max_shift_ms / 1000.0 {
            let offset = -diff / 2.0;
            track.shift(offset);
            track.duration = target;
            let mut record = AlignmentRecord::new(original, target, AlignStrategy::Shift);
            record.time_shift = Some(offset);
            return record;
        }

        Self::stretch_to(track, target)
    }

    fn align_video(&self, track: &mut Track, target: f64) -> AlignmentRecord {
        let ratio = target / track.duration;
        let upper = 1.0 / self.config.max_stretch_ratio;

        if ratio >= self.config.min_stretch_ratio && ratio <= upper {
            Self::stretch_to(track, target)
        } else {
            warn!(
                "Video stretch ratio {:.4} outside [{:.3}, {:.4}], cropping or padding {}",
                ratio, self.config.min_stretch_ratio, upper, track.id
            );
            Self::crop_or_pad(track, target)
        }
    }

    fn align_subtitle(track: &mut Track, target: f64) -> AlignmentRecord {
        let original = track.duration;
        let ratio = target / original;
        track.rescale_cues(ratio);
        track.duration = target;
        let mut record = AlignmentRecord::new(original, target, AlignStrategy::Rescale);
        record.stretch_ratio = Some(ratio);
        record
    }

    fn stretch_to(track: &mut Track, target: f64) -> AlignmentRecord {
        let original = track.duration;
        let ratio = target / original;
        let original_fps = track.frame_rate;
        track.stretch(ratio);
        // Float drift from the multiply must not leak into the duration.
        track.duration = target;

        let mut record = AlignmentRecord::new(original, target, AlignStrategy::Stretch);
        record.stretch_ratio = Some(ratio);
        record.original_frame_rate = original_fps;
        record
    }

    fn crop_or_pad(track: &mut Track, target: f64) -> AlignmentRecord {
        let original = track.duration;
        if original > target {
            let span = track.crop(target);
            let mut record = AlignmentRecord::new(original, target, AlignStrategy::Crop);
            record.crop = Some(span);
            record
        } else {
            let span = track.pad(target);
            let mut record = AlignmentRecord::new(original, target, AlignStrategy::Pad);
            record.pad = Some(span);
            record
        }
    }
}

impl Default for MultiTrackAligner {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Align an audio and a video track to each other.
///
/// The video track is the base unless the audio track is flagged `is_base`.
pub fn align_pair(audio: &Track, video: &Track) -> Result<(Track, Track), AlignmentError> {
    let mut main_video = video.clone();
    if !audio.is_base {
        main_video.is_main = true;
    }
    let mut tracks = BTreeMap::new();
    tracks.insert("audio".to_string(), audio.clone());
    tracks.insert("video".to_string(), main_video.clone());

    let mut aligned = MultiTrackAligner::with_defaults().align(&tracks)?;
    let aligned_audio = aligned.remove("audio").unwrap_or_else(|| audio.clone());
    let aligned_video = aligned.remove("video").unwrap_or(main_video);
    Ok((aligned_audio, aligned_video))
}

/// Align a list of tracks, preserving input order
pub fn align_list(tracks: &[Track]) -> Result<Vec<Track>, AlignmentError> {
    let keyed: BTreeMap<String, Track> = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| (format!("track_{:06}", i), t.clone()))
        .collect();
    let aligned = MultiTrackAligner::with_defaults().align(&keyed)?;
    Ok(aligned.into_values().collect())
}

fn default_alignment_threshold() -> f64 {
    1.0
}

fn default_max_shift_ms() -> f64 {
    5000.0
}

fn default_true() -> bool {
    true
}

fn default_min_stretch_ratio() -> f64 {
    0.5
}

fn default_max_stretch_ratio() -> f64 {
    0.999
}
