/*!
 * Media track model and the elementary edits the aligner applies to it.
 *
 * Track-local time starts at zero; scene, keyframe and cue timestamps are
 * expressed in that frame. Every edit keeps them consistent with the new
 * track duration.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scene::Scene;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
    #[serde(other)]
    Other,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A timed subtitle entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub text: String,
}

impl SubtitleCue {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }
}

/// How a track was brought to the base duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignStrategy {
    Shift,
    Stretch,
    Rescale,
    Crop,
    Pad,
}

/// Time removed or added at each end of a track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditSpan {
    pub start: f64,
    pub end: f64,
}

impl EditSpan {
    /// Split `amount` across both ends, or put it all at the end
    pub fn split(amount: f64, symmetric: bool) -> Self {
        if symmetric {
            Self {
                start: amount / 2.0,
                end: amount / 2.0,
            }
        } else {
            Self {
                start: 0.0,
                end: amount,
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.start + self.end
    }
}

/// Record of the alignment applied to a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub original_duration: f64,
    pub target_duration: f64,
    pub strategy: AlignStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<EditSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad: Option<EditSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_frame_rate: Option<f64>,
}

impl AlignmentRecord {
    pub fn new(original_duration: f64, target_duration: f64, strategy: AlignStrategy) -> Self {
        Self {
            original_duration,
            target_duration,
            strategy,
            stretch_ratio: None,
            time_shift: None,
            crop: None,
            pad: None,
            original_frame_rate: None,
        }
    }
}

/// A single media track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,

    #[serde(rename = "type")]
    pub track_type: TrackType,

    pub duration: f64,

    /// Offset of the track on the shared timeline
    #[serde(default)]
    pub start_time: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<Scene>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cues: Option<Vec<SubtitleCue>>,

    #[serde(default)]
    pub is_base: bool,

    #[serde(default)]
    pub is_main: bool,

    /// Split crop and pad evenly across both ends; otherwise edit the end only
    #[serde(default = "default_true")]
    pub symmetric_edits: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentRecord>,
}

impl Track {
    pub fn new(id: impl Into<String>, track_type: TrackType, duration: f64) -> Self {
        Self {
            id: id.into(),
            track_type,
            duration,
            start_time: 0.0,
            scenes: None,
            keyframes: Vec::new(),
            frame_rate: None,
            cues: None,
            is_base: false,
            is_main: false,
            symmetric_edits: true,
            alignment: None,
        }
    }

    pub fn base(mut self) -> Self {
        self.is_base = true;
        self
    }

    pub fn main(mut self) -> Self {
        self.is_main = true;
        self
    }

    pub fn with_scenes(mut self, scenes: Vec<Scene>) -> Self {
        self.scenes = Some(scenes);
        self
    }

    pub fn with_keyframes(mut self, keyframes: Vec<f64>) -> Self {
        self.keyframes = keyframes;
        self
    }

    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn with_cues(mut self, cues: Vec<SubtitleCue>) -> Self {
        self.cues = Some(cues);
        self
    }

    pub fn end_edits_only(mut self) -> Self {
        self.symmetric_edits = false;
        self
    }

    /// Scale every timestamp by `ratio`; frame rate moves inversely
    pub(crate) fn stretch(&mut self, ratio: f64) {
        self.duration *= ratio;
        if let Some(scenes) = self.scenes.as_mut() {
            for scene in scenes.iter_mut() {
                scene.scale(ratio);
            }
        }
        for keyframe in self.keyframes.iter_mut() {
            *keyframe *= ratio;
        }
        self.rescale_cues(ratio);
        if let Some(fps) = self.frame_rate.as_mut() {
            *fps /= ratio;
        }
    }

    /// Scale only the subtitle cues
    pub(crate) fn rescale_cues(&mut self, ratio: f64) {
        if let Some(cues) = self.cues.as_mut() {
            for cue in cues.iter_mut() {
                cue.start_time *= ratio;
                cue.end_time *= ratio;
            }
        }
    }

    /// Move the track and all of its content by `offset` seconds
    pub(crate) fn shift(&mut self, offset: f64) {
        self.start_time += offset;
        self.offset_content(offset);
    }

    fn offset_content(&mut self, offset: f64) {
        if let Some(scenes) = self.scenes.as_mut() {
            for scene in scenes.iter_mut() {
                scene.shift(offset);
            }
        }
        for keyframe in self.keyframes.iter_mut() {
            *keyframe += offset;
        }
        if let Some(cues) = self.cues.as_mut() {
            for cue in cues.iter_mut() {
                cue.start_time += offset;
                cue.end_time += offset;
            }
        }
    }

    /// Trim to `target`, dropping content that falls entirely in a removed
    /// interval and clipping content that straddles a cut
    pub(crate) fn crop(&mut self, target: f64) -> EditSpan {
        let span = EditSpan::split(self.duration - target, self.symmetric_edits);
        let keep_from = span.start;
        let keep_to = self.duration - span.end;

        if let Some(scenes) = self.scenes.take() {
            let kept = scenes
                .into_iter()
                .filter(|s| s.end_time > keep_from && s.start_time < keep_to)
                .map(|mut s| {
                    let start = s.start_time.max(keep_from) - keep_from;
                    let end = s.end_time.min(keep_to) - keep_from;
                    s.start_time = start;
                    s.set_end(end);
                    s
                })
                .collect();
            self.scenes = Some(kept);
        }

        self.keyframes = self
            .keyframes
            .iter()
            .filter(|k| **k >= keep_from && **k <= keep_to)
            .map(|k| k - keep_from)
            .collect();

        if let Some(cues) = self.cues.take() {
            let kept = cues
                .into_iter()
                .filter(|c| c.end_time > keep_from && c.start_time < keep_to)
                .map(|mut c| {
                    c.start_time = c.start_time.max(keep_from) - keep_from;
                    c.end_time = c.end_time.min(keep_to) - keep_from;
                    c
                })
                .collect();
            self.cues = Some(kept);
        }

        self.duration = target;
        span
    }

    /// Extend to `target` with silence, moving content past the leading pad
    pub(crate) fn pad(&mut self, target: f64) -> EditSpan {
        let span = EditSpan::split(target - self.duration, self.symmetric_edits);
        if span.start != 0.0 {
            self.offset_content(span.start);
        }
        self.duration = target;
        span
    }
}

fn default_true() -> bool {
    true
}
