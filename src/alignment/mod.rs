/*!
 * Multi-track time alignment: the track model and the aligner.
 */

pub mod aligner;
pub mod track;

pub use aligner::{AlignmentConfig, MultiTrackAligner, align_list, align_pair};
pub use track::{AlignStrategy, AlignmentRecord, EditSpan, SubtitleCue, Track, TrackType};
