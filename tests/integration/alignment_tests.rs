/*!
 * Integration tests for multi-track alignment
 */

use std::collections::BTreeMap;
use scenefit::alignment::{
    AlignStrategy, AlignmentConfig, MultiTrackAligner, SubtitleCue, Track, TrackType, align_list,
    align_pair,
};
use scenefit::errors::AlignmentError;
use scenefit::scene::Scene;
use crate::common;

fn keyed(tracks: Vec<Track>) -> BTreeMap<String, Track> {
    tracks.into_iter().map(|t| (t.id.clone(), t)).collect()
}

/// 80s video and 75s audio end up within the threshold of each other
#[test]
fn test_align_videoAndAudio_shouldRoundTripWithinThreshold() {
    common::init_logging();
    let aligner = MultiTrackAligner::with_defaults();
    let tracks = keyed(vec![
        Track::new("video", TrackType::Video, 80.0),
        Track::new("audio", TrackType::Audio, 75.0),
    ]);
    let aligned = aligner.align(&tracks).unwrap();

    let video = &aligned["video"];
    let audio = &aligned["audio"];
    assert!((video.duration - audio.duration).abs() <= aligner.config().alignment_threshold);
    assert!(video.alignment.is_none());

    let record = audio.alignment.as_ref().unwrap();
    assert_eq!(record.original_duration, 75.0);
    assert_eq!(record.target_duration, audio.duration);
    match record.strategy {
        AlignStrategy::Shift => {
            let shift = record.time_shift.unwrap();
            assert!((shift - (audio.duration - record.original_duration) / 2.0).abs() < 1e-9);
            assert_eq!(audio.start_time, shift);
        }
        AlignStrategy::Stretch => {
            let ratio = record.stretch_ratio.unwrap();
            assert!((ratio - audio.duration / record.original_duration).abs() < 1e-9);
        }
        other => panic!("unexpected strategy {:?}", other),
    }
}

/// Audio drift beyond the shift budget is stretched instead
#[test]
fn test_align_audioWithLargeDrift_shouldStretch() {
    let aligner = MultiTrackAligner::new(AlignmentConfig {
        max_shift_ms: 1000.0,
        ..AlignmentConfig::default()
    });
    let tracks = keyed(vec![
        Track::new("video", TrackType::Video, 80.0),
        Track::new("audio", TrackType::Audio, 75.0).with_keyframes(vec![0.0, 30.0, 75.0]),
    ]);
    let aligned = aligner.align(&tracks).unwrap();
    let audio = &aligned["audio"];
    let record = audio.alignment.as_ref().unwrap();

    assert_eq!(record.strategy, AlignStrategy::Stretch);
    assert!((record.stretch_ratio.unwrap() - 80.0 / 75.0).abs() < 1e-12);
    assert_eq!(audio.duration, 80.0);
    assert!((audio.keyframes[2] - 80.0).abs() < 1e-9);
}

/// Video far outside the stretch window is cropped and its scenes clipped
#[test]
fn test_align_videoFarTooLong_shouldCropAndClipScenes() {
    let scenes = vec![
        Scene::new("head", 0.0, 10.0),
        Scene::new("body", 10.0, 90.0),
        Scene::new("tail", 95.0, 100.0),
    ];
    let tracks = keyed(vec![
        Track::new("master", TrackType::Audio, 40.0).base(),
        Track::new("cam", TrackType::Video, 100.0).with_scenes(scenes),
    ]);
    let aligned = MultiTrackAligner::with_defaults().align(&tracks).unwrap();
    let cam = &aligned["cam"];
    let record = cam.alignment.as_ref().unwrap();

    assert_eq!(record.strategy, AlignStrategy::Crop);
    let crop = record.crop.unwrap();
    assert_eq!((crop.start, crop.end), (30.0, 30.0));
    assert_eq!(cam.duration, 40.0);

    let kept = cam.scenes.as_ref().unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, "body");
    assert_eq!((kept[0].start_time, kept[0].end_time), (0.0, 40.0));
}

/// Short video is padded at the end only when edits are end-only
#[test]
fn test_align_shortVideoEndEdits_shouldPadEnd() {
    let tracks = keyed(vec![
        Track::new("master", TrackType::Audio, 100.0).base(),
        Track::new("cam", TrackType::Video, 40.0)
            .with_scenes(vec![Scene::new("only", 0.0, 40.0)])
            .end_edits_only(),
    ]);
    let aligned = MultiTrackAligner::with_defaults().align(&tracks).unwrap();
    let cam = &aligned["cam"];
    let pad = cam.alignment.as_ref().unwrap().pad.unwrap();

    assert_eq!((pad.start, pad.end), (0.0, 60.0));
    assert_eq!(cam.scenes.as_ref().unwrap()[0].start_time, 0.0);
    assert_eq!(cam.duration, 100.0);
}

/// Subtitle cues follow the duration ratio
#[test]
fn test_align_subtitles_shouldRescaleCues() {
    let tracks = keyed(vec![
        Track::new("video", TrackType::Video, 120.0).main(),
        Track::new("subs", TrackType::Subtitle, 60.0)
            .with_cues(vec![SubtitleCue::new(10.0, 12.0, "hello")]),
    ]);
    let aligned = MultiTrackAligner::with_defaults().align(&tracks).unwrap();
    let subs = &aligned["subs"];

    assert_eq!(subs.alignment.as_ref().unwrap().strategy, AlignStrategy::Rescale);
    let cue = &subs.cues.as_ref().unwrap()[0];
    assert_eq!((cue.start_time, cue.end_time), (20.0, 24.0));
    assert_eq!(cue.text, "hello");
}

/// Zero-length tracks are rejected before anything is modified
#[test]
fn test_align_withZeroDuration_shouldFail() {
    let tracks = keyed(vec![
        Track::new("video", TrackType::Video, 10.0),
        Track::new("broken", TrackType::Audio, 0.0),
    ]);
    let err = MultiTrackAligner::with_defaults().align(&tracks).unwrap_err();
    assert_eq!(
        err,
        AlignmentError::InvalidDuration {
            track_id: "broken".to_string(),
            duration: 0.0
        }
    );
}

/// The pair and list helpers agree with the keyed aligner
#[test]
fn test_alignHelpers_shouldAlignToVideo() {
    let audio = Track::new("a", TrackType::Audio, 58.0);
    let video = Track::new("v", TrackType::Video, 60.0);

    let (aligned_audio, aligned_video) = align_pair(&audio, &video).unwrap();
    assert_eq!(aligned_video.duration, 60.0);
    assert_eq!(aligned_audio.duration, 60.0);

    let list = align_list(&[audio, video]).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].track_type, TrackType::Audio);
    assert_eq!(list[0].duration, 60.0);
}

/// Tracks deserialize from JSON with the `type` field
#[test]
fn test_track_deserialize_withUnknownType_shouldBeOther() {
    let track: Track =
        serde_json::from_str(r#"{"id": "data", "type": "telemetry", "duration": 12.5}"#).unwrap();
    assert_eq!(track.track_type, TrackType::Other);
    assert!(track.symmetric_edits);
    assert!(!track.is_base);
}
