/*!
 * Tests for the scene model and protection policy
 */

use scenefit::protection::ScenePolicy;
use scenefit::scene::{
    CompressionInfo, ImportanceLevel, ProtectionInfo, ProtectionLevel, ProtectionStrategy, Scene,
    SceneKind, TransitionType, strip_scratch, total_duration,
};

#[test]
fn test_scene_setters_shouldKeepTimingConsistent() {
    let mut scene = Scene::new("a", 2.0, 6.0);

    scene.set_duration(3.0);
    assert_eq!((scene.start_time, scene.end_time), (2.0, 5.0));

    scene.set_start(1.0);
    assert_eq!(scene.duration, 4.0);

    scene.set_end(4.5);
    assert_eq!(scene.duration, 3.5);

    scene.shift(0.5);
    assert_eq!((scene.start_time, scene.end_time, scene.duration), (1.5, 5.0, 3.5));

    scene.scale(2.0);
    assert_eq!((scene.start_time, scene.end_time, scene.duration), (3.0, 10.0, 7.0));
}

#[test]
fn test_scene_deserialize_withMinimalRecord_shouldFillDefaults() {
    let scene: Scene = serde_json::from_str(
        r#"{"id": "x", "start_time": 0.0, "end_time": 2.0, "duration": 2.0}"#,
    )
    .unwrap();

    assert_eq!(scene.importance, 0.5);
    assert!(scene.tags.is_empty());
    assert_eq!(scene.kind, SceneKind::Content);
    assert_eq!(scene.compression_rate, 0.0);
    assert!(scene.protection.is_none());
}

#[test]
fn test_scene_serialize_shouldUseUpperCaseProtection() {
    let scene = Scene::new("x", 0.0, 1.0).protected(
        ProtectionInfo::new(ProtectionLevel::Critical).with_strategy(ProtectionStrategy::NoTrim),
    );
    let json = serde_json::to_value(&scene).unwrap();
    assert_eq!(json["protection"]["level"], "CRITICAL");
    assert_eq!(json["protection"]["strategies"][0], "NO_TRIM");
    assert!(json.get("adjustment").is_none());
}

#[test]
fn test_stripScratch_shouldRemovePipelineFields() {
    let mut scene = Scene::new("x", 0.0, 4.0);
    scene.original_duration = Some(5.0);
    scene.importance_level = Some(ImportanceLevel::Low);

    let stripped = strip_scratch(vec![scene]);
    assert!(stripped[0].original_duration.is_none());
    assert!(stripped[0].importance_level.is_none());
    assert_eq!(stripped[0].baseline_duration(), 4.0);
}

#[test]
fn test_totalDuration_shouldSumDurations() {
    let scenes = vec![Scene::new("a", 0.0, 2.5), Scene::new("b", 3.0, 4.0)];
    assert_eq!(total_duration(&scenes), 3.5);
    assert_eq!(total_duration(&[]), 0.0);
}

#[test]
fn test_transitionType_baseDurations_shouldMatchStyle() {
    assert_eq!(TransitionType::Dynamic.base_duration(), 0.030);
    assert_eq!(TransitionType::Slide.base_duration(), 0.080);
    assert_eq!(TransitionType::Fade.base_duration(), 0.100);
    assert_eq!(TransitionType::Crossfade.base_duration(), 0.050);
}

#[test]
fn test_policy_withRespectProtectionOff_shouldIgnoreDeclaredLevels() {
    let policy = ScenePolicy {
        respect_protection: false,
        ..ScenePolicy::default()
    };
    let declared = Scene::new("a", 0.0, 5.0).protected(ProtectionInfo::new(ProtectionLevel::High));
    let locked = Scene::new("b", 0.0, 5.0)
        .protected(ProtectionInfo::new(ProtectionLevel::None).with_strategy(ProtectionStrategy::Lock));
    let tagged = Scene::new("c", 0.0, 5.0).tag("ending");

    assert!(!policy.is_gap_protected(&declared));
    assert!(!policy.is_compression_protected(&declared));
    assert!(policy.is_gap_protected(&locked));
    assert!(policy.is_compression_protected(&locked));
    assert_eq!(policy.effective_level(&tagged), ProtectionLevel::Critical);
}

#[test]
fn test_policy_floorFor_shouldRespectAllowedRatioAndNeverGrow() {
    let policy = ScenePolicy::default();

    let limited = Scene::new("a", 0.0, 10.0).compression(CompressionInfo {
        allowed_ratio: 0.6,
        ..CompressionInfo::default()
    });
    assert!((policy.floor_for(&limited) - 6.0).abs() < 1e-9);

    let short = Scene::new("b", 0.0, 0.4);
    assert_eq!(policy.floor_for(&short), 0.4);

    let plain = Scene::new("c", 0.0, 10.0);
    assert_eq!(policy.floor_for(&plain), 1.0);
}

#[test]
fn test_policy_importanceLevel_withNoCompressFlag_shouldBeCritical() {
    let policy = ScenePolicy::default();
    let scene = Scene::new("a", 0.0, 5.0).importance(0.1).compression(CompressionInfo {
        no_compress: true,
        ..CompressionInfo::default()
    });
    assert_eq!(policy.importance_level(&scene), ImportanceLevel::Critical);
    assert!(policy.is_compression_protected(&scene));
    assert!(!policy.is_gap_protected(&scene));
}
