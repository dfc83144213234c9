/*!
 * Integration tests for the reconciliation stages and the full pipeline
 */

use rand::Rng;
use scenefit::errors::OverflowError;
use scenefit::protection::ScenePolicy;
use scenefit::scene::{ImportanceLevel, ProtectionInfo, ProtectionLevel, ProtectionStrategy, Scene};
use scenefit::scene::total_duration;
use scenefit::timeline::{
    GapEraser, OverflowRescuer, ReconcilePipeline, RescueState, SafetyMarginKeeper,
    TransitionInserter,
};
use crate::common;

fn compression_ratio(scene: &Scene) -> f64 {
    scene
        .adjustment
        .as_ref()
        .map(|a| a.compression_ratio)
        .unwrap_or(1.0)
}

/// Five scenes totalling 130s with an opening and a climax
fn festival_cut() -> Vec<Scene> {
    let mut scenes = common::sequential(&[
        (20.0, 0.95),
        (30.0, 0.9),
        (25.0, 0.5),
        (40.0, 0.5),
        (15.0, 0.5),
    ]);
    scenes[0] = scenes[0].clone().tag("opening");
    scenes[1] = scenes[1].clone().tag("climax");
    scenes
}

/// Test the 35ms / 80ms gap scenario
#[test]
fn test_gapEraser_withSmallAndLargeGap_shouldCloseOnlySmall() {
    common::init_logging();
    let scenes = vec![
        Scene::new("s1", 0.0, 10.0),
        Scene::new("s2", 10.035, 20.0),
        Scene::new("s3", 20.08, 30.0),
    ];
    let result = GapEraser::with_defaults().erase(&scenes);

    assert_eq!(result.gaps_erased, 1);
    assert_eq!(result.scenes[0].end_time, result.scenes[1].start_time);
    assert!((GapEraser::gap_ms(&result.scenes[1], &result.scenes[2]) - 80.0).abs() < 1e-6);
    assert_eq!(result.scenes[2], scenes[2]);
}

/// No erasable gap survives unless both neighbours are protected
#[test]
fn test_gapEraser_withRandomTimelines_shouldLeaveNoErasableGap() {
    common::init_logging();
    let eraser = GapEraser::with_defaults();
    let policy = ScenePolicy::default();
    let mut rng = common::seeded_rng(7);

    for _ in 0..200 {
        let count = rng.random_range(2..25);
        let scenes = common::random_scenes(&mut rng, count);
        let result = eraser.erase(&scenes);

        assert_eq!(result.scenes.len(), scenes.len());
        for pair in result.scenes.windows(2) {
            let gap = GapEraser::gap_ms(&pair[0], &pair[1]);
            let both_protected =
                policy.is_gap_protected(&pair[0]) && policy.is_gap_protected(&pair[1]);
            assert!(
                !eraser.is_erasable(gap) || both_protected,
                "gap of {:.3}ms left between {} and {}",
                gap,
                pair[0].id,
                pair[1].id
            );
        }
    }
}

/// Protected scenes keep bit-identical durations through the margin stage
#[test]
fn test_safetyMargin_withRandomTimelines_shouldConserveProtectedDuration() {
    let keeper = SafetyMarginKeeper::with_defaults();
    let policy = ScenePolicy::default();
    let mut rng = common::seeded_rng(11);

    for _ in 0..200 {
        let count = rng.random_range(1..20);
        let scenes = common::random_scenes(&mut rng, count);
        let total = total_duration(&scenes);
        let target = total * rng.random_range(0.5..1.2);

        let protected_sum = |list: &[Scene]| -> f64 {
            list.iter()
                .filter(|s| policy.is_compression_protected(s))
                .map(|s| s.duration)
                .sum()
        };
        let adjusted = keeper.adjust(&scenes, target);

        assert_eq!(
            protected_sum(&scenes).to_bits(),
            protected_sum(&adjusted.scenes).to_bits()
        );
        assert!(total_duration(&adjusted.scenes) <= total + 1e-9);
    }
}

/// Rescue always succeeds while every scene's minimum fits in the target
#[test]
fn test_overflowRescuer_withFeasibleTargets_shouldAlwaysTerminate() {
    common::init_logging();
    let rescuer = OverflowRescuer::with_defaults();
    let min_scene = ScenePolicy::default().min_scene_duration;
    let mut rng = common::seeded_rng(2024);

    for round in 0..300 {
        let count = rng.random_range(1..30);
        let scenes = common::random_scenes(&mut rng, count);
        let total = total_duration(&scenes);
        let floor_total = count as f64 * min_scene;
        if floor_total >= total {
            continue;
        }
        let target = rng.random_range(floor_total..total);

        let outcome = rescuer
            .handle(&scenes, target)
            .unwrap_or_else(|e| panic!("round {}: {}", round, e));
        assert!(
            outcome.report.final_duration <= target + rescuer.tolerance(target) + 1e-9,
            "round {}: {:.3} over {:.3}",
            round,
            outcome.report.final_duration,
            target
        );
        assert!(outcome.report.iterations <= rescuer.config().max_iterations);
        assert_eq!(outcome.scenes.len(), scenes.len());
    }
}

/// 130s down to 100s keeps the opening and climax least compressed
#[test]
fn test_overflowRescuer_festivalCut_shouldFavourCriticalScenes() {
    common::init_logging();
    let rescuer = OverflowRescuer::with_defaults();
    let scenes = festival_cut();
    assert_eq!(total_duration(&scenes), 130.0);

    let outcome = rescuer.handle(&scenes, 100.0).unwrap();
    assert!(total_duration(&outcome.scenes) <= 100.0 + rescuer.tolerance(100.0));
    assert_eq!(outcome.report.initial_mode, Some(RescueState::Aggressive));
    assert_eq!(outcome.report.final_state, Some(RescueState::LastResort));

    let critical_min = outcome.scenes[..2]
        .iter()
        .map(compression_ratio)
        .fold(f64::INFINITY, f64::min);
    let other_max = outcome.scenes[2..]
        .iter()
        .map(compression_ratio)
        .fold(0.0, f64::max);
    assert!(critical_min > other_max);
    assert!((compression_ratio(&outcome.scenes[0]) - 0.9).abs() < 1e-9);
    assert_eq!(
        outcome.scenes[1].importance_level,
        Some(ImportanceLevel::Critical)
    );
    assert_eq!(outcome.scenes[2].adjustment.as_ref().unwrap().mode, "last_resort");
}

/// Critical scenes that cannot fit even at the last-resort ratio shrink together
#[test]
fn test_overflowRescuer_criticalOnly_shouldShrinkProportionally() {
    let scenes = common::sequential(&[(50.0, 0.95), (50.0, 0.95)]);
    let outcome = OverflowRescuer::with_defaults().handle(&scenes, 60.0).unwrap();

    assert!((outcome.scenes[0].duration - outcome.scenes[1].duration).abs() < 1e-9);
    assert!(total_duration(&outcome.scenes) <= 60.6);
}

/// Locked scenes that alone exceed the target cannot be rescued
#[test]
fn test_overflowRescuer_lockedOverTarget_shouldReportDeficit() {
    let lock = ProtectionInfo::new(ProtectionLevel::None).with_strategy(ProtectionStrategy::Lock);
    let scenes = vec![
        Scene::new("a", 0.0, 40.0).protected(lock.clone()),
        Scene::new("b", 40.0, 80.0).protected(lock),
    ];
    let err = OverflowRescuer::with_defaults().handle(&scenes, 50.0).unwrap_err();
    match err {
        OverflowError::CriticalOverflow { current, deficit, .. } => {
            assert_eq!(current, 80.0);
            assert_eq!(deficit, 30.0);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Transitions are carved out of their neighbours, so the total is unchanged
#[test]
fn test_transitionInserter_shouldPreserveTotalDuration() {
    let scenes: Vec<Scene> = common::sequential(&[(10.0, 0.5), (10.0, 0.5), (10.0, 0.5)])
        .into_iter()
        .map(|s| s.compression_rate(0.8))
        .collect();
    let result = TransitionInserter::with_defaults().insert(&scenes);

    assert_eq!(result.inserted, 2);
    assert_eq!(result.scenes.len(), 5);
    assert!(result.scenes[1].is_transition());
    assert!((total_duration(&result.scenes) - 30.0).abs() < 1e-9);
    assert_eq!(result.scenes[0].end_time, result.scenes[1].start_time);
    assert_eq!(result.scenes[1].end_time, result.scenes[2].start_time);
}

/// A gap the eraser leaves alone must not be swallowed by the transition
#[test]
fn test_pipeline_withUnerasedGap_shouldKeepTransitionShort() {
    let scenes = vec![
        Scene::new("a", 0.0, 40.0).compression_rate(0.6),
        Scene::new("b", 45.0, 85.0).compression_rate(0.6),
    ];
    let outcome = ReconcilePipeline::with_defaults()
        .reconcile(&scenes, 100.0)
        .unwrap();

    assert_eq!(outcome.report.transitions.inserted, 1);
    let transition = outcome
        .scenes
        .iter()
        .find(|s| s.is_transition())
        .expect("transition should be inserted");
    assert!(transition.duration <= 0.5 + 1e-12);
    assert!(outcome.report.final_duration <= outcome.report.input_duration + 1e-9);
    assert!((outcome.report.input_duration - 80.0).abs() < 1e-9);
}

/// The full pipeline meets the target through the margin stage alone
#[test]
fn test_pipeline_festivalCut_shouldProtectCriticalScenes() {
    common::init_logging();
    let scenes = festival_cut();
    let outcome = ReconcilePipeline::with_defaults()
        .reconcile(&scenes, 100.0)
        .unwrap();

    assert!(outcome.report.rescue.is_none());
    assert!(outcome.report.final_duration <= 95.0 + 1e-9);
    assert_eq!(outcome.scenes[0].duration, 20.0);
    assert_eq!(outcome.scenes[1].duration, 30.0);
    assert_eq!(outcome.report.margin.protected_count, 2);
    assert_eq!(outcome.report.margin.adjusted_count, 3);
}

/// A timeline with only critical scenes falls through to the rescuer
#[test]
fn test_pipeline_allCritical_shouldRunRescue() {
    let scenes = common::sequential(&[(40.0, 0.95), (40.0, 0.95), (40.0, 0.95)]);
    let outcome = ReconcilePipeline::with_defaults()
        .reconcile(&scenes, 100.0)
        .unwrap();

    let rescue = outcome.report.rescue.expect("rescue should have run");
    assert_eq!(rescue.critical_share, 1.0);
    assert!(outcome.report.final_duration <= 101.0);
    assert_eq!(
        outcome.report.margin.reason.as_deref(),
        Some("no compressible scenes")
    );
}
