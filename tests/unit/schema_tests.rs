/*!
 * Tests for the scene record schema adapter
 */

use serde_json::json;
use scenefit::errors::SchemaError;
use scenefit::scene::{ProtectionLevel, SceneKind};
use scenefit::schema::SceneSchema;
use scenefit::timeline::ReconcilePipeline;

#[test]
fn test_toScenes_withPassthroughFields_shouldKeepProtection() {
    let records = json!([
        {
            "id": "intro",
            "start_time": 0.0,
            "end_time": 5.0,
            "tags": "opening",
            "protection": {"level": "HIGH", "strategies": ["NO_TRIM"]},
            "compression_rate": 0.4
        }
    ]);
    let scenes = SceneSchema::default().to_scenes(&records).unwrap();

    assert_eq!(scenes[0].declared_level(), ProtectionLevel::High);
    assert!(scenes[0].tags.contains("opening"));
    assert_eq!(scenes[0].compression_rate, 0.4);
    assert_eq!(scenes[0].duration, 5.0);
}

#[test]
fn test_toScenes_withNumericIdAndClampedImportance_shouldNormalize() {
    let records = json!([{"id": 7, "start_time": 1.0, "duration": 2.0, "importance": 3.5}]);
    let scenes = SceneSchema::default().to_scenes(&records).unwrap();

    assert_eq!(scenes[0].id, "7");
    assert_eq!(scenes[0].end_time, 3.0);
    assert_eq!(scenes[0].importance, 1.0);
}

#[test]
fn test_toScenes_withReversedTiming_shouldFail() {
    let records = json!([{"id": "a", "start_time": 5.0, "end_time": 4.0}]);
    let err = SceneSchema::default().to_scenes(&records).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidField { index: 0, .. }));
}

#[test]
fn test_toScenes_withNonObjectRecord_shouldReportIndex() {
    let records = json!([{"id": "a", "start_time": 0.0, "end_time": 1.0}, 42]);
    let err = SceneSchema::default().to_scenes(&records).unwrap_err();
    assert_eq!(err, SchemaError::NotAnObject { index: 1 });
}

#[test]
fn test_toRecords_afterReconcile_shouldWriteTransitionsAndKeepExtras() {
    let records = json!([
        {"id": "a", "start_time": 0.0, "end_time": 10.0, "compression_rate": 0.9, "camera": "A"},
        {"id": "b", "start_time": 10.0, "end_time": 20.0, "compression_rate": 0.9, "camera": "B"}
    ]);
    let schema = SceneSchema::default();
    let scenes = schema.to_scenes(&records).unwrap();
    let outcome = ReconcilePipeline::with_defaults()
        .reconcile(&scenes, 100.0)
        .unwrap();

    let out = schema.to_records(&outcome.scenes, &records);
    let list = out.as_array().unwrap();
    assert_eq!(list.len(), outcome.scenes.len());
    assert_eq!(list[0]["camera"], "A");
    assert_eq!(list[list.len() - 1]["camera"], "B");

    if outcome.report.transitions.inserted > 0 {
        assert_eq!(outcome.scenes[1].kind, SceneKind::Transition);
        assert_eq!(list[1]["kind"], "transition");
        assert!(list[1].get("camera").is_none());
    }
}
