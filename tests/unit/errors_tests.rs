/*!
 * Tests for error types and conversions
 */

use scenefit::errors::{
    AlignmentError, AnalysisError, AppError, ArchiveError, OverflowError, SchemaError,
};

#[test]
fn test_overflowError_criticalOverflow_shouldDisplayNumbers() {
    let error = OverflowError::CriticalOverflow {
        current: 112.5,
        target: 100.0,
        deficit: 12.5,
    };
    let display = format!("{}", error);
    assert!(display.contains("Critical overflow"));
    assert!(display.contains("112.500"));
    assert!(display.contains("100.000"));
    assert!(display.contains("12.500"));
}

#[test]
fn test_archiveError_variants_shouldDisplayVersionId() {
    let error = ArchiveError::VersionNotFound {
        version_id: "0123456789ab".to_string(),
    };
    assert!(format!("{}", error).contains("0123456789ab"));

    let error = ArchiveError::CannotDeleteLastVersion {
        version_id: "ba9876543210".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("last remaining version"));
    assert!(display.contains("ba9876543210"));
}

#[test]
fn test_archiveError_fromSerdeError_shouldBeSerialization() {
    let serde_error = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
    let error: ArchiveError = serde_error.into();
    assert!(matches!(error, ArchiveError::Serialization(_)));
}

#[test]
fn test_archiveError_fromIoError_shouldBeStorage() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: ArchiveError = io_error.into();
    match error {
        ArchiveError::Storage(msg) => assert!(msg.contains("read-only")),
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[test]
fn test_analysisError_measurementUnavailable_shouldNameAsset() {
    let error = AnalysisError::MeasurementUnavailable {
        asset: "intro.mp4".to_string(),
    };
    assert!(format!("{}", error).contains("intro.mp4"));
}

#[test]
fn test_appError_fromAreaErrors_shouldWrapCorrectly() {
    let error: AppError = OverflowError::InvalidTarget(-1.0).into();
    assert!(matches!(error, AppError::Overflow(OverflowError::InvalidTarget(_))));
    assert!(format!("{}", error).starts_with("Overflow error"));

    let error: AppError = AlignmentError::InvalidDuration {
        track_id: "a1".to_string(),
        duration: 0.0,
    }
    .into();
    assert!(format!("{}", error).contains("a1"));

    let error: AppError = SchemaError::NotAList.into();
    assert!(matches!(error, AppError::Schema(SchemaError::NotAList)));

    let error: AppError = ArchiveError::Storage("disk full".to_string()).into();
    assert!(format!("{}", error).contains("disk full"));
}

#[test]
fn test_appError_fromAnyhowAndIo_shouldConvert() {
    let error: AppError = anyhow::anyhow!("something odd").into();
    assert!(matches!(error, AppError::Unknown(ref msg) if msg == "something odd"));

    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: AppError = io_error.into();
    assert!(matches!(error, AppError::File(_)));
}
