/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use scenefit::app_config::{Config, LogLevel};
use std::path::PathBuf;
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.gap.min_gap_threshold, 1.0);
    assert_eq!(config.gap.max_gap_threshold, 50.0);
    assert_eq!(config.margin.margin_ratio, 0.05);
    assert_eq!(config.rescue.max_iterations, 5);
    assert_eq!(config.rescue.soft_upgrade_critical_share, 0.5);
    assert_eq!(config.rescue.moderate_upgrade_critical_share, 0.7);
    assert_eq!(config.alignment.alignment_threshold, 1.0);
    assert_eq!(config.policy.min_scene_duration, 1.0);
    assert!(config.policy.protected_tags.contains("opening"));
    assert_eq!(config.schema.start_key, "start_time");
    assert_eq!(config.archive.root_dir, None);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.margin.min_margin = 0.2;
    config.margin.max_margin = 0.1;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.rescue.max_iterations = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.rescue.soft_overflow_limit = 0.3;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.alignment.max_stretch_ratio = 1.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.transition.min_transition_duration = 0.0;
    assert!(config.validate().is_err());
}

/// Test that a saved config loads back identically
#[test]
fn test_config_saveAndLoad_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("scenefit.json");

    let mut config = Config::default();
    config.gap.max_gap_threshold = 40.0;
    config.policy.protected_tags.insert("finale".to_string());
    config.archive.root_dir = Some(PathBuf::from("/tmp/scenefit-archive"));
    config.log_level = LogLevel::Trace;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded, config);
    Ok(())
}

/// Test that an invalid JSON file is reported with its path
#[test]
fn test_config_fromFile_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
    Ok(())
}

/// Test that the archive root falls back to the user data directory
#[test]
fn test_archive_resolveRoot_shouldPreferConfiguredDir() -> Result<()> {
    let mut config = Config::default();
    config.archive.root_dir = Some(PathBuf::from("custom-root"));
    assert_eq!(config.archive.resolve_root()?, PathBuf::from("custom-root"));
    Ok(())
}

/// Test the log level mapping used by the binary
#[test]
fn test_logLevel_toLevelFilter_shouldMapEveryLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Info.to_level_filter(), log::LevelFilter::Info);
    assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}

/// Test that the pipeline built from a config honours its settings
#[test]
fn test_config_pipeline_shouldUseConfiguredMargin() {
    let mut config = Config::default();
    config.margin.margin_ratio = 0.1;
    let pipeline = config.pipeline();
    assert!((pipeline.margin_keeper().apply_margin(100.0) - 90.0).abs() < 1e-9);
}
