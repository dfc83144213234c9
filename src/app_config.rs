use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::alignment::AlignmentConfig;
use crate::analysis::AnalyzerConfig;
use crate::archive::default_archive_root;
use crate::file_utils::FileManager;
use crate::protection::ScenePolicy;
use crate::schema::SceneSchema;
use crate::timeline::{
    GapEraserConfig, OverflowConfig, ReconcilePipeline, SafetyMarginConfig, TransitionConfig,
};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Protection and sizing rules shared by every stage
    #[serde(default)]
    pub policy: ScenePolicy,

    /// Gap eraser settings
    #[serde(default)]
    pub gap: GapEraserConfig,

    /// Transition inserter settings
    #[serde(default)]
    pub transition: TransitionConfig,

    /// Safety margin settings
    #[serde(default)]
    pub margin: SafetyMarginConfig,

    /// Overflow rescue settings
    #[serde(default)]
    pub rescue: OverflowConfig,

    /// Multi-track alignment settings
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Duration analyzer settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Field names of caller scene records
    #[serde(default)]
    pub schema: SceneSchema,

    /// Archive settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where timeline archives are stored
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ArchiveConfig {
    /// Archive root; the user data directory when unset
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
}

impl ArchiveConfig {
    /// Configured root, falling back to the user data directory
    pub fn resolve_root(&self) -> Result<PathBuf> {
        self.root_dir
            .clone()
            .or_else(default_archive_root)
            .ok_or_else(|| anyhow!("Could not determine archive directory"))
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(anyhow!("{} must be positive, got {}", name, value));
    }
    Ok(())
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Policy thresholds
        let policy = &self.policy;
        check_unit("policy.critical_importance", policy.critical_importance)?;
        check_unit("policy.high_importance", policy.high_importance)?;
        check_unit("policy.medium_importance", policy.medium_importance)?;
        if !(policy.medium_importance <= policy.high_importance
            && policy.high_importance <= policy.critical_importance)
        {
            return Err(anyhow!(
                "Importance thresholds must be ordered medium <= high <= critical"
            ));
        }
        if policy.min_scene_duration < 0.0 {
            return Err(anyhow!("policy.min_scene_duration must not be negative"));
        }

        // Gap window
        if self.gap.min_gap_threshold < 0.0 || self.gap.min_gap_threshold > self.gap.max_gap_threshold
        {
            return Err(anyhow!(
                "gap.min_gap_threshold ({}) must be between 0 and gap.max_gap_threshold ({})",
                self.gap.min_gap_threshold,
                self.gap.max_gap_threshold
            ));
        }

        // Transitions
        check_positive("transition.min_transition_duration", self.transition.min_transition_duration)?;
        if self.transition.min_transition_duration > self.transition.max_transition_duration {
            return Err(anyhow!(
                "transition.min_transition_duration must not exceed transition.max_transition_duration"
            ));
        }

        // Margins
        let margin = &self.margin;
        check_unit("margin.margin_ratio", margin.margin_ratio)?;
        check_unit("margin.critical_threshold", margin.critical_threshold)?;
        if !(0.0 <= margin.min_margin && margin.min_margin <= margin.max_margin && margin.max_margin < 1.0)
        {
            return Err(anyhow!(
                "Margins must satisfy 0 <= margin.min_margin <= margin.max_margin < 1"
            ));
        }

        // Rescue
        let rescue = &self.rescue;
        if rescue.max_iterations == 0 {
            return Err(anyhow!("rescue.max_iterations must be at least 1"));
        }
        check_unit("rescue.tolerance_ratio", rescue.tolerance_ratio)?;
        if rescue.soft_overflow_limit > rescue.moderate_overflow_limit {
            return Err(anyhow!(
                "rescue.soft_overflow_limit must not exceed rescue.moderate_overflow_limit"
            ));
        }
        check_unit("rescue.soft_upgrade_critical_share", rescue.soft_upgrade_critical_share)?;
        check_unit(
            "rescue.moderate_upgrade_critical_share",
            rescue.moderate_upgrade_critical_share,
        )?;
        check_unit("rescue.soft_min_ratio", rescue.soft_min_ratio)?;
        check_unit("rescue.last_resort_critical_ratio", rescue.last_resort_critical_ratio)?;
        for (name, table) in [
            ("rescue.level_factors", &rescue.level_factors),
            ("rescue.moderate_floors", &rescue.moderate_floors),
            ("rescue.aggressive_ratios", &rescue.aggressive_ratios),
        ] {
            for value in [table.critical, table.high, table.medium, table.low] {
                check_positive(name, value)?;
                check_unit(name, value)?;
            }
        }

        // Alignment
        let alignment = &self.alignment;
        check_positive("alignment.min_stretch_ratio", alignment.min_stretch_ratio)?;
        check_positive("alignment.max_stretch_ratio", alignment.max_stretch_ratio)?;
        if alignment.max_stretch_ratio > 1.0 || alignment.min_stretch_ratio > 1.0 {
            return Err(anyhow!("alignment stretch ratios must not exceed 1"));
        }
        if alignment.alignment_threshold < 0.0 || alignment.max_shift_ms < 0.0 {
            return Err(anyhow!("alignment thresholds must not be negative"));
        }

        if self.analyzer.tolerance < 0.0 {
            return Err(anyhow!("analyzer.tolerance must not be negative"));
        }

        Ok(())
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load a configuration file, writing the defaults there first if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if FileManager::file_exists(path) {
            return Self::from_file(path);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        FileManager::write_to_file(path, &json)
    }

    /// Pipeline configured from this file
    pub fn pipeline(&self) -> ReconcilePipeline {
        ReconcilePipeline::new(
            self.policy.clone(),
            self.gap.clone(),
            self.transition.clone(),
            self.margin.clone(),
            self.rescue.clone(),
        )
    }
}
