/*!
 * Error types for the scenefit engine.
 *
 * Each area of the engine has its own error enum so callers can react
 * programmatically; `AppError` wraps all of them for the binary and for
 * callers that just want one type. Definitions use the thiserror crate.
 */

use thiserror::Error;

/// Errors raised by the overflow rescue ladder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverflowError {
    /// No combination of compression could bring the total under target
    #[error(
        "Critical overflow: achieved {current:.3}s against target {target:.3}s (deficit {deficit:.3}s)"
    )]
    CriticalOverflow {
        /// Total duration after the last-resort pass
        current: f64,
        /// Requested target duration
        target: f64,
        /// How far above the target the result still is (`current - target`)
        deficit: f64,
    },

    /// Target duration is zero, negative or not a number
    #[error("Invalid target duration: {0}")]
    InvalidTarget(f64),
}

/// Errors raised by the timeline archiver
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Version id unknown, or its backing file missing or corrupt
    #[error("Version not found: {version_id}")]
    VersionNotFound {
        /// Requested version id
        version_id: String,
    },

    /// Project id is empty or would escape the archive root
    #[error("Invalid project id: {0}")]
    InvalidProject(String),

    /// Refused to delete the only remaining version
    #[error("Cannot delete the last remaining version: {version_id}")]
    CannotDeleteLastVersion {
        /// Version that was asked to be deleted
        version_id: String,
    },

    /// Underlying storage failed
    #[error("Archive storage error: {0}")]
    Storage(String),

    /// History or version payload could not be (de)serialized
    #[error("Archive serialization error: {0}")]
    Serialization(String),

    /// An imported file did not contain a usable version
    #[error("Invalid archive import: {0}")]
    InvalidImport(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Errors raised while measuring asset duration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Neither frame statistics nor container metadata could be used
    #[error("Duration measurement unavailable for asset: {asset}")]
    MeasurementUnavailable {
        /// Name of the probed asset
        asset: String,
    },
}

/// Errors raised by the multi-track aligner
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    /// A track reported a duration that cannot be aligned
    #[error("Track {track_id} has invalid duration {duration}")]
    InvalidDuration {
        /// Offending track
        track_id: String,
        /// Reported duration
        duration: f64,
    },
}

/// Errors raised when converting caller records into scenes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Input was not a JSON array of records
    #[error("Expected a list of scene records")]
    NotAList,

    /// A record was not a JSON object
    #[error("Scene record {index} is not an object")]
    NotAnObject {
        /// Position in the input list
        index: usize,
    },

    /// A required timing field was missing
    #[error("Scene record {index} is missing field '{field}'")]
    MissingField {
        /// Position in the input list
        index: usize,
        /// Configured field name
        field: String,
    },

    /// A field had the wrong type or an unusable value
    #[error("Scene record {index} has invalid field '{field}': {reason}")]
    InvalidField {
        /// Position in the input list
        index: usize,
        /// Configured field name
        field: String,
        /// What was wrong
        reason: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the overflow rescuer
    #[error("Overflow error: {0}")]
    Overflow(#[from] OverflowError),

    /// Error from the archiver
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Error from duration analysis
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Error from track alignment
    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    /// Error from the scene schema adapter
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
