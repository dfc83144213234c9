/*!
 * # scenefit - scene timeline reconciliation
 *
 * A Rust library that fits an ordered list of video scenes to hard
 * duration constraints while keeping the important scenes intact.
 *
 * ## Features
 *
 * - Close millisecond gaps left by cut detection
 * - Insert short transitions between heavily compressed neighbours
 * - Keep a safety margin under the target duration
 * - Escalating overflow rescue (soft, moderate, aggressive, last resort)
 * - Align audio, video and subtitle tracks to a common duration
 * - Measure and cross-check asset durations
 * - Content-addressed version archive for timelines
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `scene`: Scene model shared by every stage
 * - `protection`: Protection and importance rules
 * - `schema`: Conversion between caller records and scenes
 * - `timeline`: The reconciliation stages:
 *   - `timeline::gap_eraser`: Micro-gap elimination
 *   - `timeline::transitions`: Transition insertion
 *   - `timeline::safety_margin`: Safety margin enforcement
 *   - `timeline::overflow`: Overflow rescue state machine
 *   - `timeline::pipeline`: The stages composed in order
 * - `alignment`: Multi-track time alignment
 * - `analysis`: Asset duration measurement
 * - `archive`: Timeline version archive
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod alignment;
pub mod analysis;
pub mod app_config;
pub mod archive;
pub mod errors;
pub mod file_utils;
pub mod protection;
pub mod scene;
pub mod schema;
pub mod timeline;

// Re-export main types for easier usage
pub use alignment::{MultiTrackAligner, Track, TrackType};
pub use analysis::{DurationAnalyzer, MediaAsset};
pub use app_config::Config;
pub use archive::TimelineArchiver;
pub use errors::{AlignmentError, AnalysisError, AppError, ArchiveError, OverflowError, SchemaError};
pub use protection::ScenePolicy;
pub use scene::{Scene, SceneList};
pub use schema::SceneSchema;
pub use timeline::{ReconcilePipeline, RescueState};
