/*!
 * # substream - streaming subtitle acquisition pipeline
 *
 * A Rust library for extracting subtitle tracks and embedded fonts from a
 * media container that is still downloading over an unreliable,
 * partially-ordered transport, and for feeding a rendering surface with
 * synchronized cue data while the file is incomplete.
 *
 * ## Features
 *
 * - Three-phase acquisition: quick probe, live streaming tee, authoritative
 *   full re-parse
 * - Append-only, idempotent cue store shared across all parsing phases
 * - Normalization of external subtitle dialects (SRT, VTT) into one
 *   internal dialogue markup
 * - Debounced track selection driving a lazily created renderer
 * - Burn-in compositing of the rendered overlay into a capturable video
 *   stream for casting and picture-in-picture fallbacks
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_store`: Cue store, track headers and session state
 * - `subtitle_convert`: External subtitle dialect normalization
 * - `dialogue`: Internal dialogue-line markup and timestamps
 * - `acquisition`: The three-phase parse orchestrator
 * - `track_selector`: Debounced track selection
 * - `renderer`: Adapter around an external rendering capability
 * - `burn_in`: Frame compositor producing a capturable stream
 * - `demux`: Demuxer capability interface (with a scripted mock)
 * - `transport`: Byte-source capability interface
 * - `playback`: Playback surface capability interface
 * - `session`: Per-file session lifecycle
 * - `file_utils`: Sibling subtitle file discovery
 * - `errors`: Custom error types for the pipeline
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
pub mod acquisition;
pub mod app_config;
pub mod burn_in;
pub mod demux;
pub mod dialogue;
pub mod errors;
pub mod file_utils;
pub mod playback;
pub mod renderer;
pub mod session;
pub mod subtitle_convert;
pub mod subtitle_store;
pub mod track_selector;
pub mod transport;

// Re-export main types for easier usage
pub use acquisition::{AcquisitionHandle, ParseOrchestrator, Phase};
pub use app_config::Config;
pub use errors::{AppError, DemuxError, RenderError, SubtitleError};
pub use session::{ExternalSubtitleFile, PlaybackSession};
pub use subtitle_convert::{NormalizedFile, normalize_file};
pub use subtitle_store::{Selection, SubtitleStore, TrackHeader, TrackKind};
