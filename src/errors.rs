/*!
 * Error types for the substream library.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors reported by a container demuxer capability
#[derive(Error, Debug)]
pub enum DemuxError {
    /// The container data could not be parsed any further
    #[error("Malformed container data: {0}")]
    Malformed(String),

    /// The byte source ended unexpectedly or failed to read
    #[error("Byte source error: {0}")]
    Source(String),

    /// The demux session was destroyed while events were still pending
    #[error("Demux session destroyed")]
    Destroyed,
}

/// Errors that can occur while normalizing subtitle content
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A timestamp did not match any known timing convention
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A cue block did not match the block grammar
    #[error("Malformed cue block at index {0}")]
    MalformedBlock(usize),

    /// The file extension is not a supported subtitle dialect
    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),
}

/// Errors from the rendering backend
#[derive(Error, Debug)]
pub enum RenderError {
    /// The backend failed to initialize or accept content
    #[error("Renderer backend error: {0}")]
    Backend(String),

    /// The adapter was used after `destroy()`
    #[error("Renderer already destroyed")]
    Destroyed,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the demuxer capability
    #[error("Demux error: {0}")]
    Demux(#[from] DemuxError),

    /// Error from subtitle normalization
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from the rendering path
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

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
