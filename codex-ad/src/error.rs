//! Error types for codex-ad
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Playback failures are recoverable by design: the
//! Director absorbs them locally and the worst observable outcome is
//! silence with `is_playing` reporting false.

use thiserror::Error;

/// Main error type for the codex-ad module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The output refused to start a loop or overlay (missing user
    /// gesture, malformed source, decode failure)
    #[error("Start rejected: {0}")]
    StartRejected(String),

    /// Resuming a paused handle was refused by the output
    #[error("Resume rejected: {0}")]
    ResumeRejected(String),

    /// A signal or command referenced a track id absent from the catalog
    #[error("Track not found: {0}")]
    MissingTrack(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using codex-ad Error
pub type Result<T> = std::result::Result<T, Error>;
