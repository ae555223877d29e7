//! Voice ingestion pipeline.
//!
//! Handles one Telegram voice message end to end:
//!
//! 1. **Fetcher**: streams the voice note from Telegram's file servers to disk
//! 2. **Transcoder**: ffmpeg converts the OGG container to MP3, capped at 30s
//! 3. **Transcription**: whisper turns the decoded audio into text
//!
//! The [`ScratchStore`] owns the temporary-media directory; the
//! [`VoicePipeline`] guarantees both temporary files are removed regardless
//! of outcome.

pub mod fetcher;
pub mod pipeline;
pub mod scratch;
pub mod transcoder;

use thiserror::Error;

// Re-export key types
pub use pipeline::VoicePipeline;
pub use scratch::ScratchStore;
pub use transcoder::{FfmpegTranscoder, Transcoder, MAX_CLIP_SECONDS};

/// Errors from the voice ingestion pipeline.
///
/// Each stage has exactly one error kind; a stage failure is terminal for
/// that request. Cleanup failures are never surfaced here, they are logged
/// and swallowed so they cannot mask the primary result.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("download failed: {0}")]
    Fetch(String),

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("transcription failed: {0}")]
    Transcription(String),
}

impl IngestError {
    /// Stage name for logging
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Transcode(_) => "transcode",
            Self::Transcription(_) => "transcription",
        }
    }
}
