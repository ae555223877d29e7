//! Voice requests and in-flight transcode job state.

use std::path::PathBuf;

use uuid::Uuid;

/// One voice message to process.
///
/// The request id is minted per request so two overlapping voice messages
/// from the same requester never share temporary file names.
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    /// Where Telegram currently hosts the voice note
    pub source_url: String,

    /// Identifier of the chat/user that sent the voice message
    pub requester_id: String,

    /// Unique token for this request
    pub request_id: Uuid,
}

impl VoiceRequest {
    pub fn new(source_url: impl Into<String>, requester_id: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            requester_id: requester_id.into(),
            request_id: Uuid::new_v4(),
        }
    }

    /// File stem shared by this request's temporary files
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.requester_id, self.request_id)
    }
}

/// Stage of one voice-message pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Fetching,
    Transcoding,
    Transcribing,
    Done,
    Failed,
}

/// The in-flight work for one [`VoiceRequest`].
///
/// Owned exclusively by the pipeline for the lifetime of one voice message;
/// never shared across requests.
#[derive(Debug)]
pub struct TranscodeJob {
    /// Downloaded container file (OGG)
    pub source: PathBuf,

    /// Decoded audio file (MP3)
    pub target: PathBuf,

    pub state: JobState,
}

impl TranscodeJob {
    pub fn new(source: PathBuf, target: PathBuf) -> Self {
        Self {
            source,
            target,
            state: JobState::Fetching,
        }
    }
}
