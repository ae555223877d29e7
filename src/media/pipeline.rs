//! Voice ingestion orchestrator.
//!
//! Sequences fetch, transcode, and transcription for one voice request and
//! guarantees cleanup of both temporary files regardless of outcome. There
//! are no retries at this layer; a failure at any stage is terminal for that
//! request and is surfaced to the caller.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::adapters::Transcriber;
use crate::domain::{JobState, TranscodeJob, VoiceRequest};

use super::fetcher;
use super::scratch::ScratchStore;
use super::transcoder::Transcoder;
use super::IngestError;

/// Orchestrator for the download → transcode → transcribe pipeline.
///
/// Any number of requests may be in flight at once; each works against its
/// own pair of temporary files, so pipelines never contend with each other.
pub struct VoicePipeline {
    scratch: ScratchStore,
    client: reqwest::Client,
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn Transcriber>,
}

impl VoicePipeline {
    pub fn new(
        scratch: ScratchStore,
        client: reqwest::Client,
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            scratch,
            client,
            transcoder,
            transcriber,
        }
    }

    /// Process one voice message and return the recognized text.
    ///
    /// Cleanup always runs before the result is returned: on success both
    /// temporary files are gone; on failure whatever was written so far is
    /// removed. Cleanup failures are logged inside the scratch store and
    /// never mask the primary result.
    #[instrument(
        skip(self, request),
        fields(requester = %request.requester_id, request = %request.request_id)
    )]
    pub async fn ingest(&self, request: &VoiceRequest) -> Result<String, IngestError> {
        let stem = request.file_stem();
        let container = self.scratch.path_for(&stem, "ogg");
        let decoded = self.scratch.path_for(&stem, "mp3");
        let mut job = TranscodeJob::new(container, decoded);

        let result = self.run_stages(request, &mut job).await;
        if result.is_err() {
            job.state = JobState::Failed;
        }

        // The transcoder removes the container on its own success, and the
        // decoded file only exists from transcode success onward; release is
        // idempotent, so both paths are always safe to pass here.
        self.scratch.release(&job.source).await;
        self.scratch.release(&job.target).await;

        match &result {
            Ok(text) => info!(chars = text.len(), "voice message transcribed"),
            Err(e) => error!(stage = e.stage(), error = %e, "voice ingestion failed"),
        }

        result
    }

    async fn run_stages(
        &self,
        request: &VoiceRequest,
        job: &mut TranscodeJob,
    ) -> Result<String, IngestError> {
        job.state = JobState::Fetching;
        fetcher::fetch(&self.client, &request.source_url, &job.source).await?;

        job.state = JobState::Transcoding;
        self.transcoder.transcode(&job.source, &job.target).await?;

        job.state = JobState::Transcribing;
        let text = self.transcriber.transcribe(&job.target).await?;

        job.state = JobState::Done;
        Ok(text)
    }
}
