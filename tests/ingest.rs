//! Voice Ingestion Integration Tests
//!
//! Exercises the full fetch → transcode → transcribe pipeline with an HTTP
//! stub for Telegram's file servers and fake transcode/transcribe backends,
//! checking both the returned results and the scratch directory contents.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxbot::adapters::Transcriber;
use voxbot::domain::VoiceRequest;
use voxbot::media::{IngestError, ScratchStore, Transcoder, VoicePipeline};

/// Transcoder fake with the real contract: writes the target and consumes
/// the source on success.
struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, source: &Path, target: &Path) -> Result<(), IngestError> {
        tokio::fs::copy(source, target)
            .await
            .map_err(|e| IngestError::Transcode(e.to_string()))?;
        tokio::fs::remove_file(source)
            .await
            .map_err(|e| IngestError::Transcode(e.to_string()))?;
        Ok(())
    }
}

/// Transcoder fake that fails without touching either file, like ffmpeg
/// refusing invalid input.
struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode(&self, _source: &Path, _target: &Path) -> Result<(), IngestError> {
        Err(IngestError::Transcode("invalid data found".to_string()))
    }
}

/// Transcriber fake returning the decoded file's contents as the text.
struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, IngestError> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| IngestError::Transcription(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}

struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String, IngestError> {
        Err(IngestError::Transcription("service unavailable".to_string()))
    }
}

async fn scratch_file_count(dir: &Path) -> usize {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir).await.unwrap();
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    count
}

fn pipeline(
    scratch: ScratchStore,
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn Transcriber>,
) -> VoicePipeline {
    VoicePipeline::new(scratch, reqwest::Client::new(), transcoder, transcriber)
}

#[tokio::test]
async fn test_successful_ingest_leaves_no_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ten seconds of audio".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let scratch = ScratchStore::open(temp.path()).await.unwrap();
    let pipeline = pipeline(
        scratch,
        Arc::new(CopyTranscoder),
        Arc::new(EchoTranscriber),
    );

    let request = VoiceRequest::new(format!("{}/voice/1", server.uri()), "42");
    let text = pipeline.ingest(&request).await.unwrap();

    assert_eq!(text, "ten seconds of audio");
    assert!(!text.is_empty());
    assert_eq!(scratch_file_count(temp.path()).await, 0);
}

#[tokio::test]
async fn test_fetch_404_reports_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let scratch = ScratchStore::open(temp.path()).await.unwrap();
    let pipeline = pipeline(
        scratch,
        Arc::new(CopyTranscoder),
        Arc::new(EchoTranscriber),
    );

    let request = VoiceRequest::new(format!("{}/voice/missing", server.uri()), "42");
    let err = pipeline.ingest(&request).await.unwrap_err();

    assert!(matches!(err, IngestError::Fetch(_)));
    // No container file is left behind
    assert_eq!(scratch_file_count(temp.path()).await, 0);
}

#[tokio::test]
async fn test_transcode_failure_cleans_container() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"broken audio".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let scratch = ScratchStore::open(temp.path()).await.unwrap();
    let pipeline = pipeline(
        scratch,
        Arc::new(FailingTranscoder),
        Arc::new(EchoTranscriber),
    );

    let request = VoiceRequest::new(format!("{}/voice/1", server.uri()), "42");
    let err = pipeline.ingest(&request).await.unwrap_err();

    assert!(matches!(err, IngestError::Transcode(_)));
    // Cleanup removed the downloaded container; no decoded file was created
    assert_eq!(scratch_file_count(temp.path()).await, 0);
}

#[tokio::test]
async fn test_transcription_failure_cleans_decoded_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let scratch = ScratchStore::open(temp.path()).await.unwrap();
    let pipeline = pipeline(
        scratch,
        Arc::new(CopyTranscoder),
        Arc::new(FailingTranscriber),
    );

    let request = VoiceRequest::new(format!("{}/voice/1", server.uri()), "42");
    let err = pipeline.ingest(&request).await.unwrap_err();

    assert!(matches!(err, IngestError::Transcription(_)));
    assert_eq!(scratch_file_count(temp.path()).await, 0);
}

#[tokio::test]
async fn test_concurrent_requesters_do_not_cross_contaminate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/one"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"message from one".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/voice/two"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"message from two".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let scratch = ScratchStore::open(temp.path()).await.unwrap();
    let pipeline = Arc::new(pipeline(
        scratch,
        Arc::new(CopyTranscoder),
        Arc::new(EchoTranscriber),
    ));

    let request_one = VoiceRequest::new(format!("{}/voice/one", server.uri()), "1");
    let request_two = VoiceRequest::new(format!("{}/voice/two", server.uri()), "2");

    let (first, second) = tokio::join!(
        pipeline.ingest(&request_one),
        pipeline.ingest(&request_two)
    );

    assert_eq!(first.unwrap(), "message from one");
    assert_eq!(second.unwrap(), "message from two");
    assert_eq!(scratch_file_count(temp.path()).await, 0);
}

#[tokio::test]
async fn test_same_requester_overlapping_requests_are_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/first"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first note".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/voice/second"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second note".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let scratch = ScratchStore::open(temp.path()).await.unwrap();
    let pipeline = Arc::new(pipeline(
        scratch,
        Arc::new(CopyTranscoder),
        Arc::new(EchoTranscriber),
    ));

    // Same requester id; the per-request token keeps the file pairs apart
    let request_a = VoiceRequest::new(format!("{}/voice/first", server.uri()), "42");
    let request_b = VoiceRequest::new(format!("{}/voice/second", server.uri()), "42");

    let (first, second) = tokio::join!(pipeline.ingest(&request_a), pipeline.ingest(&request_b));

    assert_eq!(first.unwrap(), "first note");
    assert_eq!(second.unwrap(), "second note");
    assert_eq!(scratch_file_count(temp.path()).await, 0);
}
