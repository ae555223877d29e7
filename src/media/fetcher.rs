//! Streamed download of remote voice notes.

use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::IngestError;

/// Download `url` into `dest`, streaming the body to disk.
///
/// Resolves only after the file has been flushed. A non-2xx status or a
/// stream error fails the download; whatever was partially written is left
/// for the pipeline's cleanup to remove.
pub async fn fetch(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), IngestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::Fetch(format!("request to {} failed: {}", url, e)))?;

    let mut response = response
        .error_for_status()
        .map_err(|e| IngestError::Fetch(e.to_string()))?;

    let mut file = File::create(dest)
        .await
        .map_err(|e| IngestError::Fetch(format!("failed to create {}: {}", dest.display(), e)))?;

    let mut bytes_written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| IngestError::Fetch(format!("response stream error: {}", e)))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| IngestError::Fetch(format!("write to {} failed: {}", dest.display(), e)))?;
        bytes_written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| IngestError::Fetch(format!("flush of {} failed: {}", dest.display(), e)))?;

    debug!(url, bytes = bytes_written, dest = %dest.display(), "voice note downloaded");
    Ok(())
}
