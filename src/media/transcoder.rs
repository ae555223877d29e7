//! ffmpeg-backed audio transcoding.
//!
//! Shells out to ffmpeg to convert the downloaded OGG container into MP3
//! for the transcription API, truncated to the first 30 seconds of audio.

use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::IngestError;

/// Hard cap on decoded audio duration. Longer input is silently truncated,
/// never rejected.
pub const MAX_CLIP_SECONDS: u32 = 30;

/// Audio conversion seam used by the voice pipeline.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert the audio at `source` into `target`.
    ///
    /// On success the source file is consumed (deleted). On failure the
    /// source is left in place, since the tool did not certify completion;
    /// cleanup is the pipeline's responsibility.
    async fn transcode(&self, source: &Path, target: &Path) -> Result<(), IngestError>;
}

/// Transcoder using the ffmpeg binary. Overrides to the binary path are
/// resolved by the configuration layer, not here.
pub struct FfmpegTranscoder {
    binary_path: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
        }
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

/// Arguments for one conversion, including the duration cap
pub fn ffmpeg_args(source: &Path, target: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        source.display().to_string(),
        "-t".to_string(),
        MAX_CLIP_SECONDS.to_string(),
        target.display().to_string(),
    ]
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, source: &Path, target: &Path) -> Result<(), IngestError> {
        let output = Command::new(&self.binary_path)
            .args(ffmpeg_args(source, target))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                IngestError::Transcode(format!("failed to run {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::Transcode(stderr.trim().to_string()));
        }

        debug!(source = %source.display(), target = %target.display(), "transcode complete");

        // The container file is consumed once ffmpeg certifies completion.
        // A failed delete must not fail the conversion itself.
        match tokio::fs::remove_file(source).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %source.display(), error = %e, "failed to remove container file");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_carry_duration_cap() {
        let args = ffmpeg_args(&PathBuf::from("in.ogg"), &PathBuf::from("out.mp3"));

        let t_pos = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_pos + 1], "30");
    }

    #[test]
    fn test_args_order_input_before_output() {
        let args = ffmpeg_args(&PathBuf::from("in.ogg"), &PathBuf::from("out.mp3"));

        let input_pos = args.iter().position(|a| a == "in.ogg").unwrap();
        let output_pos = args.iter().position(|a| a == "out.mp3").unwrap();
        assert!(input_pos < output_pos);
    }

    #[test]
    fn test_custom_binary_path() {
        let transcoder = FfmpegTranscoder::with_binary_path("/opt/homebrew/bin/ffmpeg");
        assert_eq!(transcoder.binary_path, "/opt/homebrew/bin/ffmpeg");
    }

    #[test]
    fn test_default_binary_path_ignores_environment() {
        std::env::set_var("FFMPEG_PATH", "/somewhere/else/ffmpeg");
        let transcoder = FfmpegTranscoder::new();
        std::env::remove_var("FFMPEG_PATH");

        assert_eq!(transcoder.binary_path, "ffmpeg");
    }
}
