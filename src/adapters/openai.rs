//! OpenAI API client.
//!
//! Chat completion, whisper transcription, image generation, and model
//! listing. External response shapes are adapted into stable internal types
//! here; nothing downstream touches `choices[0]` or friends.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::domain::ChatMessage;
use crate::media::IngestError;

use super::Transcriber;

/// Default chat-completion model
pub const CHAT_MODEL: &str = "gpt-4-1106-preview";
/// Default speech-to-text model
pub const SPEECH_MODEL: &str = "whisper-1";
/// Default image-generation model
pub const IMAGE_MODEL: &str = "dall-e-3";

/// OpenAI API client
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    chat_model: String,
    speech_model: String,
    image_model: String,
    client: reqwest::Client,
}

/// A generated image
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
    revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiClient {
    /// Create a client with the default models
    pub fn new(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: CHAT_MODEL.to_string(),
            speech_model: SPEECH_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
            client,
        }
    }

    /// Point the client at a different API origin (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the configured models
    pub fn with_models(
        mut self,
        chat_model: impl Into<String>,
        speech_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        self.chat_model = chat_model.into();
        self.speech_model = speech_model.into();
        self.image_model = image_model.into();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Ask the chat model for the next reply in a conversation
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.chat_model,
                "messages": messages,
            }))
            .send()
            .await
            .context("Failed to call chat completion")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion failed with {}: {}", status, body.trim());
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("Chat completion returned no choices")
    }

    /// Transcribe an audio file with the speech model
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String> {
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio_path.display()))?;

        debug!(file = %audio_path.display(), bytes = file_bytes.len(), "uploading audio for transcription");

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .context("Invalid audio mime type")?;

        let form = Form::new()
            .text("model", self.speech_model.clone())
            .part("file", file_part);

        let response = self
            .client
            .post(self.api_url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to call transcription")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Transcription failed with {}: {}", status, body.trim());
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(transcription.text)
    }

    /// Generate an image from a prompt
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let response = self
            .client
            .post(self.api_url("images/generations"))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.image_model,
                "prompt": prompt,
                "n": 1,
                "size": "1024x1024",
            }))
            .send()
            .await
            .context("Failed to call image generation")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Image generation failed with {}: {}", status, body.trim());
        }

        let images: ImageResponse = response
            .json()
            .await
            .context("Failed to parse image generation response")?;

        images
            .data
            .into_iter()
            .next()
            .map(|image| GeneratedImage {
                url: image.url,
                revised_prompt: image.revised_prompt,
            })
            .context("Image generation returned no images")
    }

    /// List the models available to this API key
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to call model listing")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Model listing failed with {}: {}", status, body.trim());
        }

        let models: ModelsResponse = response
            .json()
            .await
            .context("Failed to parse model listing response")?;

        let mut ids: Vec<String> = models.data.into_iter().map(|m| m.id).collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, IngestError> {
        self.transcribe_file(audio_path)
            .await
            .map_err(|e| IngestError::Transcription(format!("{:#}", e)))
    }
}
