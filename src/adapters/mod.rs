//! Clients for the external capabilities the bot depends on.
//!
//! The Telegram and OpenAI APIs are consumed through narrow clients that
//! adapt external response shapes into stable internal types, so the rest
//! of the bot never sees a raw API payload.

pub mod openai;
pub mod telegram;

use std::path::Path;

use async_trait::async_trait;

use crate::media::IngestError;

// Re-export the clients
pub use openai::{GeneratedImage, OpenAiClient};
pub use telegram::{BotCommand, TelegramClient, TgMessage, TgUpdate, TgVoice};

/// Speech-to-text capability consumed by the voice pipeline.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path` into text
    async fn transcribe(&self, audio_path: &Path) -> Result<String, IngestError>;
}
