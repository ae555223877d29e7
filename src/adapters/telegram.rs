//! Telegram Bot API adapter.
//!
//! Raw HTTP client for the handful of Bot API methods the bot needs:
//! long polling, sending messages/photos, chat actions, command
//! registration, and resolving voice-note download URLs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// API origin (overridable for tests)
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Response envelope from the Telegram API
#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// One update from getUpdates
#[derive(Debug, Clone, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

/// An incoming message
#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
    pub voice: Option<TgVoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub first_name: Option<String>,
}

/// Voice note attached to a message
#[derive(Debug, Clone, Deserialize)]
pub struct TgVoice {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
}

/// Result of getFile
#[derive(Debug, Clone, Deserialize)]
pub struct TgFile {
    pub file_id: String,
    pub file_path: Option<String>,
}

/// Message result from sendMessage/sendPhoto
#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
}

/// A bot command for setMyCommands
#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

impl TelegramClient {
    /// Create a new Telegram client
    pub fn new(bot_token: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            bot_token: bot_token.into(),
            base_url: "https://api.telegram.org".to_string(),
            client,
        }
    }

    /// Point the client at a different API origin (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build API URL for a bot method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }

    /// Download URL for a file path returned by getFile
    pub fn file_download_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.bot_token, file_path)
    }

    /// POST a method call and unwrap the response envelope
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram {}", method))?;

        let envelope: TgResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram {} response", method))?;

        if !envelope.ok {
            anyhow::bail!(
                "Telegram API error from {}: {}",
                method,
                envelope.description.unwrap_or_default()
            );
        }

        envelope
            .result
            .with_context(|| format!("Telegram {} returned no result", method))
    }

    /// Long-poll for new updates starting at `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<TgUpdate>> {
        self.call(
            "getUpdates",
            &serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Send a text message
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let result: MessageResult = self
            .call(
                "sendMessage",
                &serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                }),
            )
            .await?;

        Ok(result.message_id)
    }

    /// Send a Markdown-formatted text message
    pub async fn send_markdown_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let result: MessageResult = self
            .call(
                "sendMessage",
                &serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "Markdown",
                }),
            )
            .await?;

        Ok(result.message_id)
    }

    /// Send a photo by URL, with an optional caption
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: Option<&str>,
    ) -> Result<i64> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "photo": photo_url,
        });
        if let Some(caption) = caption {
            body["caption"] = serde_json::Value::String(caption.to_string());
        }

        let result: MessageResult = self.call("sendPhoto", &body).await?;
        Ok(result.message_id)
    }

    /// Show a chat action ("typing" while the model works)
    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        let _: bool = self
            .call(
                "sendChatAction",
                &serde_json::json!({
                    "chat_id": chat_id,
                    "action": action,
                }),
            )
            .await?;

        Ok(())
    }

    /// Register the bot's command menu
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let _: bool = self
            .call(
                "setMyCommands",
                &serde_json::json!({ "commands": commands }),
            )
            .await?;

        Ok(())
    }

    /// Resolve a file id into a downloadable file path
    pub async fn get_file(&self, file_id: &str) -> Result<TgFile> {
        self.call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let client = TelegramClient::new("TOKEN", reqwest::Client::new());
        assert_eq!(
            client.api_url("sendMessage"),
            "https://api.telegram.org/botTOKEN/sendMessage"
        );
    }

    #[test]
    fn test_file_download_url() {
        let client = TelegramClient::new("TOKEN", reqwest::Client::new());
        assert_eq!(
            client.file_download_url("voice/file_7.oga"),
            "https://api.telegram.org/file/botTOKEN/voice/file_7.oga"
        );
    }

    #[test]
    fn test_update_parsing() {
        let json = r#"{
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": {"id": 42, "first_name": "Ada"},
                "from": {"id": 42, "first_name": "Ada"},
                "voice": {"file_id": "abc", "duration": 7}
            }
        }"#;

        let update: TgUpdate = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.voice.unwrap().file_id, "abc");
        assert!(message.text.is_none());
    }
}
