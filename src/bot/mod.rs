//! Telegram update loop and message handling.
//!
//! Each incoming message is handled in its own spawned task, so one
//! request's failure (or a slow voice pipeline) never blocks or crashes the
//! rest. Handler errors are logged and reported back to the chat.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::adapters::{BotCommand, OpenAiClient, TelegramClient};
use crate::history::HistoryStore;
use crate::media::VoicePipeline;

/// Long-poll duration for getUpdates. Kept under the HTTP client timeout.
const POLL_TIMEOUT_SECS: u64 = 25;

/// What a chat's next plain message means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Messages are conversation turns (default)
    Chat,
    /// Messages are image prompts, until /quit
    Paint,
}

/// Shared state handed to every message handler.
pub struct BotContext {
    pub(crate) telegram: TelegramClient,
    pub(crate) openai: Arc<OpenAiClient>,
    pub(crate) pipeline: VoicePipeline,
    pub(crate) history: HistoryStore,
    modes: Mutex<HashMap<i64, ChatMode>>,
}

impl BotContext {
    pub(crate) async fn mode(&self, chat_id: i64) -> ChatMode {
        self.modes
            .lock()
            .await
            .get(&chat_id)
            .copied()
            .unwrap_or(ChatMode::Chat)
    }

    pub(crate) async fn set_mode(&self, chat_id: i64, mode: ChatMode) {
        self.modes.lock().await.insert(chat_id, mode);
    }
}

/// The bot application: owns the context and runs the update loop.
pub struct BotApp {
    ctx: Arc<BotContext>,
}

/// Commands shown in the Telegram command menu
fn default_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Start bot command"),
        BotCommand::new("clear", "Clear your chat context"),
        BotCommand::new("paint", "Give a prompt and get an image"),
    ]
}

impl BotApp {
    pub fn new(
        telegram: TelegramClient,
        openai: Arc<OpenAiClient>,
        pipeline: VoicePipeline,
        history: HistoryStore,
    ) -> Self {
        Self {
            ctx: Arc::new(BotContext {
                telegram,
                openai,
                pipeline,
                history,
                modes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Poll for updates until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        self.ctx
            .telegram
            .set_my_commands(&default_commands())
            .await
            .context("Failed to register bot commands")?;

        info!("bot started, polling for updates");

        let mut offset = 0i64;
        loop {
            let updates = tokio::select! {
                result = self.ctx.telegram.get_updates(offset, POLL_TIMEOUT_SECS) => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed, backing off: {:#}", e);
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else {
                    continue;
                };

                let ctx = Arc::clone(&self.ctx);
                tokio::spawn(async move {
                    let chat_id = message.chat.id;
                    if let Err(e) = handlers::handle_message(Arc::clone(&ctx), message).await {
                        error!(chat_id, "message handling failed: {:#}", e);
                        let _ = ctx
                            .telegram
                            .send_message(chat_id, &format!("Something went wrong: {:#}", e))
                            .await;
                    }
                });
            }
        }

        // Flush the history log before exiting so appended turns survive
        self.ctx.history.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_commands_registered() {
        let commands = default_commands();
        assert!(commands.iter().any(|c| c.command == "start"));
        assert!(commands.iter().any(|c| c.command == "clear"));
        assert!(commands.iter().any(|c| c.command == "paint"));
    }
}
