//! Message dispatch: commands, paint mode, and text/voice turns.
//!
//! A text or voice turn is two appends and one completion: append the user
//! message, send the full history to the chat model, reply, append the
//! assistant message. Turns for different users run in parallel; within one
//! turn the sequence is strictly ordered.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::{TgMessage, TgVoice};
use crate::domain::{ChatMessage, VoiceRequest};

use super::{BotContext, ChatMode};

const ACK_TEXT: &str = "I received your message. Waiting for a response from the server";

pub(super) async fn handle_message(ctx: Arc<BotContext>, message: TgMessage) -> Result<()> {
    let chat_id = message.chat.id;

    if let Some(text) = message.text.clone() {
        if text.starts_with('/') {
            return handle_command(ctx, &message, &text).await;
        }

        return match ctx.mode(chat_id).await {
            ChatMode::Paint => handle_paint_prompt(ctx, chat_id, &text).await,
            ChatMode::Chat => handle_text_turn(ctx, chat_id, &text).await,
        };
    }

    if let Some(voice) = message.voice.clone() {
        return handle_voice(ctx, &message, &voice).await;
    }

    debug!(chat_id, "ignoring unsupported message type");
    Ok(())
}

async fn handle_command(ctx: Arc<BotContext>, message: &TgMessage, text: &str) -> Result<()> {
    let chat_id = message.chat.id;

    // "/paint@botname arg" -> "/paint"
    let command = text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .split('@')
        .next()
        .unwrap_or("");

    match command {
        "/start" => {
            let name = message
                .chat
                .first_name
                .clone()
                .unwrap_or_else(|| "there".to_string());
            let greeting = format!(
                "Greetings {}! Ask me anything with *text* or *voice* messages. \
                 Text answers come from the *GPT-4-turbo* model and /paint \
                 generates images with *dall-e-3*.",
                name
            );
            ctx.telegram.send_markdown_message(chat_id, &greeting).await?;
        }
        "/clear" => {
            let user = ctx.history.find_or_create_user(&chat_id.to_string()).await?;
            ctx.history.clear_messages(&user.id).await?;
            ctx.telegram
                .send_message(chat_id, "I successfully cleaned up all your context")
                .await?;
        }
        "/paint" => {
            ctx.set_mode(chat_id, ChatMode::Paint).await;
            ctx.telegram
                .send_message(
                    chat_id,
                    "You have entered paint mode! Write any prompt you want. \
                     Use /quit to leave this mode.",
                )
                .await?;
        }
        "/quit" => {
            ctx.set_mode(chat_id, ChatMode::Chat).await;
            ctx.telegram
                .send_message(chat_id, "You have left the paint mode")
                .await?;
        }
        "/models" => {
            let models = ctx.openai.list_models().await?;
            let listing: Vec<&str> = models
                .iter()
                .filter(|id| id.starts_with("gpt"))
                .map(String::as_str)
                .collect();
            let reply = if listing.is_empty() {
                "No chat models available".to_string()
            } else {
                listing.join("\n")
            };
            ctx.telegram.send_message(chat_id, &reply).await?;
        }
        _ => {
            debug!(chat_id, command, "unknown command ignored");
        }
    }

    Ok(())
}

async fn handle_text_turn(ctx: Arc<BotContext>, chat_id: i64, text: &str) -> Result<()> {
    let user = ctx.history.find_or_create_user(&chat_id.to_string()).await?;

    ctx.telegram.send_message(chat_id, ACK_TEXT).await?;
    complete_turn(&ctx, chat_id, &user.id, text).await
}

async fn handle_voice(ctx: Arc<BotContext>, message: &TgMessage, voice: &TgVoice) -> Result<()> {
    let chat_id = message.chat.id;

    // Temp files are namespaced by the sender, history by the chat
    let requester_id = message
        .from
        .as_ref()
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| chat_id.to_string());

    let user = ctx.history.find_or_create_user(&chat_id.to_string()).await?;
    ctx.telegram.send_message(chat_id, ACK_TEXT).await?;

    let file = ctx.telegram.get_file(&voice.file_id).await?;
    let file_path = file
        .file_path
        .context("Telegram returned no file path for the voice note")?;

    let request = VoiceRequest::new(ctx.telegram.file_download_url(&file_path), requester_id);
    info!(chat_id, duration = voice.duration, "voice message received");

    let text = ctx.pipeline.ingest(&request).await?;
    ctx.telegram
        .send_message(chat_id, &format!("Your message is: {}", text))
        .await?;

    match ctx.mode(chat_id).await {
        ChatMode::Paint => paint_reply(&ctx, chat_id, &text).await,
        ChatMode::Chat => complete_turn(&ctx, chat_id, &user.id, &text).await,
    }
}

async fn handle_paint_prompt(ctx: Arc<BotContext>, chat_id: i64, prompt: &str) -> Result<()> {
    ctx.telegram
        .send_message(chat_id, "I received your prompt. Let's try to draw it!")
        .await?;
    paint_reply(&ctx, chat_id, prompt).await
}

/// Append the user message, ask the chat model, reply, append the answer.
async fn complete_turn(ctx: &BotContext, chat_id: i64, user_id: &str, text: &str) -> Result<()> {
    let updated = ctx
        .history
        .append_message(user_id, ChatMessage::user(text))
        .await?;
    let messages = updated
        .messages()
        .context("Stored history is not valid message JSON")?;

    // Best effort; a failed chat action must not fail the turn
    let _ = ctx.telegram.send_chat_action(chat_id, "typing").await;

    let reply = ctx.openai.complete(&messages).await?;
    ctx.telegram.send_message(chat_id, &reply.content).await?;
    ctx.history.append_message(user_id, reply).await?;

    Ok(())
}

async fn paint_reply(ctx: &BotContext, chat_id: i64, prompt: &str) -> Result<()> {
    let _ = ctx.telegram.send_chat_action(chat_id, "upload_photo").await;

    let image = ctx.openai.generate_image(prompt).await?;
    ctx.telegram
        .send_photo(chat_id, &image.url, image.revised_prompt.as_deref())
        .await?;

    Ok(())
}
