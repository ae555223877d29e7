//! voxbot - Telegram chat bot relaying text and voice messages to OpenAI
//!
//! The bot accepts text and voice messages over the Telegram Bot API,
//! forwards them to OpenAI's chat-completion API, and keeps a per-user
//! conversation history so follow-up questions have context.
//!
//! # Architecture
//!
//! Voice messages go through a small ingestion pipeline:
//! - Fetch: stream the voice note from Telegram's file servers to disk
//! - Transcode: ffmpeg converts the OGG container to MP3, capped at 30s
//! - Transcribe: whisper turns the decoded audio into text
//! - Cleanup: both temporary files are removed whatever the outcome
//!
//! # Modules
//!
//! - `adapters`: Telegram and OpenAI API clients
//! - `media`: Voice ingestion pipeline (fetch, transcode, transcribe)
//! - `history`: Per-user conversation history store
//! - `bot`: Update loop, commands, and message handling
//! - `domain`: Data structures (ChatMessage, VoiceRequest, UserRecord)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start the bot (requires TELEGRAM_BOT_TOKEN and OPENAI_API_KEY)
//! voxbot run
//!
//! # Show resolved configuration
//! voxbot config
//! ```

pub mod adapters;
pub mod bot;
pub mod cli;
pub mod config;
pub mod domain;
pub mod history;
pub mod media;

// Re-export main types at crate root for convenience
pub use adapters::{OpenAiClient, TelegramClient, Transcriber};
pub use domain::{ChatMessage, Role, UserRecord, VoiceRequest};
pub use history::HistoryStore;
pub use media::{FfmpegTranscoder, IngestError, ScratchStore, VoicePipeline};
