//! Command-line interface for voxbot.
//!
//! Provides commands for starting the bot, inspecting the resolved
//! configuration, and listing available chat models.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{OpenAiClient, TelegramClient, Transcriber};
use crate::bot::BotApp;
use crate::config;
use crate::history::HistoryStore;
use crate::media::{FfmpegTranscoder, ScratchStore, VoicePipeline};

/// voxbot - Telegram chat bot relaying text and voice messages to OpenAI
#[derive(Parser, Debug)]
#[command(name = "voxbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot (long polling until interrupted)
    Run,

    /// Show resolved configuration
    Config,

    /// List chat models available to the configured API key
    Models,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run => execute_run().await,
            Commands::Config => execute_config(),
            Commands::Models => execute_models().await,
        }
    }
}

/// Wire up the store, clients, and pipeline, then run the update loop
async fn execute_run() -> Result<()> {
    let config = config::load()?;

    let telegram_token = config
        .telegram_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN is not set")?;
    let openai_api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;

    let client = config.http_client()?;

    let telegram = TelegramClient::new(telegram_token, client.clone());
    let openai = Arc::new(
        OpenAiClient::new(openai_api_key, client.clone()).with_models(
            config.chat_model.clone(),
            config.speech_model.clone(),
            config.image_model.clone(),
        ),
    );

    let scratch = ScratchStore::open(&config.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                config.scratch_dir.display()
            )
        })?;
    let history = HistoryStore::open(&config.history_path)
        .await
        .context("Failed to open history store")?;

    let transcoder = Arc::new(FfmpegTranscoder::with_binary_path(
        config.ffmpeg_path.clone(),
    ));
    let transcriber: Arc<dyn Transcriber> = openai.clone();
    let pipeline = VoicePipeline::new(scratch, client, transcoder, transcriber);

    BotApp::new(telegram, openai, pipeline, history).run().await
}

/// Print the resolved configuration, with secrets masked
fn execute_config() -> Result<()> {
    let config = config::load()?;

    println!("Home:           {}", config.home.display());
    println!("Scratch dir:    {}", config.scratch_dir.display());
    println!("History log:    {}", config.history_path.display());
    println!("ffmpeg:         {}", config.ffmpeg_path);
    println!("Chat model:     {}", config.chat_model);
    println!("Speech model:   {}", config.speech_model);
    println!("Image model:    {}", config.image_model);
    println!(
        "Telegram token: {}",
        if config.telegram_token.is_some() {
            "set"
        } else {
            "unset"
        }
    );
    println!(
        "OpenAI key:     {}",
        if config.openai_api_key.is_some() {
            "set"
        } else {
            "unset"
        }
    );

    Ok(())
}

async fn execute_models() -> Result<()> {
    let config = config::load()?;
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;

    let openai = OpenAiClient::new(api_key, config.http_client()?);
    for model in openai.list_models().await? {
        println!("{}", model);
    }

    Ok(())
}
