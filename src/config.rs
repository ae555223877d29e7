//! Configuration for voxbot.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VOXBOT_HOME, TELEGRAM_BOT_TOKEN, OPENAI_API_KEY, FFMPEG_PATH)
//! 2. Config file ($VOXBOT_HOME/config.yaml)
//! 3. Defaults (~/.voxbot)
//!
//! Secrets only ever come from the environment; the config file carries
//! paths and model names. The resolved config is constructed explicitly and
//! injected into the store and client handles that need it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default request timeout for the shared HTTP client. Long enough for a
/// chat completion, short enough that a hung call cannot pin a pipeline
/// forever.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    /// Path to the ffmpeg binary
    pub ffmpeg: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Transient media directory (relative to home)
    pub scratch: Option<String>,
    /// History log file (relative to home)
    pub history: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    pub chat: Option<String>,
    pub speech: Option<String>,
    pub image: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to voxbot home
    pub home: PathBuf,
    /// Transient media directory
    pub scratch_dir: PathBuf,
    /// History log file
    pub history_path: PathBuf,
    /// Telegram bot token (None until TELEGRAM_BOT_TOKEN is set)
    pub telegram_token: Option<String>,
    /// OpenAI API key (None until OPENAI_API_KEY is set)
    pub openai_api_key: Option<String>,
    /// ffmpeg binary path
    pub ffmpeg_path: String,
    pub chat_model: String,
    pub speech_model: String,
    pub image_model: String,
    /// Shared HTTP client timeout
    pub request_timeout: Duration,
}

impl ResolvedConfig {
    /// Shared HTTP client honoring the configured timeout
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}

/// Load and parse a config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to home
fn resolve_path(home: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        home.join(path)
    }
}

/// Combine a home directory and an optional config file into final settings
fn resolve(home: PathBuf, file: ConfigFile) -> ResolvedConfig {
    let scratch_dir = file
        .paths
        .scratch
        .as_deref()
        .map(|p| resolve_path(&home, p))
        .unwrap_or_else(|| home.join("voices"));

    let history_path = file
        .paths
        .history
        .as_deref()
        .map(|p| resolve_path(&home, p))
        .unwrap_or_else(|| home.join("history.jsonl"));

    let ffmpeg_path = std::env::var("FFMPEG_PATH")
        .ok()
        .or(file.ffmpeg)
        .unwrap_or_else(|| "ffmpeg".to_string());

    ResolvedConfig {
        home,
        scratch_dir,
        history_path,
        telegram_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
        openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
        ffmpeg_path,
        chat_model: file
            .models
            .chat
            .unwrap_or_else(|| crate::adapters::openai::CHAT_MODEL.to_string()),
        speech_model: file
            .models
            .speech
            .unwrap_or_else(|| crate::adapters::openai::SPEECH_MODEL.to_string()),
        image_model: file
            .models
            .image
            .unwrap_or_else(|| crate::adapters::openai::IMAGE_MODEL.to_string()),
        request_timeout: Duration::from_secs(
            file.request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        ),
    }
}

/// Load configuration from all sources
pub fn load() -> Result<ResolvedConfig> {
    let home = match std::env::var("VOXBOT_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".voxbot"),
    };

    let config_path = home.join("config.yaml");
    let file = if config_path.exists() {
        load_config_file(&config_path)?
    } else {
        ConfigFile::default()
    };

    Ok(resolve(home, file))
}
