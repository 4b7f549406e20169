use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gchat::gemini;
use crate::gchat::responder::Pacing;
use crate::gchat::tts;
use crate::translate;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// The operator: runs the commands and receives error notices.
    owner_id: u64,
    gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    gemini_model: String,
    #[serde(default = "default_command_prefix")]
    command_prefix: String,
    /// Directory for the store and logs. Defaults to current directory.
    data_dir: Option<String>,
    /// ElevenLabs key for voice replies. Voice replies fail without it.
    elevenlabs_api_key: Option<String>,
    elevenlabs_voice_id: Option<String>,
    /// Candidate pauses before a reply, in seconds.
    #[serde(default = "default_reply_delays")]
    reply_delays_secs: Vec<u64>,
    #[serde(default = "default_max_typing_delay")]
    max_typing_delay_secs: f64,
    #[serde(default = "default_ack_delay_ms")]
    command_ack_delay_ms: u64,
    #[serde(default = "default_translate_endpoint")]
    translate_endpoint: String,
}

fn default_gemini_model() -> String {
    gemini::DEFAULT_MODEL.to_string()
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_reply_delays() -> Vec<u64> {
    vec![5, 10, 12]
}

fn default_max_typing_delay() -> f64 {
    5.0
}

fn default_ack_delay_ms() -> u64 {
    1000
}

fn default_translate_endpoint() -> String {
    translate::DEFAULT_ENDPOINT.to_string()
}

/// ElevenLabs settings, present only when a key is configured.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: String,
    pub voice_id: String,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub owner_id: u64,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub command_prefix: String,
    /// Directory for state files (store, logs).
    pub data_dir: PathBuf,
    pub speech: Option<SpeechConfig>,
    pub pacing: Pacing,
    pub command_ack_delay: Duration,
    pub translate_endpoint: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.owner_id == 0 {
            return Err(ConfigError::Validation("owner_id must be a Telegram user ID".into()));
        }
        if file.gemini_api_key.is_empty() {
            return Err(ConfigError::Validation("gemini_api_key is required".into()));
        }
        if file.command_prefix.is_empty() || file.command_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "command_prefix must be non-empty and contain no whitespace".into()
            ));
        }
        if !file.max_typing_delay_secs.is_finite() || file.max_typing_delay_secs < 0.0 {
            return Err(ConfigError::Validation("max_typing_delay_secs must be >= 0".into()));
        }

        let speech = file
            .elevenlabs_api_key
            .filter(|k| !k.is_empty())
            .map(|api_key| SpeechConfig {
                api_key,
                voice_id: file
                    .elevenlabs_voice_id
                    .unwrap_or_else(|| tts::DEFAULT_VOICE_ID.to_string()),
            });

        let pacing = Pacing {
            reply_delays: file.reply_delays_secs.into_iter().map(Duration::from_secs).collect(),
            max_typing: Duration::from_secs_f64(file.max_typing_delay_secs),
            ..Pacing::default()
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            owner_id: file.owner_id,
            gemini_api_key: file.gemini_api_key,
            gemini_model: file.gemini_model,
            command_prefix: file.command_prefix,
            data_dir,
            speech,
            pacing,
            command_ack_delay: Duration::from_millis(file.command_ack_delay_ms),
            translate_endpoint: file.translate_endpoint,
        })
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_id == user_id
    }
}
