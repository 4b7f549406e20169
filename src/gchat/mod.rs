//! gchat - Gemini-driven auto-replies to private messages, and the operator
//! commands that control them.

pub mod access;
pub mod commands;
pub mod context;
pub mod conversation;
pub mod gemini;
pub mod message;
pub mod responder;
pub mod store;
pub mod telegram;
pub mod tts;


use std::fmt;

pub use commands::Commands;
pub use context::GchatContext;
pub use gemini::GeminiClient;
pub use message::IncomingMessage;
pub use responder::{Pacing, Responder};
pub use store::SqliteStore;
pub use telegram::TelegramClient;
pub use tts::ElevenLabsClient;

/// Failures inside a gchat handler. Never shown to the chatting user.
#[derive(Debug)]
pub enum GchatError {
    Store(store::StoreError),
    Model(gemini::ModelError),
    /// Synthesizing or sending a voice reply failed.
    Speech(String),
    Telegram(String),
}

impl fmt::Display for GchatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Model(e) => write!(f, "{e}"),
            Self::Speech(e) => write!(f, "{e}"),
            Self::Telegram(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GchatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Speech(_) | Self::Telegram(_) => None,
        }
    }
}

impl From<store::StoreError> for GchatError {
    fn from(e: store::StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<gemini::ModelError> for GchatError {
    fn from(e: gemini::ModelError) -> Self {
        Self::Model(e)
    }
}
