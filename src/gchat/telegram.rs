//! Telegram client using teloxide.
//!
//! Handlers talk to Telegram through [`Messenger`] so they can be driven by a
//! recording fake in tests. All text is sent with HTML parse mode; callers
//! escape untrusted content.

use std::path::Path;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, MessageId, ParseMode, ReplyParameters};
use tracing::{info, warn};

/// Outbound messaging operations used by the handlers.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message, returning its message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String>;

    /// Send an OGG Opus file as a voice message.
    async fn send_voice(
        &self,
        chat_id: i64,
        path: &Path,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String>;

    /// Show the "typing..." indicator.
    async fn send_typing(&self, chat_id: i64) -> Result<(), String>;

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String>;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn send_voice(
        &self,
        chat_id: i64,
        path: &Path,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        info!("🔊 Sending voice {:?} to chat {}", path, chat_id);

        let mut request = self
            .bot
            .send_voice(ChatId(chat_id), InputFile::file(path.to_path_buf()));

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send voice: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), String> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send typing action: {e}"))
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to edit message: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        info!("🗑️ Deleting message {} in chat {}", message_id, chat_id);

        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id as i32))
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to delete message: {e}");
                warn!("{}", msg);
                msg
            })
    }
}
