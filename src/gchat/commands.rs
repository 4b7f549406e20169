//! Operator commands: `gchat on|off|del|all`, `role`, `help`.
//!
//! Each acknowledgment is shown briefly, then both the command and the
//! acknowledgment are deleted to keep the chat clean.

use std::sync::Arc;
use std::time::Duration;

use teloxide::utils::html;
use tracing::{error, info, warn};

use crate::command::CommandMessage;
use crate::gchat::GchatError;
use crate::gchat::context::GchatContext;
use crate::gchat::conversation;
use crate::gchat::telegram::Messenger;

/// `gchat` subcommands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GchatCommand {
    On,
    Off,
    Delete,
    All,
}

impl GchatCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "del" => Some(Self::Delete),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Split a leading `#<user id>` target off `args`.
///
/// Commands act on the current chat unless a target is given, which lets the
/// operator manage users from their own chat with the bot.
pub fn split_target(args: &str) -> (Option<i64>, &str) {
    let args = args.trim();
    let (first, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    match first.strip_prefix('#').and_then(|id| id.parse::<i64>().ok()) {
        Some(id) => (Some(id), rest.trim()),
        None => (None, args),
    }
}

/// Help entries as `(usage, description)`.
pub const HELP: &[(&str, &str)] = &[
    ("gchat on", "Enable gchat for the current user in the chat."),
    ("gchat off", "Disable gchat for the current user in the chat."),
    ("gchat del", "Delete the chat history for the current user."),
    ("gchat all", "Toggle gchat for all users globally."),
    ("role <custom role>", "Set a custom role for the bot and clear existing chat history."),
    ("gtr <target_language> <text>", "Translate the provided text to the specified language."),
];

pub fn help_text(prefix: &str) -> String {
    let mut text = String::from("<b>Commands</b>\n");
    for (usage, description) in HELP {
        text.push_str(&format!(
            "\n<code>{}{}</code>: {}",
            prefix,
            html::escape(usage),
            description
        ));
    }
    text.push_str(&format!(
        "\n\n<code>gchat</code> and <code>role</code> accept <code>#user_id</code> to target another chat, \
         e.g. <code>{prefix}gchat on #123456</code>."
    ));
    text
}

pub struct Commands {
    ctx: Arc<GchatContext>,
    messenger: Arc<dyn Messenger>,
    prefix: String,
    ack_delay: Duration,
    operator_chat_id: i64,
}

impl Commands {
    pub fn new(
        ctx: Arc<GchatContext>,
        messenger: Arc<dyn Messenger>,
        prefix: String,
        ack_delay: Duration,
        operator_chat_id: i64,
    ) -> Self {
        Self {
            ctx,
            messenger,
            prefix,
            ack_delay,
            operator_chat_id,
        }
    }

    pub async fn on_gchat(&self, msg: CommandMessage) {
        if let Err(e) = self.gchat(&msg).await {
            self.report("gchat", e).await;
        }
    }

    pub async fn on_role(&self, msg: CommandMessage) {
        if let Err(e) = self.role(&msg).await {
            self.report("role", e).await;
        }
    }

    pub async fn on_help(&self, msg: CommandMessage) {
        if let Err(e) = self.help(&msg).await {
            self.report("help", e).await;
        }
    }

    async fn report(&self, command: &str, e: GchatError) {
        error!("{} command failed: {}", command, e);
        let notice = format!(
            "An error occurred in the <code>{}</code> command:\n\n{}",
            command,
            html::escape(&e.to_string())
        );
        if let Err(e) = self.messenger.send_message(self.operator_chat_id, &notice, None).await {
            error!("Failed to notify operator: {}", e);
        }
    }

    /// `gchat <on|off|del|all> [#user_id]`
    pub async fn gchat(&self, msg: &CommandMessage) -> Result<(), GchatError> {
        let (sub, rest) = msg.args.split_once(char::is_whitespace).unwrap_or((msg.args.as_str(), ""));
        let (target, _) = split_target(rest);
        let user_id = target.unwrap_or(msg.chat_id);

        let ack = match GchatCommand::parse(sub) {
            Some(GchatCommand::On) => {
                self.ctx.enable(user_id).await?;
                info!("gchat enabled for {user_id}");
                "<b>gchat is enabled.</b>".to_string()
            }
            Some(GchatCommand::Off) => {
                self.ctx.disable(user_id).await?;
                info!("gchat disabled for {user_id}");
                "<b>gchat is disabled.</b>".to_string()
            }
            Some(GchatCommand::Delete) => {
                conversation::clear_history(self.ctx.store(), user_id)?;
                info!("Chat history deleted for {user_id}");
                "<b>Chat history deleted.</b>".to_string()
            }
            Some(GchatCommand::All) => {
                let for_all = self.ctx.toggle_all().await?;
                info!("gchat_for_all = {for_all}");
                format!(
                    "gchat is now {} for all users.",
                    if for_all { "enabled" } else { "disabled" }
                )
            }
            None => format!(
                "Usage: <code>{}gchat</code> <code>on</code>, <code>off</code>, <code>del</code>, or <code>all</code>.",
                self.prefix
            ),
        };

        self.acknowledge(msg, &ack).await
    }

    /// `role [#user_id] [text]`; empty text restores the default persona.
    pub async fn role(&self, msg: &CommandMessage) -> Result<(), GchatError> {
        let (target, role) = split_target(&msg.args);
        let user_id = target.unwrap_or(msg.chat_id);

        let ack = if role.is_empty() {
            conversation::set_role(self.ctx.store(), user_id, None)?;
            "Role reset to default.".to_string()
        } else {
            conversation::set_role(self.ctx.store(), user_id, Some(role))?;
            format!("Role set successfully!\n<b>New Role:</b> {}", html::escape(role))
        };

        self.acknowledge(msg, &ack).await
    }

    pub async fn help(&self, msg: &CommandMessage) -> Result<(), GchatError> {
        self.messenger
            .send_message(msg.chat_id, &help_text(&self.prefix), Some(msg.message_id))
            .await
            .map_err(GchatError::Telegram)?;
        Ok(())
    }

    async fn acknowledge(&self, msg: &CommandMessage, text: &str) -> Result<(), GchatError> {
        let ack_id = self
            .messenger
            .send_message(msg.chat_id, text, None)
            .await
            .map_err(GchatError::Telegram)?;

        tokio::time::sleep(self.ack_delay).await;

        if let Err(e) = self.messenger.delete_message(msg.chat_id, msg.message_id).await {
            warn!("Could not delete command {} in {}: {}", msg.message_id, msg.chat_id, e);
        }
        self.messenger
            .delete_message(msg.chat_id, ack_id)
            .await
            .map_err(GchatError::Telegram)?;
        Ok(())
    }
}
