//! Auto-responder: answers private messages with the language model.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use teloxide::utils::html;
use tracing::{debug, error, info};

use crate::gchat::GchatError;
use crate::gchat::context::GchatContext;
use crate::gchat::conversation::Transcript;
use crate::gchat::gemini::LanguageModel;
use crate::gchat::message::IncomingMessage;
use crate::gchat::telegram::Messenger;
use crate::gchat::tts::SpeechSynthesizer;

/// A model reply starting with this is spoken instead of written.
pub const VOICE_TRIGGER: &str = ".el";

/// Human-looking reply timing.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Candidate delays before typing starts, one picked at random.
    pub reply_delays: Vec<Duration>,
    /// Typing time per character of the incoming message.
    pub typing_per_char: Duration,
    pub max_typing: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            reply_delays: [5, 10, 12].into_iter().map(Duration::from_secs).collect(),
            typing_per_char: Duration::from_millis(100),
            max_typing: Duration::from_secs(5),
        }
    }
}

impl Pacing {
    /// No delays at all.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            reply_delays: Vec::new(),
            typing_per_char: Duration::ZERO,
            max_typing: Duration::ZERO,
        }
    }

    fn reply_delay(&self) -> Duration {
        self.reply_delays
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
    }

    fn typing_delay(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u32;
        self.typing_per_char.saturating_mul(chars).min(self.max_typing)
    }
}

/// What the responder did with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Sender is not allowed auto-responses.
    Ignored,
    Text(String),
    Voice,
}

pub struct Responder {
    ctx: Arc<GchatContext>,
    model: Arc<dyn LanguageModel>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    messenger: Arc<dyn Messenger>,
    pacing: Pacing,
    operator_chat_id: i64,
}

impl Responder {
    pub fn new(
        ctx: Arc<GchatContext>,
        model: Arc<dyn LanguageModel>,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
        messenger: Arc<dyn Messenger>,
        pacing: Pacing,
        operator_chat_id: i64,
    ) -> Self {
        Self {
            ctx,
            model,
            speech,
            messenger,
            pacing,
            operator_chat_id,
        }
    }

    /// Handle a message, reporting any failure to the operator only.
    pub async fn on_message(&self, msg: IncomingMessage) {
        match self.handle(&msg).await {
            Ok(Reply::Ignored) => {}
            Ok(Reply::Text(text)) => {
                info!("💬 Replied to {} ({}): {} chars", msg.speaker(), msg.user_id, text.len());
            }
            Ok(Reply::Voice) => info!("🔊 Voice reply to {} ({})", msg.speaker(), msg.user_id),
            Err(e) => {
                error!("gchat failed for {}: {}", msg.user_id, e);
                let notice = match e {
                    GchatError::Speech(_) => format!("Error: {}", html::escape(&e.to_string())),
                    _ => format!(
                        "An error occurred in the <code>gchat</code> module:\n\n{}",
                        html::escape(&e.to_string())
                    ),
                };
                if let Err(e) = self.messenger.send_message(self.operator_chat_id, &notice, None).await {
                    error!("Failed to notify operator: {}", e);
                }
            }
        }
    }

    /// Decide whether to answer `msg` and, if so, generate and deliver a reply.
    pub async fn handle(&self, msg: &IncomingMessage) -> Result<Reply, GchatError> {
        if !self.ctx.allows(msg.user_id).await {
            debug!("gchat not enabled for {} (msg {})", msg.user_id, msg.message_id);
            return Ok(Reply::Ignored);
        }

        let store = self.ctx.store();
        let text = msg.text.trim();

        let mut transcript = Transcript::load(store, msg.user_id)?;
        transcript.push_user(msg.speaker(), text);
        transcript.save(store)?;

        tokio::time::sleep(self.pacing.reply_delay()).await;
        self.messenger
            .send_typing(msg.chat_id)
            .await
            .map_err(GchatError::Telegram)?;
        tokio::time::sleep(self.pacing.typing_delay(text)).await;

        let reply = self.model.generate(&transcript.prompt()).await?;

        transcript.push_reply(&reply);
        transcript.save(store)?;

        if let Some(spoken) = reply.strip_prefix(VOICE_TRIGGER) {
            self.send_voice(msg.chat_id, spoken).await?;
            return Ok(Reply::Voice);
        }

        self.messenger
            .send_message(msg.chat_id, &html::escape(&reply), None)
            .await
            .map_err(GchatError::Telegram)?;
        Ok(Reply::Text(reply))
    }

    async fn send_voice(&self, chat_id: i64, text: &str) -> Result<(), GchatError> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| GchatError::Speech("speech synthesis is not configured".to_string()))?;

        let path = speech.synthesize(text).await.map_err(GchatError::Speech)?;
        let sent = self.messenger.send_voice(chat_id, &path, None).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!("Could not remove {:?}: {}", path, e);
        }
        sent.map_err(GchatError::Speech)?;
        Ok(())
    }
}
