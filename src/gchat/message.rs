//! Inbound private messages handled by the auto-responder.

/// Display name used when the sender has none.
const FALLBACK_SPEAKER: &str = "User";

/// A private text message from someone other than the operator.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub text: String,
}

impl IncomingMessage {
    /// Name the message is attributed to in the transcript.
    pub fn speaker(&self) -> &str {
        let name = self.first_name.trim();
        if name.is_empty() { FALLBACK_SPEAKER } else { name }
    }
}
