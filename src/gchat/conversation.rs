//! Personas and per-user transcripts.
//!
//! The model keeps no memory between calls, so the whole transcript is the
//! prompt. Its first line is always the persona the transcript was started
//! under; changing the persona therefore clears the transcript.

use serde_json::Value;
use tracing::{debug, info};

use crate::gchat::access::COLLECTION;
use crate::gchat::store::{self, Store, StoreError};

/// Persona used when no custom role is set.
pub const DEFAULT_ROLE: &str = "You are Jake, a 20-year-old boy from Newport Beach, California. \
You want to know more about people. You are caring, deep, and intelligent. You are a human, \
and your responses should never make anyone suspect that you are an AI. Write short, casual \
messages like a real human, your responses should be a maximum of one or two lines. \
Rarely use emojis.";

fn role_key(user_id: i64) -> String {
    format!("custom_roles.{user_id}")
}

fn history_key(user_id: i64) -> String {
    format!("chat_history.{user_id}")
}

/// The persona for `user_id`, falling back to [`DEFAULT_ROLE`].
pub fn load_role(store: &dyn Store, user_id: i64) -> Result<String, StoreError> {
    let role: Option<String> = store::load(store, COLLECTION, &role_key(user_id))?;
    Ok(role.filter(|r| !r.is_empty()).unwrap_or_else(|| DEFAULT_ROLE.to_string()))
}

/// Set the persona for `user_id` and clear the transcript.
///
/// `None` stores the default persona.
pub fn set_role(store: &dyn Store, user_id: i64, role: Option<&str>) -> Result<(), StoreError> {
    let role = role.unwrap_or(DEFAULT_ROLE);
    store::save(store, COLLECTION, &role_key(user_id), role)?;
    clear_history(store, user_id)?;
    info!("Role updated for {user_id}");
    Ok(())
}

/// Drop the stored transcript for `user_id`.
pub fn clear_history(store: &dyn Store, user_id: i64) -> Result<(), StoreError> {
    store.set(COLLECTION, &history_key(user_id), Value::Null)
}

/// One user's conversation log.
#[derive(Debug, Clone)]
pub struct Transcript {
    user_id: i64,
    lines: Vec<String>,
}

impl Transcript {
    /// Load the transcript, seeding it with the persona line when absent.
    pub fn load(store: &dyn Store, user_id: i64) -> Result<Self, StoreError> {
        let stored: Option<Vec<String>> = store::load(store, COLLECTION, &history_key(user_id))?;
        let lines = match stored {
            Some(lines) if !lines.is_empty() => lines,
            _ => {
                let role = load_role(store, user_id)?;
                debug!("Starting new transcript for {user_id}");
                vec![format!("Role: {role}")]
            }
        };
        Ok(Self { user_id, lines })
    }

    /// Append a user turn as `"{speaker}: {text}"`.
    pub fn push_user(&mut self, speaker: &str, text: &str) {
        self.lines.push(format!("{speaker}: {text}"));
    }

    /// Append a model turn verbatim.
    pub fn push_reply(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    pub fn save(&self, store: &dyn Store) -> Result<(), StoreError> {
        store::save(store, COLLECTION, &history_key(self.user_id), &self.lines)
    }

    /// The full prompt sent to the model.
    pub fn prompt(&self) -> String {
        self.lines.join("\n")
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
