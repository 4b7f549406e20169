//! `gtr`: translate text through the public Google translate endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use teloxide::utils::html;
use tracing::{info, warn};

use crate::command::CommandMessage;
use crate::gchat::telegram::Messenger;

pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_a/single";
pub const DEFAULT_TARGET_LANG: &str = "en";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

pub const PLACEHOLDER: &str = "Translating...";
pub const NO_TEXT: &str = "No text found to translate.";

#[derive(Debug)]
pub enum TranslateError {
    Http(String),
    Status(reqwest::StatusCode),
    Parse(String),
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::Http(e) => write!(f, "HTTP error: {e}"),
            TranslateError::Status(status) => write!(f, "Failed to fetch translation ({status})."),
            TranslateError::Parse(e) => write!(f, "Unexpected response: {e}"),
        }
    }
}

impl std::error::Error for TranslateError {}

pub struct TranslateClient {
    endpoint: String,
    client: reqwest::Client,
}

impl TranslateClient {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self { endpoint, client }
    }

    /// Translate `text` into `target_lang`, detecting the source language.
    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::Http(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TranslateError::Status(status));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;

        join_fragments(&data)
    }
}

/// Concatenate the translated fragments of a `translate_a/single` response.
///
/// The response looks like `[[["Hola", "Hello", ...], ["mundo", "world", ...]], ...]`.
pub fn join_fragments(data: &Value) -> Result<String, TranslateError> {
    let sentences = data
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Parse("missing sentence list".to_string()))?;

    Ok(sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect())
}

/// What a `gtr` invocation asks for.
#[derive(Debug, PartialEq)]
pub enum Request {
    Translate { lang: String, text: String },
    /// No arguments and nothing replied to.
    Usage,
    /// A language but no text from either source.
    NoText,
}

/// Interpret `gtr [lang] [text]`, falling back to the replied-to text.
pub fn parse_request(args: &str, reply_text: Option<&str>) -> Request {
    let args = args.trim();
    let reply_text = reply_text.map(str::trim).filter(|t| !t.is_empty());

    if args.is_empty() && reply_text.is_none() {
        return Request::Usage;
    }

    let (lang, inline) = match args.split_once(char::is_whitespace) {
        Some((lang, rest)) => (lang, rest.trim()),
        None if args.is_empty() => (DEFAULT_TARGET_LANG, ""),
        None => (args, ""),
    };

    let text = if inline.is_empty() {
        reply_text.unwrap_or_default()
    } else {
        inline
    };

    if text.is_empty() {
        return Request::NoText;
    }

    Request::Translate {
        lang: lang.to_string(),
        text: text.to_string(),
    }
}

pub fn usage(prefix: &str) -> String {
    format!(
        "Usage: <code>{prefix}gtr &lt;target_language&gt; &lt;text&gt;</code>\n\
         Or reply to a message with <code>{prefix}gtr &lt;target_language&gt;</code> to translate it.\n\
         Example: <code>{prefix}gtr es Hello</code> (translates 'Hello' to Spanish)."
    )
}

/// Result of one `gtr` invocation, as shown to the requester.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Usage,
    NoText,
    Translated(String),
    Failed(String),
}

pub struct Translator {
    client: TranslateClient,
    messenger: Arc<dyn Messenger>,
    prefix: String,
}

impl Translator {
    pub fn new(client: TranslateClient, messenger: Arc<dyn Messenger>, prefix: String) -> Self {
        Self {
            client,
            messenger,
            prefix,
        }
    }

    pub async fn on_command(&self, msg: CommandMessage) {
        match self.handle(&msg).await {
            Ok(outcome) => info!("gtr in chat {}: {:?}", msg.chat_id, outcome),
            Err(e) => warn!("gtr in chat {} failed: {}", msg.chat_id, e),
        }
    }

    /// Run `gtr`. `Err` only when Telegram itself fails.
    pub async fn handle(&self, msg: &CommandMessage) -> Result<Outcome, String> {
        let (lang, text) = match parse_request(&msg.args, msg.reply_text.as_deref()) {
            Request::Usage => {
                self.messenger
                    .send_message(msg.chat_id, &usage(&self.prefix), Some(msg.message_id))
                    .await?;
                return Ok(Outcome::Usage);
            }
            Request::NoText => {
                self.messenger
                    .send_message(msg.chat_id, NO_TEXT, Some(msg.message_id))
                    .await?;
                return Ok(Outcome::NoText);
            }
            Request::Translate { lang, text } => (lang, text),
        };

        let placeholder = self
            .messenger
            .send_message(msg.chat_id, PLACEHOLDER, Some(msg.message_id))
            .await?;

        let (body, outcome) = match self.client.translate(&text, &lang).await {
            Ok(translated) => (
                format!(
                    "<b>Translated Text ({}):</b>\n{}",
                    html::escape(&lang.to_uppercase()),
                    html::escape(&translated)
                ),
                Outcome::Translated(translated),
            ),
            Err(e) => {
                warn!("Translation failed: {e}");
                let reason = e.to_string();
                (
                    format!("Failed to translate the text: {}", html::escape(&reason)),
                    Outcome::Failed(reason),
                )
            }
        };

        if let Err(e) = self.messenger.edit_message(msg.chat_id, placeholder, &body).await {
            warn!("Could not edit gtr placeholder {placeholder}: {e}");
            self.messenger
                .send_message(
                    msg.chat_id,
                    &format!("Failed to translate the text: {}", html::escape(&e)),
                    Some(msg.message_id),
                )
                .await?;
            return Ok(Outcome::Failed(e));
        }
        Ok(outcome)
    }
}
