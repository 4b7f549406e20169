//! Gemini API client for chat completions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Categories whose filtering is switched off.
const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

#[derive(Debug)]
pub enum ModelError {
    Http(String),
    Api(String),
    Parse(String),
    Blocked(String),
    Empty,
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::Http(e) => write!(f, "HTTP error: {e}"),
            ModelError::Api(e) => write!(f, "API error: {e}"),
            ModelError::Parse(e) => write!(f, "Parse error: {e}"),
            ModelError::Blocked(reason) => write!(f, "Prompt blocked: {reason}"),
            ModelError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for ModelError {}

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn request_for(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        info!("🧠 Gemini prompt: {} lines, {} chars", prompt.lines().count(), prompt.len());

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_for(prompt))
            .send()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Http(format!("Failed to read response: {e}")))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::Parse(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ModelError::Api(error.message));
        }

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ModelError::Blocked(reason));
        }

        let text: String = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ModelError::Empty);
        }

        info!("🧠 Gemini reply: {} chars", text.len());
        Ok(text.to_string())
    }
}
