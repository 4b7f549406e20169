//! Text-to-speech using ElevenLabs.
//!
//! Audio comes back as MP3 and is converted to OGG Opus with `ffmpeg`, which
//! Telegram needs for voice messages. The result is a temp file owned by the
//! caller.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io";
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const MODEL_ID: &str = "eleven_multilingual_v2";

static NEXT_FILE: AtomicU64 = AtomicU64::new(0);

/// Turns text into a voice file on disk.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns the path of an OGG Opus file. The caller deletes it.
    async fn synthesize(&self, text: &str) -> Result<PathBuf, String>;
}

/// TTS client for the ElevenLabs API.
pub struct ElevenLabsClient {
    api_key: String,
    voice_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl ElevenLabsClient {
    pub fn new(api_key: String, voice_id: String) -> Self {
        Self::with_base_url(api_key, voice_id, DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, voice_id: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            voice_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn fetch_mp3(&self, text: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .post(format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&serde_json::json!({
                "text": text,
                "model_id": MODEL_ID,
            }))
            .send()
            .await
            .map_err(|e| format!("TTS request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("TTS error {}: {}", status, body));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read TTS response: {e}"))?;
        Ok(data.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<PathBuf, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("Nothing to synthesize".to_string());
        }

        let preview: String = text.chars().take(50).collect();
        info!("TTS: \"{}\"", preview);

        let mp3 = self.fetch_mp3(text).await?;
        debug!("Got {} bytes of MP3 audio", mp3.len());

        let (input_path, output_path) = temp_paths();
        tokio::fs::write(&input_path, &mp3)
            .await
            .map_err(|e| format!("Failed to write temp MP3: {e}"))?;

        let result = convert_to_ogg(&input_path, &output_path).await;
        let _ = tokio::fs::remove_file(&input_path).await;

        match result {
            Ok(()) => {
                info!("Generated voice file {:?}", output_path);
                Ok(output_path)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&output_path).await;
                Err(e)
            }
        }
    }
}

fn temp_paths() -> (PathBuf, PathBuf) {
    let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
    let stem = format!("gchat_tts_{}_{}", std::process::id(), n);
    let dir = std::env::temp_dir();
    (dir.join(format!("{stem}.mp3")), dir.join(format!("{stem}.ogg")))
}

/// Convert audio to OGG Opus for Telegram voice messages.
async fn convert_to_ogg(input: &Path, output: &Path) -> Result<(), String> {
    let out = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-c:a", "libopus", "-b:a", "64k"])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("Failed to run ffmpeg: {e}"))?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(format!("ffmpeg conversion failed: {}", stderr));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_paths_are_unique() {
        let (a_in, a_out) = temp_paths();
        let (b_in, b_out) = temp_paths();
        assert_ne!(a_in, b_in);
        assert_ne!(a_out, b_out);
        assert_eq!(a_out.extension().unwrap(), "ogg");
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let client = ElevenLabsClient::new("key".into(), DEFAULT_VOICE_ID.into());
        let err = client.synthesize("   ").await.unwrap_err();
        assert!(err.contains("Nothing"));
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/text-to-speech/voice")
            .match_header("xi-api-key", "key")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let client = ElevenLabsClient::with_base_url("key".into(), "voice".into(), server.url());
        let err = client.synthesize("hello").await.unwrap_err();
        assert!(err.contains("401"));
        assert!(err.contains("invalid api key"));
    }
}
