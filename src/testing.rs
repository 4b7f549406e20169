//! Recording fakes of the outbound collaborators.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use crate::gchat::gemini::{LanguageModel, ModelError};
use crate::gchat::telegram::Messenger;
use crate::gchat::tts::SpeechSynthesizer;

/// One recorded Telegram call.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message { chat_id: i64, text: String, reply_to: Option<i64> },
    Voice { chat_id: i64, path: PathBuf },
    Typing { chat_id: i64 },
    Edit { chat_id: i64, message_id: i64, text: String },
    Delete { chat_id: i64, message_id: i64 },
}

/// Messenger that records every call and hands out increasing message ids.
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    /// Whether voice files existed at the moment they were sent.
    voice_files_existed: Mutex<Vec<bool>>,
    /// Message ids whose deletion is rejected.
    undeletable: Vec<i64>,
    reject_edits: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            voice_files_existed: Mutex::new(Vec::new()),
            undeletable: Vec::new(),
            reject_edits: false,
        }
    }

    /// Reject deleting `message_id`, like a group where the bot is no admin.
    pub fn refusing_delete_of(message_id: i64) -> Self {
        Self {
            undeletable: vec![message_id],
            ..Self::new()
        }
    }

    /// Reject every edit, like a text over Telegram's length limit.
    pub fn refusing_edits() -> Self {
        Self {
            reject_edits: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Text of every message sent to `chat_id`.
    pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { chat_id: c, text, .. } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn voices(&self) -> Vec<PathBuf> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Voice { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn voice_files_existed(&self) -> Vec<bool> {
        self.voice_files_existed.lock().unwrap().clone()
    }

    fn record(&self, sent: Sent) -> i64 {
        self.sent.lock().unwrap().push(sent);
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, String> {
        Ok(self.record(Sent::Message {
            chat_id,
            text: text.to_string(),
            reply_to,
        }))
    }

    async fn send_voice(&self, chat_id: i64, path: &Path, _reply_to: Option<i64>) -> Result<i64, String> {
        self.voice_files_existed.lock().unwrap().push(path.exists());
        Ok(self.record(Sent::Voice {
            chat_id,
            path: path.to_path_buf(),
        }))
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), String> {
        self.record(Sent::Typing { chat_id });
        Ok(())
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        if self.reject_edits {
            return Err("Failed to edit message: MESSAGE_TOO_LONG".to_string());
        }
        self.record(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        if self.undeletable.contains(&message_id) {
            return Err("Failed to delete message: not enough rights".to_string());
        }
        self.record(Sent::Delete { chat_id, message_id });
        Ok(())
    }
}

/// Model that returns scripted replies in order and records prompts.
pub struct ScriptedModel {
    replies: Mutex<Vec<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, ModelError>>) -> Self {
        let mut replies = replies;
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop().unwrap_or(Err(ModelError::Empty))
    }
}

/// Speech fake writing a small file into a temp dir, or failing.
pub struct FakeSpeech {
    dir: tempfile::TempDir,
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn working() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            fail: false,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<PathBuf, String> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err("quota exceeded".to_string());
        }
        let n = self.texts.lock().unwrap().len();
        let path = self.dir.path().join(format!("voice_{n}.ogg"));
        std::fs::write(&path, b"OggS").map_err(|e| e.to_string())?;
        Ok(path)
    }
}
