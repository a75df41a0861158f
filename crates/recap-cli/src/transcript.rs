//! JSON transcripts and the chat host that replays them

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use recap::{ChatHost, ConversationId, Message};

/// A conversation exported from a chat application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript {}", path.display()))?;
        let transcript: Transcript = serde_json::from_str(&content)
            .with_context(|| format!("Invalid transcript {}", path.display()))?;
        Ok(transcript)
    }
}

/// Host with a single open conversation whose messages are fed in by the caller.
pub struct TranscriptHost {
    conversation_id: ConversationId,
    messages: RwLock<Vec<Message>>,
}

impl TranscriptHost {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            messages: RwLock::new(Vec::new()),
        }
    }

    pub fn with_messages(conversation_id: ConversationId, messages: Vec<Message>) -> Self {
        Self {
            conversation_id,
            messages: RwLock::new(messages),
        }
    }

    pub fn push(&self, message: Message) {
        self.messages.write().push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }
}

impl From<Transcript> for TranscriptHost {
    fn from(transcript: Transcript) -> Self {
        Self::with_messages(transcript.conversation_id, transcript.messages)
    }
}

#[async_trait]
impl ChatHost for TranscriptHost {
    async fn active_conversation_id(&self) -> Option<ConversationId> {
        Some(self.conversation_id.clone())
    }

    async fn live_messages(&self) -> Vec<Message> {
        self.messages.read().clone()
    }
}
