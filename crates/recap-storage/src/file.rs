use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use recap_core::{
    ConfigStore, ConversationId, Result, StateStore, SummarizationConfig, SummarizationState,
};

const CONFIG_FILE: &str = "config.yaml";

/// One pretty-printed JSON file per conversation, plus `config.yaml` for settings.
///
/// Conversation ids are percent-encoded into file names so any host id is
/// safe on disk and `list_conversations` can recover it.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn state_path(&self, conversation_id: &ConversationId) -> PathBuf {
        self.base_path
            .join(format!("{}.json", encode_file_stem(conversation_id.as_str())))
    }

    fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE)
    }

    /// Writes next to the target and renames over it, so readers never see a partial file.
    async fn write_replace(&self, path: &Path, contents: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let tmp = self.base_path.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, contents).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load_state(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<SummarizationState>> {
        let path = self.state_path(conversation_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(path).await?;
        let state = serde_json::from_str(&json)?;
        Ok(Some(state))
    }

    async fn save_state(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) -> Result<()> {
        let path = self.state_path(conversation_id);
        let json = to_json(state)?;
        self.write_replace(&path, json).await?;
        debug!(conversation = %conversation_id, path = %path.display(), "Saved summarization state");
        Ok(())
    }

    async fn delete_state(&self, conversation_id: &ConversationId) -> Result<()> {
        let path = self.state_path(conversation_id);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationId>> {
        let mut conversations = Vec::new();
        if !self.base_path.exists() {
            return Ok(conversations);
        }

        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(decode_file_stem)
                {
                    conversations.push(ConversationId::new(id));
                }
            }
        }
        conversations.sort();
        Ok(conversations)
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn load_config(&self) -> Result<Option<SummarizationConfig>> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }
        let yaml = tokio::fs::read_to_string(path).await?;
        let config = serde_yaml::from_str(&yaml)?;
        Ok(Some(config))
    }

    async fn save_config(&self, config: &SummarizationConfig) -> Result<()> {
        let yaml = serde_yaml::to_string(config)?;
        self.write_replace(&self.config_path(), yaml).await
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn encode_file_stem(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
