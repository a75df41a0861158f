//! Chat message types as seen by the summarization core

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable key of a message inside one conversation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity of one chat session, as assigned by the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Namespace for keys derived from message content when the host assigns no id.
const DERIVED_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_0c3e_52d4_4b8e_9a77_21c0_5e3d_b914);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub speaker_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn user(speaker_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            is_user: true,
            is_system: false,
            speaker_name: speaker_name.into(),
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn assistant(speaker_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            is_user: false,
            is_system: false,
            speaker_name: speaker_name.into(),
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: None,
            is_user: false,
            is_system: true,
            speaker_name: "System".to_string(),
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = sent_at;
        self
    }

    /// Key used for summarized-id bookkeeping.
    ///
    /// The host-assigned id when present. Otherwise a name-based UUID over
    /// speaker, text and send time, so the same message maps to the same key
    /// across reloads. Editing such a message changes its key.
    pub fn key(&self) -> MessageId {
        match &self.id {
            Some(id) => id.clone(),
            None => {
                let material = format!(
                    "{}\u{1f}{}\u{1f}{}",
                    self.speaker_name,
                    self.sent_at.to_rfc3339(),
                    self.text
                );
                MessageId(format!(
                    "derived-{}",
                    Uuid::new_v5(&DERIVED_KEY_NAMESPACE, material.as_bytes())
                ))
            }
        }
    }

    pub fn has_stable_id(&self) -> bool {
        self.id.is_some()
    }

    /// Speaker label used when rendering the message into a prompt.
    pub fn display_speaker(&self) -> &str {
        if !self.speaker_name.is_empty() {
            &self.speaker_name
        } else if self.is_system {
            "System"
        } else if self.is_user {
            "User"
        } else {
            "Assistant"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_key_prefers_host_id() {
        let msg = Message::user("Ann", "hello").with_id("m-1");
        assert_eq!(msg.key(), MessageId::new("m-1"));
        assert!(msg.has_stable_id());
    }

    #[test]
    fn test_derived_key_is_stable() {
        let a = Message::user("Ann", "hello").with_sent_at(at(10));
        let b = Message::user("Ann", "hello").with_sent_at(at(10));
        assert_eq!(a.key(), b.key());
        assert!(a.key().as_str().starts_with("derived-"));
    }

    #[test]
    fn test_derived_key_changes_with_content_or_time() {
        let base = Message::user("Ann", "hello").with_sent_at(at(10));
        let edited = Message::user("Ann", "hello!").with_sent_at(at(10));
        let later = Message::user("Ann", "hello").with_sent_at(at(11));
        assert_ne!(base.key(), edited.key());
        assert_ne!(base.key(), later.key());
    }

    #[test]
    fn test_display_speaker_fallbacks() {
        let mut msg = Message::assistant("", "hi");
        assert_eq!(msg.display_speaker(), "Assistant");
        msg.is_user = true;
        assert_eq!(msg.display_speaker(), "User");
        assert_eq!(Message::system("rules").display_speaker(), "System");
        assert_eq!(Message::user("Ann", "x").display_speaker(), "Ann");
    }

    #[test]
    fn test_message_deserialize_defaults() {
        let json = r#"{"text": "hi", "sent_at": "2024-01-01T00:00:00Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.id.is_none());
        assert!(!msg.is_user);
        assert!(!msg.is_system);
        assert_eq!(msg.speaker_name, "");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = MessageId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let conv: ConversationId = serde_json::from_str("\"chat-1\"").unwrap();
        assert_eq!(conv.as_str(), "chat-1");
    }
}
