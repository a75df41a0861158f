//! Storage traits for summarization persistence

use async_trait::async_trait;

use crate::config::SummarizationConfig;
use crate::error::Result;
use crate::message::ConversationId;
use crate::state::SummarizationState;

/// Keyed store for per-conversation summarization state.
///
/// Built-in backends: `InMemoryStore`, `FileStore`, and `SqliteStore`.
/// `save_state` must replace the whole record in one step; callers rely on
/// the three state fields never being persisted separately.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load a conversation's state. Returns `None` if it was never saved.
    async fn load_state(&self, conversation_id: &ConversationId)
    -> Result<Option<SummarizationState>>;
    /// Persist the complete state for a conversation.
    async fn save_state(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) -> Result<()>;
    /// Remove a conversation's persisted state.
    async fn delete_state(&self, conversation_id: &ConversationId) -> Result<()>;
    /// List all conversations with persisted state.
    async fn list_conversations(&self) -> Result<Vec<ConversationId>>;
}

/// Installation-wide settings store.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_config(&self) -> Result<Option<SummarizationConfig>>;
    async fn save_config(&self, config: &SummarizationConfig) -> Result<()>;
}
