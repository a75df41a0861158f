use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use recap_core::{
    ConfigStore, ConversationId, Result, StateStore, SummarizationConfig, SummarizationState,
};

/// Process-local store. Clones share the same maps.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    states: Arc<RwLock<HashMap<ConversationId, SummarizationState>>>,
    config: Arc<RwLock<Option<SummarizationConfig>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn load_state(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<SummarizationState>> {
        Ok(self.states.read().get(conversation_id).cloned())
    }

    async fn save_state(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) -> Result<()> {
        self.states
            .write()
            .insert(conversation_id.clone(), state.clone());
        Ok(())
    }

    async fn delete_state(&self, conversation_id: &ConversationId) -> Result<()> {
        self.states.write().remove(conversation_id);
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationId>> {
        let mut ids: Vec<ConversationId> = self.states.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ConfigStore for InMemoryStore {
    async fn load_config(&self) -> Result<Option<SummarizationConfig>> {
        Ok(self.config.read().clone())
    }

    async fn save_config(&self, config: &SummarizationConfig) -> Result<()> {
        *self.config.write() = Some(config.clone());
        Ok(())
    }
}
