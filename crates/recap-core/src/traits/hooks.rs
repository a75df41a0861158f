//! Observer hooks for summarization lifecycle events

use async_trait::async_trait;

use crate::error::SummarizationError;
use crate::message::{ConversationId, Message, MessageId};
use crate::state::{SummarizationState, SummaryRecord};

/// Presentation adapters and loggers subscribe here. Every method defaults to a no-op.
#[async_trait]
pub trait SummaryHooks: Send + Sync {
    async fn on_conversation_loaded(
        &self,
        _conversation_id: &ConversationId,
        _state: &SummarizationState,
    ) {
    }

    async fn on_summarize_start(&self, _conversation_id: &ConversationId, _batch: &[Message]) {}

    async fn on_summarized(
        &self,
        _conversation_id: &ConversationId,
        _record: &SummaryRecord,
        _summarized_ids: &[MessageId],
    ) {
    }

    async fn on_summarize_failed(
        &self,
        _conversation_id: &ConversationId,
        _error: &SummarizationError,
    ) {
    }

    async fn on_cleared(&self, _conversation_id: &ConversationId) {}

    /// The host switched away from this conversation; its controller is gone.
    async fn on_conversation_detached(&self, _conversation_id: &ConversationId) {}

    async fn on_persistence_failure(
        &self,
        _conversation_id: &ConversationId,
        _error: &SummarizationError,
    ) {
    }
}
