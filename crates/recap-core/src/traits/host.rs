//! Host chat application trait

use async_trait::async_trait;

use crate::message::{ConversationId, Message};

/// The live chat application the summarizer is attached to.
#[async_trait]
pub trait ChatHost: Send + Sync {
    /// `None` while no conversation is open.
    async fn active_conversation_id(&self) -> Option<ConversationId>;

    /// Messages of the active conversation in chronological order.
    async fn live_messages(&self) -> Vec<Message>;
}
