use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use recap_core::{
    ConversationId, Message, MessageId, SummarizationState, SummaryHooks, SummaryRecord,
};

pub const SUMMARIZED_LABEL: &str = "📝 Summarized";

/// Tracks which messages of the active conversation are folded into a summary.
///
/// Presentation layers register it as a hook and query it when rendering
/// the transcript, e.g. to dim summarized messages and attach a label.
#[derive(Default)]
pub struct SummarizedIndicators {
    inner: RwLock<IndicatorState>,
}

#[derive(Default)]
struct IndicatorState {
    conversation_id: Option<ConversationId>,
    ids: BTreeSet<MessageId>,
}

impl SummarizedIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.read().conversation_id.clone()
    }

    pub fn is_summarized(&self, message: &Message) -> bool {
        self.inner.read().ids.contains(&message.key())
    }

    pub fn label(&self, message: &Message) -> Option<&'static str> {
        self.is_summarized(message).then_some(SUMMARIZED_LABEL)
    }

    pub fn count(&self) -> usize {
        self.inner.read().ids.len()
    }

    /// Summarized flag for each message, in order.
    pub fn annotate(&self, live: &[Message]) -> Vec<bool> {
        let inner = self.inner.read();
        live.iter().map(|m| inner.ids.contains(&m.key())).collect()
    }
}

#[async_trait]
impl SummaryHooks for SummarizedIndicators {
    async fn on_conversation_loaded(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) {
        let mut inner = self.inner.write();
        inner.conversation_id = Some(conversation_id.clone());
        inner.ids = state.summarized_ids.clone();
    }

    async fn on_summarized(
        &self,
        conversation_id: &ConversationId,
        _record: &SummaryRecord,
        summarized_ids: &[MessageId],
    ) {
        let mut inner = self.inner.write();
        if inner.conversation_id.as_ref() != Some(conversation_id) {
            inner.conversation_id = Some(conversation_id.clone());
            inner.ids.clear();
        }
        inner.ids.extend(summarized_ids.iter().cloned());
    }

    async fn on_cleared(&self, conversation_id: &ConversationId) {
        let mut inner = self.inner.write();
        if inner.conversation_id.as_ref() == Some(conversation_id) {
            inner.ids.clear();
        }
    }

    async fn on_conversation_detached(&self, conversation_id: &ConversationId) {
        let mut inner = self.inner.write();
        if inner.conversation_id.as_ref() == Some(conversation_id) {
            inner.conversation_id = None;
            inner.ids.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SessionBuilder;
    use crate::testing::{FakeHost, sized};
    use recap_core::SummarizationConfig;
    use recap_llm::MockBackend;
    use recap_memory::LoggingHooks;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_indicators_follow_session() {
        let host = Arc::new(FakeHost::default());
        let indicators = Arc::new(SummarizedIndicators::new());
        let session = SessionBuilder::new()
            .host(host.clone())
            .backend(Arc::new(MockBackend::default()))
            .hooks(indicators.clone())
            .hooks(Arc::new(LoggingHooks::default()))
            .config(SummarizationConfig::new(700).with_enabled(true))
            .build()
            .await
            .unwrap();

        let live = vec![sized("a", 400), sized("b", 400), sized("c", 10)];
        host.open("chat-1", live.clone());
        session.sync_conversation().await.unwrap();
        assert_eq!(indicators.conversation_id(), Some(ConversationId::new("chat-1")));
        assert_eq!(indicators.count(), 0);

        session.on_message_appended().await.unwrap();
        assert_eq!(indicators.annotate(&live), vec![true, true, false]);
        assert_eq!(indicators.label(&live[0]), Some(SUMMARIZED_LABEL));
        assert_eq!(indicators.label(&live[2]), None);

        session.clear_all().await.unwrap();
        assert_eq!(indicators.count(), 0);
    }

    #[tokio::test]
    async fn test_indicators_reset_when_conversation_closes() {
        let host = Arc::new(FakeHost::default());
        let indicators = Arc::new(SummarizedIndicators::new());
        let session = SessionBuilder::new()
            .host(host.clone())
            .backend(Arc::new(MockBackend::default()))
            .hooks(indicators.clone())
            .config(SummarizationConfig::new(700).with_enabled(true))
            .build()
            .await
            .unwrap();

        let live = vec![sized("a", 400), sized("b", 400)];
        host.open("chat-1", live.clone());
        session.sync_conversation().await.unwrap();
        session.on_message_appended().await.unwrap();
        assert_eq!(indicators.count(), 2);

        host.close();
        assert_eq!(session.sync_conversation().await.unwrap(), None);
        assert_eq!(indicators.conversation_id(), None);
        assert_eq!(indicators.count(), 0);
        assert_eq!(indicators.annotate(&live), vec![false, false]);
    }

    #[tokio::test]
    async fn test_loaded_state_replaces_ids() {
        let indicators = SummarizedIndicators::new();
        let state = SummarizationState::new().with_committed(
            SummaryRecord::new("s", 1, 10),
            vec![MessageId::new("m1")],
        );

        indicators
            .on_conversation_loaded(&ConversationId::new("c1"), &state)
            .await;
        assert!(indicators.is_summarized(&sized("m1", 1)));

        indicators
            .on_conversation_loaded(&ConversationId::new("c2"), &SummarizationState::new())
            .await;
        assert!(!indicators.is_summarized(&sized("m1", 1)));

        indicators
            .on_summarized(
                &ConversationId::new("c2"),
                &SummaryRecord::new("t", 1, 10),
                &[MessageId::new("m2")],
            )
            .await;
        // Clears for another conversation are ignored.
        indicators.on_cleared(&ConversationId::new("c1")).await;
        assert_eq!(indicators.count(), 1);
    }
}
