use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use recap_core::{
    ConversationId, Message, MessageId, SummarizationError, SummarizationState, SummaryHooks,
    SummaryRecord,
};

use crate::prompt::truncate_preview;

pub struct NoopHooks;

#[async_trait]
impl SummaryHooks for NoopHooks {}

pub struct LoggingHooks {
    prefix: String,
}

impl LoggingHooks {
    pub fn new() -> Self {
        Self {
            prefix: "[Recap]".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingHooks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SummaryHooks for LoggingHooks {
    async fn on_conversation_loaded(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) {
        info!(
            "{} Conversation {} loaded: {} summaries, {} messages summarized",
            self.prefix,
            conversation_id,
            state.summary_count(),
            state.summarized_count()
        );
    }

    async fn on_summarize_start(&self, conversation_id: &ConversationId, batch: &[Message]) {
        debug!(
            "{} Summarizing {} messages in {}",
            self.prefix,
            batch.len(),
            conversation_id
        );
    }

    async fn on_summarized(
        &self,
        conversation_id: &ConversationId,
        record: &SummaryRecord,
        summarized_ids: &[MessageId],
    ) {
        info!(
            "{} Summarized {} messages ({} tokens) in {}: {}",
            self.prefix,
            summarized_ids.len(),
            record.source_token_count,
            conversation_id,
            truncate_preview(&record.text, 100)
        );
    }

    async fn on_summarize_failed(
        &self,
        conversation_id: &ConversationId,
        error: &SummarizationError,
    ) {
        warn!(
            "{} Summarization failed in {}: {}",
            self.prefix, conversation_id, error
        );
    }

    async fn on_cleared(&self, conversation_id: &ConversationId) {
        info!("{} Summaries cleared for {}", self.prefix, conversation_id);
    }

    async fn on_conversation_detached(&self, conversation_id: &ConversationId) {
        debug!("{} Conversation {} detached", self.prefix, conversation_id);
    }

    async fn on_persistence_failure(
        &self,
        conversation_id: &ConversationId,
        error: &SummarizationError,
    ) {
        error!(
            "{} Failed to persist state for {}: {}",
            self.prefix, conversation_id, error
        );
    }
}

pub struct CompositeHooks {
    hooks: Vec<Arc<dyn SummaryHooks>>,
}

impl CompositeHooks {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add(mut self, hooks: Arc<dyn SummaryHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn with_hooks(hooks: Vec<Arc<dyn SummaryHooks>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Default for CompositeHooks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SummaryHooks for CompositeHooks {
    async fn on_conversation_loaded(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) {
        for hook in &self.hooks {
            hook.on_conversation_loaded(conversation_id, state).await;
        }
    }

    async fn on_summarize_start(&self, conversation_id: &ConversationId, batch: &[Message]) {
        for hook in &self.hooks {
            hook.on_summarize_start(conversation_id, batch).await;
        }
    }

    async fn on_summarized(
        &self,
        conversation_id: &ConversationId,
        record: &SummaryRecord,
        summarized_ids: &[MessageId],
    ) {
        for hook in &self.hooks {
            hook.on_summarized(conversation_id, record, summarized_ids)
                .await;
        }
    }

    async fn on_summarize_failed(
        &self,
        conversation_id: &ConversationId,
        error: &SummarizationError,
    ) {
        for hook in &self.hooks {
            hook.on_summarize_failed(conversation_id, error).await;
        }
    }

    async fn on_cleared(&self, conversation_id: &ConversationId) {
        for hook in &self.hooks {
            hook.on_cleared(conversation_id).await;
        }
    }

    async fn on_conversation_detached(&self, conversation_id: &ConversationId) {
        for hook in &self.hooks {
            hook.on_conversation_detached(conversation_id).await;
        }
    }

    async fn on_persistence_failure(
        &self,
        conversation_id: &ConversationId,
        error: &SummarizationError,
    ) {
        for hook in &self.hooks {
            hook.on_persistence_failure(conversation_id, error).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingHooks {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingHooks {
        fn new() -> Self {
            Self {
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl SummaryHooks for RecordingHooks {
        async fn on_summarize_start(&self, conversation_id: &ConversationId, batch: &[Message]) {
            self.events
                .lock()
                .push(format!("start:{}:{}", conversation_id, batch.len()));
        }

        async fn on_summarized(
            &self,
            conversation_id: &ConversationId,
            _record: &SummaryRecord,
            summarized_ids: &[MessageId],
        ) {
            self.events
                .lock()
                .push(format!("summarized:{}:{}", conversation_id, summarized_ids.len()));
        }

        async fn on_cleared(&self, conversation_id: &ConversationId) {
            self.events.lock().push(format!("cleared:{}", conversation_id));
        }

        async fn on_conversation_detached(&self, conversation_id: &ConversationId) {
            self.events.lock().push(format!("detached:{}", conversation_id));
        }
    }

    #[tokio::test]
    async fn test_noop_hooks() {
        let hooks = NoopHooks;
        let id = ConversationId::new("c1");
        hooks.on_cleared(&id).await;
        hooks
            .on_summarize_failed(&id, &SummarizationError::EmptyBatch)
            .await;
    }

    #[tokio::test]
    async fn test_logging_hooks_prefix() {
        let hooks = LoggingHooks::with_prefix("[Test]");
        assert_eq!(hooks.prefix, "[Test]");
        assert_eq!(LoggingHooks::default().prefix, "[Recap]");

        let id = ConversationId::new("c1");
        hooks
            .on_conversation_loaded(&id, &SummarizationState::new())
            .await;
        hooks
            .on_summarized(&id, &SummaryRecord::new("text", 1, 1), &[MessageId::new("m")])
            .await;
    }

    #[tokio::test]
    async fn test_composite_hooks_fan_out() {
        let first = Arc::new(RecordingHooks::new());
        let second = Arc::new(RecordingHooks::new());
        let composite = CompositeHooks::new()
            .add(first.clone())
            .add(second.clone())
            .add(Arc::new(NoopHooks));
        assert_eq!(composite.len(), 3);

        let id = ConversationId::new("c1");
        composite
            .on_summarize_start(&id, &[Message::user("Ann", "hi")])
            .await;
        composite
            .on_summarized(
                &id,
                &SummaryRecord::new("s", 1, 1),
                &[MessageId::new("m1")],
            )
            .await;
        composite.on_cleared(&id).await;
        composite.on_conversation_detached(&id).await;

        let expected = vec!["start:c1:1", "summarized:c1:1", "cleared:c1", "detached:c1"];
        assert_eq!(first.events(), expected);
        assert_eq!(second.events(), expected);
    }

    #[test]
    fn test_composite_empty() {
        assert!(CompositeHooks::default().is_empty());
        assert_eq!(CompositeHooks::with_hooks(vec![Arc::new(NoopHooks)]).len(), 1);
    }
}
