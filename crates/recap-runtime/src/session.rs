use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use recap_core::{
    ChatHost, ConfigStore, ConversationId, GenerationBackend, Message, Result, StateStore,
    SummarizationConfig, SummarizationError, SummaryHooks, SummaryRecord,
};
use recap_memory::{SummarizationController, SummaryStatus, TriggerMode, TriggerOutcome};

use crate::events::HostEvent;

/// Result of a session command.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Automatic trigger while summarization is switched off in the installation settings.
    Disabled,
    NoActiveConversation,
    Triggered(TriggerOutcome),
    Cleared,
}

impl SessionOutcome {
    pub fn summarized(&self) -> Option<&SummaryRecord> {
        match self {
            SessionOutcome::Triggered(TriggerOutcome::Summarized { record, .. }) => Some(record),
            _ => None,
        }
    }
}

/// Binds a summarization controller to whatever conversation the host has open.
///
/// Switching conversations detaches the old controller and loads the new
/// conversation's state. Installation settings are shared by every
/// controller the session creates.
pub struct SummarizationSession {
    host: Arc<dyn ChatHost>,
    backend: Arc<dyn GenerationBackend>,
    state_store: Arc<dyn StateStore>,
    config_store: Arc<dyn ConfigStore>,
    hooks: Arc<dyn SummaryHooks>,
    config: Arc<RwLock<SummarizationConfig>>,
    active: RwLock<Option<Arc<SummarizationController>>>,
    switch_lock: tokio::sync::Mutex<()>,
}

impl SummarizationSession {
    pub(crate) fn new(
        host: Arc<dyn ChatHost>,
        backend: Arc<dyn GenerationBackend>,
        state_store: Arc<dyn StateStore>,
        config_store: Arc<dyn ConfigStore>,
        hooks: Arc<dyn SummaryHooks>,
        config: SummarizationConfig,
    ) -> Self {
        Self {
            host,
            backend,
            state_store,
            config_store,
            hooks,
            config: Arc::new(RwLock::new(config)),
            active: RwLock::new(None),
            switch_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> SummarizationConfig {
        self.config.read().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.read().enabled
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    pub fn controller(&self) -> Option<Arc<SummarizationController>> {
        self.active.read().clone()
    }

    pub fn active_conversation(&self) -> Option<ConversationId> {
        self.active
            .read()
            .as_ref()
            .map(|c| c.conversation_id().clone())
    }

    pub fn summaries(&self) -> Vec<SummaryRecord> {
        self.controller()
            .map(|c| c.summaries())
            .unwrap_or_default()
    }

    pub fn summarized_count(&self) -> usize {
        self.controller()
            .map(|c| c.summarized_count())
            .unwrap_or(0)
    }

    pub fn pending_token_count(&self) -> u32 {
        self.controller()
            .map(|c| c.pending_token_count())
            .unwrap_or(0)
    }

    pub fn status(&self) -> SummaryStatus {
        self.controller()
            .map(|c| c.status())
            .unwrap_or_default()
    }

    /// Asks the host which conversation is open and switches to it if it changed.
    pub async fn sync_conversation(&self) -> Result<Option<ConversationId>> {
        let current = self.host.active_conversation_id().await;
        if current != self.active_conversation() {
            self.on_conversation_switched(current.clone()).await?;
        }
        Ok(current)
    }

    /// Replaces the active controller with one loaded for `conversation_id`.
    ///
    /// The previous controller is detached first, so a generation still
    /// running for it is discarded. If loading fails no conversation is
    /// active afterwards.
    pub async fn on_conversation_switched(
        &self,
        conversation_id: Option<ConversationId>,
    ) -> Result<()> {
        let _switch = self.switch_lock.lock().await;

        if conversation_id == self.active_conversation() {
            return Ok(());
        }

        let previous = self.active.write().take();
        if let Some(previous) = previous {
            previous.detach();
            debug!(conversation = %previous.conversation_id(), "Detached conversation");
            self.hooks
                .on_conversation_detached(previous.conversation_id())
                .await;
        }

        let Some(conversation_id) = conversation_id else {
            info!("No active conversation");
            return Ok(());
        };

        let controller = SummarizationController::load(
            conversation_id.clone(),
            self.config.clone(),
            self.backend.clone(),
            self.state_store.clone(),
            self.hooks.clone(),
        )
        .await
        .inspect_err(|e| {
            warn!(conversation = %conversation_id, error = %e, "Failed to load summarization state");
        })?;

        info!(
            conversation = %conversation_id,
            summaries = controller.summaries().len(),
            "Switched conversation"
        );
        *self.active.write() = Some(Arc::new(controller));
        Ok(())
    }

    /// Automatic trigger, run after every new message.
    pub async fn on_message_appended(&self) -> Result<SessionOutcome> {
        self.trigger(TriggerMode::Auto).await
    }

    pub async fn manual_summarize_now(&self) -> Result<SessionOutcome> {
        self.trigger(TriggerMode::Manual).await
    }

    /// Only the automatic trigger is gated by `enabled`.
    async fn trigger(&self, mode: TriggerMode) -> Result<SessionOutcome> {
        if mode == TriggerMode::Auto && !self.is_enabled() {
            return Ok(SessionOutcome::Disabled);
        }
        let Some(controller) = self.controller() else {
            return Ok(SessionOutcome::NoActiveConversation);
        };

        let live = self.host.live_messages().await;
        if self.active_conversation().as_ref() != Some(controller.conversation_id()) {
            debug!(conversation = %controller.conversation_id(), "Conversation switched while reading messages");
            return Err(SummarizationError::Superseded);
        }
        let outcome = controller.trigger(&live, mode).await?;
        Ok(SessionOutcome::Triggered(outcome))
    }

    /// Drops every summary of the active conversation. Irreversible.
    pub async fn clear_all(&self) -> Result<SessionOutcome> {
        let Some(controller) = self.controller() else {
            return Ok(SessionOutcome::NoActiveConversation);
        };
        controller.clear().await?;
        Ok(SessionOutcome::Cleared)
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.update_config(|config| config.enabled = enabled).await
    }

    pub async fn set_token_threshold(&self, threshold: u32) -> Result<()> {
        self.update_config(|config| config.token_threshold = threshold)
            .await
    }

    /// Validates and persists a modified copy of the settings, then makes it live.
    pub async fn update_config<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut SummarizationConfig),
    {
        let mut next = self.config();
        update(&mut next);
        next.validate()?;

        self.config_store.save_config(&next).await?;
        *self.config.write() = next;
        info!(
            enabled = self.is_enabled(),
            threshold = self.config.read().token_threshold,
            "Settings saved"
        );
        Ok(())
    }

    /// View of `live` to hand to the generation backend.
    ///
    /// Passes `live` through unchanged while summarization is disabled or no
    /// conversation is active.
    pub fn project(&self, live: &[Message]) -> Vec<Message> {
        if !self.is_enabled() {
            return live.to_vec();
        }
        match self.controller() {
            Some(controller) => controller.project(live),
            None => live.to_vec(),
        }
    }

    /// Host's current messages, projected.
    pub async fn prepare_context(&self) -> Vec<Message> {
        let live = self.host.live_messages().await;
        self.project(&live)
    }

    pub async fn handle_event(&self, event: HostEvent) -> Result<()> {
        debug!(event = event.name(), "Handling host event");
        match event {
            HostEvent::ConversationSwitched(conversation_id) => {
                self.on_conversation_switched(conversation_id).await
            }
            HostEvent::MessageAppended => {
                let outcome = self.on_message_appended().await?;
                debug!(outcome = ?outcome, "Message appended");
                Ok(())
            }
            HostEvent::ManualSummarize => {
                let outcome = self.manual_summarize_now().await?;
                debug!(outcome = ?outcome, "Manual summarization");
                Ok(())
            }
            HostEvent::ClearAll => self.clear_all().await.map(|_| ()),
        }
    }

    /// Handles events one at a time until every sender is dropped.
    pub async fn run_events(self: Arc<Self>, mut events: mpsc::Receiver<HostEvent>) {
        while let Some(event) = events.recv().await {
            let name = event.name();
            if let Err(e) = self.handle_event(event).await {
                warn!(event = name, error = %e, "Host event failed");
            }
        }
        debug!("Host event channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SessionBuilder;
    use crate::testing::{FakeHost, sized};
    use recap_core::{SummarizationError, SummarizationState};
    use std::time::Duration;
    use recap_llm::MockBackend;
    use recap_storage::{InMemoryStore, Stores};

    async fn session_with(
        host: Arc<FakeHost>,
        backend: MockBackend,
        store: InMemoryStore,
        enabled: bool,
    ) -> SummarizationSession {
        SessionBuilder::new()
            .host(host)
            .backend(Arc::new(backend))
            .stores(Stores::from_store(store))
            .config(SummarizationConfig::new(700).with_enabled(enabled))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_auto_summarize_on_message() {
        let host = Arc::new(FakeHost::default());
        host.open("chat-1", vec![sized("a", 400)]);
        let backend = MockBackend::with_response("They talked.");
        let session = session_with(host.clone(), backend.clone(), InMemoryStore::new(), true).await;

        session.sync_conversation().await.unwrap();
        assert_eq!(
            session.on_message_appended().await.unwrap(),
            SessionOutcome::Triggered(TriggerOutcome::Waiting {
                pending_tokens: 400
            })
        );
        assert_eq!(session.pending_token_count(), 400);

        host.push(sized("b", 400));
        let outcome = session.on_message_appended().await.unwrap();
        assert_eq!(outcome.summarized().unwrap().text, "They talked.");
        assert_eq!(session.summarized_count(), 2);
        assert_eq!(session.status(), SummaryStatus::Summarized { messages: 2 });
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_session_only_summarizes_on_request() {
        let host = Arc::new(FakeHost::default());
        let live = vec![sized("a", 400), sized("b", 400)];
        host.open("chat-1", live.clone());

        let store = InMemoryStore::new();
        let state = SummarizationState::new().with_committed(
            SummaryRecord::new("old", 1, 400),
            vec![recap_core::MessageId::new("a")],
        );
        store
            .save_state(&ConversationId::new("chat-1"), &state)
            .await
            .unwrap();

        let backend = MockBackend::with_response("b was said");
        let session = session_with(host.clone(), backend.clone(), store, false).await;
        session.sync_conversation().await.unwrap();

        assert_eq!(
            session.on_message_appended().await.unwrap(),
            SessionOutcome::Disabled
        );
        assert_eq!(session.prepare_context().await, live);
        assert_eq!(backend.call_count(), 0);

        let outcome = session.manual_summarize_now().await.unwrap();
        assert_eq!(outcome.summarized().unwrap().text, "b was said");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(session.summarized_count(), 2);
        assert!(!session.is_enabled());
        assert_eq!(session.prepare_context().await, live);

        host.push(sized("c", 10));
        session.set_enabled(true).await.unwrap();
        let projected = session.prepare_context().await;
        assert_eq!(projected.len(), 2);
        assert!(projected[0].is_system);
        assert_eq!(projected[1].id, Some(recap_core::MessageId::new("c")));
    }

    #[tokio::test]
    async fn test_switch_while_reading_messages_discards_trigger() {
        let host = Arc::new(FakeHost::default());
        let store = InMemoryStore::new();
        let backend = MockBackend::with_response("summary of chat-2");
        let session = SessionBuilder::new()
            .host(host.clone())
            .backend(Arc::new(backend.clone()))
            .stores(Stores::from_store(store.clone()))
            .config(SummarizationConfig::new(100).with_enabled(true))
            .build()
            .await
            .unwrap();

        host.open("chat-1", Vec::new());
        session.sync_conversation().await.unwrap();
        host.set_latency(50);

        let (result, ()) = futures::join!(session.on_message_appended(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            host.open("chat-2", vec![sized("x", 100), sized("y", 100)]);
            session.sync_conversation().await.unwrap();
        });

        assert!(matches!(result, Err(SummarizationError::Superseded)));
        assert_eq!(backend.call_count(), 0);
        assert_eq!(
            store.load_state(&ConversationId::new("chat-1")).await.unwrap(),
            None
        );
        assert_eq!(session.active_conversation(), Some(ConversationId::new("chat-2")));
        assert!(session.summaries().is_empty());
    }

    #[tokio::test]
    async fn test_switching_loads_other_conversation_state() {
        let host = Arc::new(FakeHost::default());
        let store = InMemoryStore::new();
        let backend = MockBackend::default();
        backend.set_responses(vec!["chat one".to_string(), "chat two".to_string()], false);
        let session = session_with(host.clone(), backend, store.clone(), true).await;

        host.open("chat-1", vec![sized("a", 400), sized("b", 400)]);
        session.sync_conversation().await.unwrap();
        session.on_message_appended().await.unwrap();
        assert_eq!(session.summaries()[0].text, "chat one");

        host.open("chat-2", vec![sized("x", 10)]);
        session.sync_conversation().await.unwrap();
        assert_eq!(session.active_conversation(), Some(ConversationId::new("chat-2")));
        assert!(session.summaries().is_empty());
        assert_eq!(session.summarized_count(), 0);

        host.open("chat-1", vec![sized("a", 400), sized("b", 400)]);
        session.sync_conversation().await.unwrap();
        assert_eq!(session.summaries()[0].text, "chat one");
        assert_eq!(store.list_conversations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_active_conversation() {
        let host = Arc::new(FakeHost::default());
        let session = session_with(host.clone(), MockBackend::default(), InMemoryStore::new(), true).await;

        assert_eq!(session.sync_conversation().await.unwrap(), None);
        assert_eq!(
            session.on_message_appended().await.unwrap(),
            SessionOutcome::NoActiveConversation
        );
        assert_eq!(
            session.clear_all().await.unwrap(),
            SessionOutcome::NoActiveConversation
        );
        assert_eq!(session.status(), SummaryStatus::Ready);

        let live = vec![sized("a", 1)];
        assert_eq!(session.project(&live), live);

        host.open("chat-1", live.clone());
        session.sync_conversation().await.unwrap();
        host.close();
        session.sync_conversation().await.unwrap();
        assert!(session.controller().is_none());
    }

    #[tokio::test]
    async fn test_switch_discards_in_flight_result() {
        let host = Arc::new(FakeHost::default());
        host.open("chat-1", vec![sized("a", 400), sized("b", 400)]);
        let backend = MockBackend::with_response("late");
        backend.set_latency(100);
        let store = InMemoryStore::new();
        let session = session_with(host.clone(), backend, store.clone(), true).await;
        session.sync_conversation().await.unwrap();

        let (result, switched) = futures::join!(session.on_message_appended(), async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            session
                .on_conversation_switched(Some(ConversationId::new("chat-2")))
                .await
        });

        switched.unwrap();
        assert!(matches!(result, Err(SummarizationError::Superseded)));
        assert!(store
            .load_state(&ConversationId::new("chat-1"))
            .await
            .unwrap()
            .is_none());
        assert!(session.summaries().is_empty());
    }

    #[tokio::test]
    async fn test_settings_are_validated_and_persisted() {
        let host = Arc::new(FakeHost::default());
        let store = InMemoryStore::new();
        let session = session_with(host, MockBackend::default(), store.clone(), false).await;

        session.set_token_threshold(2500).await.unwrap();
        session.set_enabled(true).await.unwrap();
        let saved = store.load_config().await.unwrap().unwrap();
        assert_eq!(saved.token_threshold, 2500);
        assert!(saved.enabled);

        let err = session.set_token_threshold(50).await.unwrap_err();
        assert!(matches!(err, SummarizationError::InvalidConfig(_)));
        assert_eq!(session.config().token_threshold, 2500);
    }

    #[tokio::test]
    async fn test_manual_and_clear_commands() {
        let host = Arc::new(FakeHost::default());
        host.open("chat-1", vec![sized("a", 10), sized("b", 10)]);
        let store = InMemoryStore::new();
        let session = session_with(host, MockBackend::default(), store.clone(), true).await;
        session.sync_conversation().await.unwrap();

        let outcome = session.manual_summarize_now().await.unwrap();
        assert!(outcome.summarized().is_some());
        assert_eq!(session.summarized_count(), 2);

        assert_eq!(session.clear_all().await.unwrap(), SessionOutcome::Cleared);
        assert_eq!(session.summarized_count(), 0);
        assert_eq!(session.status(), SummaryStatus::Cleared);
        assert_eq!(
            store.load_state(&ConversationId::new("chat-1")).await.unwrap(),
            Some(SummarizationState::new())
        );
    }

    #[tokio::test]
    async fn test_run_events_processes_in_order() {
        let host = Arc::new(FakeHost::default());
        host.open("chat-1", vec![sized("a", 400), sized("b", 400)]);
        let backend = MockBackend::default();
        let session = Arc::new(session_with(host, backend.clone(), InMemoryStore::new(), true).await);

        let (tx, rx) = mpsc::channel(8);
        let runner = tokio::spawn(session.clone().run_events(rx));

        tx.send(HostEvent::ConversationSwitched(Some(ConversationId::new("chat-1"))))
            .await
            .unwrap();
        tx.send(HostEvent::MessageAppended).await.unwrap();
        tx.send(HostEvent::ManualSummarize).await.unwrap();
        drop(tx);
        runner.await.unwrap();

        assert_eq!(session.summaries().len(), 1);
        assert_eq!(backend.call_count(), 1);
    }
}
