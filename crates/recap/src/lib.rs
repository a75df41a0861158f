//! Progressive conversation summarization

pub mod config {
    pub use recap_core::{MIN_TOKEN_THRESHOLD, SummarizationConfig, WindowPolicy};
    pub use recap_runtime::{BackendConfig, RecapSettings};
}

pub mod error {
    pub use recap_core::{BackendError, Result, SummarizationError};
}

pub mod message {
    pub use recap_core::{ChatHost, ConversationId, Message, MessageId};
}

pub mod llm {
    pub use recap_core::GenerationBackend;
    pub use recap_llm::{MockBackend, MockCall};

    pub mod providers {
        pub use recap_llm::{ProviderBuilder, ProviderType, UnifiedBackend};
    }
}

pub mod summarize {
    pub use recap_core::{SummarizationState, SummaryRecord};
    pub use recap_memory::{
        DEFAULT_PROMPT_TEMPLATE, Decision, PromptBuilder, SUMMARY_MESSAGE_ID, SUMMARY_SPEAKER,
        SummarizationController, SummaryStatus, TriggerMode, TriggerOutcome, Window,
        estimate_batch_tokens, estimate_tokens, project, select_window, summary_message,
        truncate_preview,
    };
}

pub mod hooks {
    pub use recap_core::SummaryHooks;
    pub use recap_memory::{CompositeHooks, LoggingHooks, NoopHooks};
    pub use recap_runtime::{SUMMARIZED_LABEL, SummarizedIndicators};
}

pub mod persistence {
    pub use recap_core::{ConfigStore, StateStore};
    #[cfg(feature = "sqlite")]
    pub use recap_storage::SqliteStore;
    pub use recap_storage::{FileStore, InMemoryStore, StorageConfig, Stores, create_store};
}

pub mod session {
    pub use recap_runtime::{
        ConversationWatcher, DEFAULT_POLL_INTERVAL, HostEvent, SessionBuilder, SessionOutcome,
        SummarizationSession, WatcherHandle,
    };
}

pub use config::{BackendConfig, RecapSettings, SummarizationConfig, WindowPolicy};
pub use error::{BackendError, Result, SummarizationError};
pub use hooks::{CompositeHooks, LoggingHooks, NoopHooks, SummarizedIndicators, SummaryHooks};
pub use llm::GenerationBackend;
pub use llm::providers::{ProviderType, UnifiedBackend};
pub use message::{ChatHost, ConversationId, Message, MessageId};
#[cfg(feature = "sqlite")]
pub use persistence::SqliteStore;
pub use persistence::{
    ConfigStore, FileStore, InMemoryStore, StateStore, StorageConfig, Stores, create_store,
};
pub use session::{
    ConversationWatcher, HostEvent, SessionBuilder, SessionOutcome, SummarizationSession,
    WatcherHandle,
};
pub use summarize::{
    SummarizationController, SummarizationState, SummaryRecord, SummaryStatus, TriggerOutcome,
    project,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_controller_through_reexports() {
        let controller = SummarizationController::new(
            ConversationId::new("chat"),
            Arc::new(parking_lot::RwLock::new(
                SummarizationConfig::new(200).with_enabled(true),
            )),
            Arc::new(llm::MockBackend::with_response("They said hello.")),
            Arc::new(InMemoryStore::new()),
            Arc::new(NoopHooks),
        );

        let mut live: Vec<Message> = (0..3)
            .map(|i| Message::user("Ann", "hello ".repeat(50)).with_id(format!("m{i}")))
            .collect();
        live.push(Message::user("Ann", "How are you?").with_id("m3"));
        let outcome = controller
            .trigger(&live, summarize::TriggerMode::Auto)
            .await
            .unwrap();
        assert!(matches!(outcome, TriggerOutcome::Summarized { .. }));

        let projected = project(&live, &controller.state());
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[0].speaker_name, summarize::SUMMARY_SPEAKER);
        assert_eq!(projected[1].text, "How are you?");
    }
}
