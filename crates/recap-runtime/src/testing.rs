use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use recap_core::{ChatHost, ConversationId, Message};

#[derive(Default)]
pub(crate) struct FakeHost {
    active: RwLock<Option<ConversationId>>,
    messages: RwLock<Vec<Message>>,
    latency_ms: AtomicU64,
}

impl FakeHost {
    pub(crate) fn open(&self, id: &str, messages: Vec<Message>) {
        *self.active.write() = Some(ConversationId::new(id));
        *self.messages.write() = messages;
    }

    pub(crate) fn push(&self, message: Message) {
        self.messages.write().push(message);
    }

    /// Delays every `live_messages` read.
    pub(crate) fn set_latency(&self, latency_ms: u64) {
        self.latency_ms.store(latency_ms, Ordering::SeqCst);
    }

    pub(crate) fn close(&self) {
        *self.active.write() = None;
        self.messages.write().clear();
    }
}

#[async_trait]
impl ChatHost for FakeHost {
    async fn active_conversation_id(&self) -> Option<ConversationId> {
        self.active.read().clone()
    }

    async fn live_messages(&self) -> Vec<Message> {
        let latency_ms = self.latency_ms.load(Ordering::SeqCst);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
        self.messages.read().clone()
    }
}

pub(crate) fn sized(id: &str, tokens: usize) -> Message {
    Message::user("Ann", "x".repeat(tokens * 4)).with_id(id)
}
