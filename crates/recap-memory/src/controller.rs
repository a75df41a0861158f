//! Per-conversation summarization state machine

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use recap_core::{
    BackendError, ConversationId, GenerationBackend, Message, MessageId, Result,
    StateStore, SummarizationConfig, SummarizationError, SummarizationState, SummaryHooks,
    SummaryRecord,
};

use crate::projection;
use crate::prompt::PromptBuilder;
use crate::window::{Window, select_window, unique_by_key};

/// What the controller would do with the current transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Summarize(Vec<Message>),
    Wait { pending_tokens: u32 },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Fired on every new message; summarizes only once the threshold is reached.
    Auto,
    /// User-initiated; summarizes whatever the window holds.
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Waiting { pending_tokens: u32 },
    NothingToSummarize,
    Busy,
    Summarized {
        record: SummaryRecord,
        persisted: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SummaryStatus {
    #[default]
    Ready,
    Summarizing,
    Summarized {
        messages: usize,
    },
    Cleared,
    Error(String),
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryStatus::Ready => write!(f, "Ready"),
            SummaryStatus::Summarizing => write!(f, "Summarizing..."),
            SummaryStatus::Summarized { messages } => write!(f, "Summarized {} messages", messages),
            SummaryStatus::Cleared => write!(f, "Summaries cleared"),
            SummaryStatus::Error(e) => write!(f, "Error during summarization: {}", e),
        }
    }
}

/// Owns one conversation's summarization state and decides when to fold messages into summaries.
///
/// At most one generation runs per controller. `clear` and `detach` bump an
/// epoch so a generation that finishes afterwards is discarded instead of
/// committed. A detached controller never commits or clears again.
pub struct SummarizationController {
    conversation_id: ConversationId,
    config: Arc<RwLock<SummarizationConfig>>,
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn StateStore>,
    hooks: Arc<dyn SummaryHooks>,
    state: RwLock<SummarizationState>,
    status: RwLock<SummaryStatus>,
    in_flight: tokio::sync::Mutex<()>,
    persist_lock: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
    detached: AtomicBool,
}

impl SummarizationController {
    pub fn new(
        conversation_id: ConversationId,
        config: Arc<RwLock<SummarizationConfig>>,
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn StateStore>,
        hooks: Arc<dyn SummaryHooks>,
    ) -> Self {
        Self {
            conversation_id,
            config,
            backend,
            store,
            hooks,
            state: RwLock::new(SummarizationState::new()),
            status: RwLock::new(SummaryStatus::Ready),
            in_flight: tokio::sync::Mutex::new(()),
            persist_lock: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            detached: AtomicBool::new(false),
        }
    }

    pub fn with_state(self, state: SummarizationState) -> Self {
        *self.state.write() = state;
        self
    }

    /// Builds a controller from the conversation's persisted state, or an empty one.
    pub async fn load(
        conversation_id: ConversationId,
        config: Arc<RwLock<SummarizationConfig>>,
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn StateStore>,
        hooks: Arc<dyn SummaryHooks>,
    ) -> Result<Self> {
        let state = store
            .load_state(&conversation_id)
            .await?
            .unwrap_or_default();

        debug!(
            conversation = %conversation_id,
            summaries = state.summary_count(),
            summarized = state.summarized_count(),
            "Loaded summarization state"
        );
        hooks.on_conversation_loaded(&conversation_id, &state).await;

        Ok(Self::new(conversation_id, config, backend, store, hooks).with_state(state))
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn config(&self) -> SummarizationConfig {
        self.config.read().clone()
    }

    pub fn state(&self) -> SummarizationState {
        self.state.read().clone()
    }

    pub fn summaries(&self) -> Vec<SummaryRecord> {
        self.state.read().summaries.clone()
    }

    pub fn summarized_count(&self) -> usize {
        self.state.read().summarized_count()
    }

    pub fn pending_token_count(&self) -> u32 {
        self.state.read().pending_token_count
    }

    pub fn status(&self) -> SummaryStatus {
        self.status.read().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    pub fn is_summarized(&self, message: &Message) -> bool {
        self.state.read().is_summarized(&message.key())
    }

    /// Projection of `live` against the current state.
    pub fn project(&self, live: &[Message]) -> Vec<Message> {
        projection::project(live, &self.state.read())
    }

    fn window(&self, live: &[Message]) -> Window {
        let policy = self.config.read().window_policy;
        let threshold = self.config.read().token_threshold;

        let mut state = self.state.write();
        let window = select_window(
            live.iter().filter(|m| !state.is_summarized(&m.key())),
            threshold,
            policy,
        );
        state.pending_token_count = window.tokens;
        window
    }

    /// Threshold check for an automatic trigger. Updates the pending token count.
    pub fn evaluate(&self, live: &[Message]) -> Decision {
        let threshold = self.config.read().token_threshold;
        let window = self.window(live);

        if window.reaches(threshold) {
            Decision::Summarize(window.messages)
        } else {
            Decision::Wait {
                pending_tokens: window.tokens,
            }
        }
    }

    /// Same windowing as [`evaluate`](Self::evaluate), without the threshold gate.
    pub fn evaluate_manual(&self, live: &[Message]) -> Decision {
        let window = self.window(live);
        if window.is_empty() {
            Decision::Empty
        } else {
            Decision::Summarize(window.messages)
        }
    }

    /// Generates a summary of `batch` and commits it.
    pub async fn summarize(&self, batch: &[Message]) -> Result<SummaryRecord> {
        self.summarize_batch(batch).await.map(|(record, _)| record)
    }

    pub async fn trigger(&self, live: &[Message], mode: TriggerMode) -> Result<TriggerOutcome> {
        let decision = match mode {
            TriggerMode::Auto => self.evaluate(live),
            TriggerMode::Manual => self.evaluate_manual(live),
        };

        let batch = match decision {
            Decision::Summarize(batch) => batch,
            Decision::Wait { pending_tokens } => {
                return Ok(TriggerOutcome::Waiting { pending_tokens });
            }
            Decision::Empty => return Ok(TriggerOutcome::NothingToSummarize),
        };

        match self.summarize_batch(&batch).await {
            Ok((record, persisted)) => Ok(TriggerOutcome::Summarized { record, persisted }),
            Err(SummarizationError::InFlight) => {
                debug!(conversation = %self.conversation_id, "Summarization already in flight, ignoring trigger");
                Ok(TriggerOutcome::Busy)
            }
            Err(e) => Err(e),
        }
    }

    async fn summarize_batch(&self, batch: &[Message]) -> Result<(SummaryRecord, bool)> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SummarizationError::InFlight)?;

        let unique = unique_by_key(batch);
        if unique.is_empty() {
            return Err(SummarizationError::EmptyBatch);
        }
        let batch = unique.as_slice();

        // Epoch before flag: a detach that sets the flag after this check
        // still bumps the epoch after the load.
        let epoch = self.epoch.load(Ordering::SeqCst);
        if self.is_detached() {
            debug!(conversation = %self.conversation_id, "Controller detached, not summarizing");
            return Err(SummarizationError::Superseded);
        }
        let config = self.config();
        let prior = self.summaries();

        *self.status.write() = SummaryStatus::Summarizing;
        self.hooks
            .on_summarize_start(&self.conversation_id, batch)
            .await;

        let text = match self.generate(&config, &prior, batch).await {
            Ok(text) => text,
            Err(e) => {
                warn!(conversation = %self.conversation_id, error = %e, "Summarization failed");
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    *self.status.write() = SummaryStatus::Error(e.to_string());
                }
                self.hooks
                    .on_summarize_failed(&self.conversation_id, &e)
                    .await;
                return Err(e);
            }
        };

        let _persist = self.persist_lock.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch || self.is_detached() {
            info!(conversation = %self.conversation_id, "Discarding summary: state changed while generating");
            return Err(SummarizationError::Superseded);
        }

        let keys: Vec<MessageId> = batch.iter().map(Message::key).collect();
        let tokens = crate::tokens::estimate_batch_tokens(batch);
        let record = SummaryRecord::new(text, batch.len(), tokens);
        let next = self
            .state
            .read()
            .with_committed(record.clone(), keys.iter().cloned());

        let persisted = match self.store.save_state(&self.conversation_id, &next).await {
            Ok(()) => true,
            Err(e) => {
                let e = persistence_error(e);
                warn!(conversation = %self.conversation_id, error = %e, "Failed to persist summary, keeping it in memory");
                self.hooks
                    .on_persistence_failure(&self.conversation_id, &e)
                    .await;
                false
            }
        };

        *self.state.write() = next;
        *self.status.write() = SummaryStatus::Summarized {
            messages: batch.len(),
        };

        info!(
            conversation = %self.conversation_id,
            messages = batch.len(),
            tokens,
            persisted,
            "Summary committed"
        );
        self.hooks
            .on_summarized(&self.conversation_id, &record, &keys)
            .await;

        Ok((record, persisted))
    }

    async fn generate(
        &self,
        config: &SummarizationConfig,
        prior: &[SummaryRecord],
        batch: &[Message],
    ) -> Result<String> {
        let builder = PromptBuilder::new(config)?;
        let prompt = builder.render(prior, batch)?;

        let call = self.backend.generate(builder.system_instruction(), &prompt);
        let response = match config.generation_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| BackendError::Timeout(limit))?,
            None => call.await,
        }?;

        let text = response.trim();
        if text.is_empty() {
            return Err(BackendError::EmptyResponse.into());
        }
        Ok(text.to_string())
    }

    /// Drops every summary and summarized id for this conversation. Irreversible.
    ///
    /// The in-memory reset always happens; a store failure is reported afterwards.
    pub async fn clear(&self) -> Result<()> {
        let _persist = self.persist_lock.lock().await;
        if self.is_detached() {
            return Err(SummarizationError::Superseded);
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let cleared = SummarizationState::new();
        *self.state.write() = cleared.clone();
        *self.status.write() = SummaryStatus::Cleared;

        let saved = self.store.save_state(&self.conversation_id, &cleared).await;
        info!(conversation = %self.conversation_id, "Summaries cleared");
        self.hooks.on_cleared(&self.conversation_id).await;

        if let Err(e) = saved {
            let e = persistence_error(e);
            warn!(conversation = %self.conversation_id, error = %e, "Failed to persist cleared state");
            self.hooks
                .on_persistence_failure(&self.conversation_id, &e)
                .await;
            return Err(e);
        }
        Ok(())
    }

    /// Invalidates any in-flight generation and rejects later ones. Called when
    /// the host switches away.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        debug!(conversation = %self.conversation_id, "Controller detached");
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

fn persistence_error(err: SummarizationError) -> SummarizationError {
    match err {
        SummarizationError::PersistenceFailure(_) => err,
        other => SummarizationError::PersistenceFailure(other.to_string()),
    }
}
