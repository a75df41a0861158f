//! Per-conversation summarization state

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::MessageId;

/// One condensed summary. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub source_message_count: usize,
    pub source_token_count: u32,
}

impl SummaryRecord {
    pub fn new(
        text: impl Into<String>,
        source_message_count: usize,
        source_token_count: u32,
    ) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
            source_message_count,
            source_token_count,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// The persisted unit, scoped to one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationState {
    /// Chronological, append-only.
    #[serde(default)]
    pub summaries: Vec<SummaryRecord>,
    /// Grows monotonically until an explicit clear.
    #[serde(default)]
    pub summarized_ids: BTreeSet<MessageId>,
    /// Advisory; only used for display and threshold comparison.
    #[serde(default)]
    pub pending_token_count: u32,
}

impl SummarizationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_summarized(&self, id: &MessageId) -> bool {
        self.summarized_ids.contains(id)
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.len()
    }

    pub fn summarized_count(&self) -> usize {
        self.summarized_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.summarized_ids.is_empty()
    }

    /// Returns a new state with `record` appended and `ids` folded in.
    ///
    /// The receiver is left untouched so a failed persist never leaves a
    /// half-applied commit behind.
    pub fn with_committed(
        &self,
        record: SummaryRecord,
        ids: impl IntoIterator<Item = MessageId>,
    ) -> Self {
        let mut next = self.clone();
        next.summaries.push(record);
        next.summarized_ids.extend(ids);
        next.pending_token_count = 0;
        next
    }

    pub fn source_message_total(&self) -> usize {
        self.summaries.iter().map(|s| s.source_message_count).sum()
    }
}
