//! Session wiring for progressive conversation summarization
//!
//! A [`SummarizationSession`] follows the host's active conversation, owns one
//! controller per conversation, and applies settings changes. Build one with
//! [`SessionBuilder`], either programmatically or from a YAML settings file.

mod builder;
mod events;
mod indicators;
mod session;
mod settings;
mod watcher;

#[cfg(test)]
mod testing;

pub use builder::SessionBuilder;
pub use events::HostEvent;
pub use indicators::{SUMMARIZED_LABEL, SummarizedIndicators};
pub use session::{SessionOutcome, SummarizationSession};
pub use settings::{BackendConfig, RecapSettings};
pub use watcher::{ConversationWatcher, DEFAULT_POLL_INTERVAL, WatcherHandle};

pub use recap_core::{Result, SummarizationError};
