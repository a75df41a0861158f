//! Summarization controller and context projection
//!
//! The [`SummarizationController`] decides when a run of unsummarized
//! messages has grown past the token threshold, asks the generation backend
//! for a condensed summary, and commits the result. [`project`] is the pure
//! counterpart used right before every generation call: it drops summarized
//! messages and injects the accumulated summaries as one system message.

mod controller;
mod hooks;
mod projection;
mod prompt;
mod tokens;
mod window;

pub use controller::{
    Decision, SummarizationController, SummaryStatus, TriggerMode, TriggerOutcome,
};
pub use hooks::{CompositeHooks, LoggingHooks, NoopHooks};
pub use projection::{SUMMARY_MESSAGE_ID, SUMMARY_SPEAKER, project, summary_message};
pub use prompt::{DEFAULT_PROMPT_TEMPLATE, PromptBuilder, truncate_preview};
pub use tokens::{estimate_batch_tokens, estimate_tokens};
pub use window::{Window, select_window};
