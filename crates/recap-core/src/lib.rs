//! Core types and traits for progressive conversation summarization

pub mod config;
pub mod error;
pub mod message;
pub mod state;
pub mod traits;

pub use config::{MIN_TOKEN_THRESHOLD, SummarizationConfig, WindowPolicy};
pub use error::{Result, SummarizationError};
pub use message::{ConversationId, Message, MessageId};
pub use state::{SummarizationState, SummaryRecord};
pub use traits::backend::{BackendError, GenerationBackend};
pub use traits::hooks::SummaryHooks;
pub use traits::host::ChatHost;
pub use traits::store::{ConfigStore, StateStore};
