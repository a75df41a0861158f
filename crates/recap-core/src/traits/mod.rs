//! Collaborator traits consumed by the summarization core

pub mod backend;
pub mod hooks;
pub mod host;
pub mod store;

pub use backend::{BackendError, GenerationBackend};
pub use hooks::SummaryHooks;
pub use host::ChatHost;
pub use store::{ConfigStore, StateStore};
