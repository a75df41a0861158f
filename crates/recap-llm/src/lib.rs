//! Generation backends for progressive conversation summarization

pub mod mock;
pub mod providers;

pub use mock::{MockBackend, MockCall};
pub use providers::{ProviderBuilder, ProviderType, UnifiedBackend};
pub use recap_core::{BackendError, GenerationBackend};
