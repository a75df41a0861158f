pub mod unified;

pub use unified::{ProviderBuilder, ProviderType, UnifiedBackend};
