//! Generation backend trait

use async_trait::async_trait;
use thiserror::Error;

/// Turns a prompt into summary text. Treated as a black box by the controller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, system_instruction: &str, prompt: &str)
    -> Result<String, BackendError>;

    fn backend_name(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}
