//! Error types for the summarization core

use thiserror::Error;

use crate::traits::backend::BackendError;

#[derive(Debug, Error)]
pub enum SummarizationError {
    /// The generation call failed, timed out, or returned nothing usable.
    #[error("Generation backend failure: {0}")]
    BackendFailure(String),

    #[error("No active conversation")]
    NoActiveConversation,

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("A summarization is already in flight for this conversation")]
    InFlight,

    #[error("Nothing to summarize: batch is empty")]
    EmptyBatch,

    /// State was cleared or the conversation was switched while generating.
    #[error("Summarization result discarded: conversation state changed while generating")]
    Superseded,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Prompt template error: {0}")]
    Template(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SummarizationError {
    /// Whether the same batch stays eligible for the next trigger.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SummarizationError::BackendFailure(_)
                | SummarizationError::InFlight
                | SummarizationError::Superseded
        )
    }
}

impl From<BackendError> for SummarizationError {
    fn from(err: BackendError) -> Self {
        SummarizationError::BackendFailure(err.to_string())
    }
}

impl From<serde_json::Error> for SummarizationError {
    fn from(err: serde_json::Error) -> Self {
        SummarizationError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SummarizationError {
    fn from(err: serde_yaml::Error) -> Self {
        SummarizationError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SummarizationError>;
