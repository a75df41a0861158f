//! YAML settings file: summarization, storage and generation backend

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use recap_core::{GenerationBackend, Result, SummarizationConfig, SummarizationError};
use recap_llm::{MockBackend, ProviderBuilder, ProviderType};
use recap_storage::StorageConfig;

/// Generation backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Provider name (`openai`, `anthropic`, `ollama`, ...) or `mock`.
    pub provider: String,

    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Canned answer for the `mock` provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_response: Option<String>,
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::mock()
    }
}

impl BackendConfig {
    pub fn mock() -> Self {
        Self {
            provider: "mock".to_string(),
            model: String::new(),
            api_key_env: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            mock_response: None,
        }
    }

    pub fn provider(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Self::mock()
        }
    }

    pub fn is_mock(&self) -> bool {
        self.provider.eq_ignore_ascii_case("mock")
    }

    pub fn build(&self) -> Result<Arc<dyn GenerationBackend>> {
        if self.is_mock() {
            let mock = match &self.mock_response {
                Some(response) => MockBackend::with_response(response.clone()),
                None => MockBackend::default(),
            };
            return Ok(Arc::new(mock));
        }

        let provider_type: ProviderType = self.provider.parse().map_err(|_| {
            SummarizationError::InvalidConfig(format!("Unknown provider: {}", self.provider))
        })?;
        if self.model.is_empty() {
            return Err(SummarizationError::InvalidConfig(format!(
                "Model is required for provider {}",
                self.provider
            )));
        }

        let mut builder = ProviderBuilder::new()
            .provider(provider_type)
            .model(&self.model)
            .max_tokens(self.max_tokens);
        if let Some(env) = &self.api_key_env {
            builder = builder.api_key_env(env);
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }

        let backend = builder
            .build()
            .map_err(|e| SummarizationError::InvalidConfig(e.to_string()))?;
        Ok(Arc::new(backend))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecapSettings {
    #[serde(default)]
    pub summarization: SummarizationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

impl RecapSettings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: RecapSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.summarization.validate()?;
        if self.backend.provider.is_empty() {
            return Err(SummarizationError::InvalidConfig(
                "Backend provider cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
