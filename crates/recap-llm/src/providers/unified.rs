use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use recap_core::{BackendError, GenerationBackend};

/// Hosted or local model provider reachable through the `llm` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    /// Local models; no API key.
    Ollama,
    DeepSeek,
    XAI,
    Groq,
    Google,
    Mistral,
}

/// Static facts about a provider: config name, key variable, default endpoint.
struct ProviderInfo {
    name: &'static str,
    key_env: Option<&'static str>,
    default_url: Option<&'static str>,
}

impl ProviderType {
    pub const ALL: [ProviderType; 8] = [
        Self::OpenAI,
        Self::Anthropic,
        Self::Ollama,
        Self::DeepSeek,
        Self::XAI,
        Self::Groq,
        Self::Google,
        Self::Mistral,
    ];

    fn info(self) -> ProviderInfo {
        let (name, key_env, default_url) = match self {
            Self::OpenAI => ("openai", Some("OPENAI_API_KEY"), None),
            Self::Anthropic => ("anthropic", Some("ANTHROPIC_API_KEY"), None),
            Self::Ollama => ("ollama", None, Some("http://localhost:11434")),
            Self::DeepSeek => ("deepseek", Some("DEEPSEEK_API_KEY"), None),
            Self::XAI => ("xai", Some("XAI_API_KEY"), None),
            Self::Groq => ("groq", Some("GROQ_API_KEY"), None),
            Self::Google => ("google", Some("GOOGLE_API_KEY"), None),
            Self::Mistral => ("mistral", Some("MISTRAL_API_KEY"), None),
        };
        ProviderInfo {
            name,
            key_env,
            default_url,
        }
    }

    pub fn api_key_env_var(&self) -> Option<&'static str> {
        self.info().key_env
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        self.info().default_url
    }

    pub fn as_str(&self) -> &'static str {
        self.info().name
    }

    fn llm_backend(self) -> LLMBackend {
        match self {
            Self::OpenAI => LLMBackend::OpenAI,
            Self::Anthropic => LLMBackend::Anthropic,
            Self::Ollama => LLMBackend::Ollama,
            Self::DeepSeek => LLMBackend::DeepSeek,
            Self::XAI => LLMBackend::XAI,
            Self::Google => LLMBackend::Google,
            Self::Groq => LLMBackend::Groq,
            Self::Mistral => LLMBackend::Mistral,
        }
    }
}

impl FromStr for ProviderType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| BackendError::Config(format!("Unknown provider: {}", s)))
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key from the argument, else the named variable, else the provider's default variable.
fn resolve_api_key(
    provider_type: ProviderType,
    explicit: Option<String>,
    env_override: Option<&str>,
) -> Result<Option<String>, BackendError> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    let Some(var) = env_override.or(provider_type.api_key_env_var()) else {
        return Ok(None);
    };
    std::env::var(var).map(Some).map_err(|_| {
        BackendError::Config(format!(
            "{} needs an API key in environment variable {}",
            provider_type, var
        ))
    })
}

/// Generation backend over the `llm` crate's provider builders.
#[derive(Debug)]
pub struct UnifiedBackend {
    provider_type: ProviderType,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl UnifiedBackend {
    pub fn new(
        provider_type: ProviderType,
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            provider_type,
            model: model.into(),
            api_key: resolve_api_key(provider_type, api_key, None)?,
            base_url: base_url.or_else(|| provider_type.default_base_url().map(String::from)),
            max_tokens: None,
            temperature: None,
        })
    }

    pub fn from_env(
        provider_type: ProviderType,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        Self::new(provider_type, model, None, None)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn build_llm(&self, system_instruction: &str) -> Result<Box<dyn llm::LLMProvider>, BackendError> {
        let mut builder = LLMBuilder::new()
            .backend(self.provider_type.llm_backend())
            .model(&self.model)
            .system(system_instruction);

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.api_key(key);
        }
        if let Some(url) = self.base_url.as_deref() {
            builder = builder.base_url(url);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }

        builder.build().map_err(|e| {
            BackendError::Config(format!("Cannot build {} client: {}", self.provider_type, e))
        })
    }
}

#[async_trait]
impl GenerationBackend for UnifiedBackend {
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
    ) -> Result<String, BackendError> {
        let llm = self.build_llm(system_instruction)?;
        let messages = vec![ChatMessage::user().content(prompt).build()];

        debug!(
            provider = self.provider_type.as_str(),
            model = %self.model,
            prompt_chars = prompt.len(),
            "Requesting summary generation"
        );

        let response = llm.chat(&messages).await.map_err(|e| BackendError::Api {
            message: format!("{} request failed: {}", self.provider_type, e),
            status: None,
        })?;

        let content = response.text().unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(content)
    }

    fn backend_name(&self) -> &str {
        self.provider_type.as_str()
    }
}

/// Step-by-step construction of a [`UnifiedBackend`] from settings.
#[derive(Debug, Default)]
pub struct ProviderBuilder {
    provider_type: Option<ProviderType>,
    model: Option<String>,
    api_key: Option<String>,
    api_key_env: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider_type: ProviderType) -> Self {
        self.provider_type = Some(provider_type);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Reads the key from `env_var` instead of the provider's default variable.
    pub fn api_key_env(mut self, env_var: impl Into<String>) -> Self {
        self.api_key_env = Some(env_var.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> Result<UnifiedBackend, BackendError> {
        let provider_type = self
            .provider_type
            .ok_or_else(|| BackendError::Config("Provider type not set".to_string()))?;
        let model = self
            .model
            .ok_or_else(|| BackendError::Config("Model not set".to_string()))?;
        let api_key = resolve_api_key(provider_type, self.api_key, self.api_key_env.as_deref())?;

        Ok(UnifiedBackend {
            provider_type,
            model,
            api_key,
            base_url: self
                .base_url
                .or_else(|| provider_type.default_base_url().map(String::from)),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }
}
