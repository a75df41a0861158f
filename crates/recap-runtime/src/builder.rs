use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use recap_core::{
    ChatHost, ConfigStore, GenerationBackend, Result, StateStore, SummarizationConfig,
    SummarizationError, SummaryHooks,
};
use recap_memory::{CompositeHooks, NoopHooks};
use recap_storage::{StorageConfig, Stores, create_store};

use crate::session::SummarizationSession;
use crate::settings::RecapSettings;

pub struct SessionBuilder {
    host: Option<Arc<dyn ChatHost>>,
    backend: Option<Arc<dyn GenerationBackend>>,
    state_store: Option<Arc<dyn StateStore>>,
    config_store: Option<Arc<dyn ConfigStore>>,
    storage_config: Option<StorageConfig>,
    hooks: Vec<Arc<dyn SummaryHooks>>,
    config: Option<SummarizationConfig>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            backend: None,
            state_store: None,
            config_store: None,
            storage_config: None,
            hooks: Vec::new(),
            config: None,
        }
    }

    /// Backend, storage and initial settings taken from a settings file.
    pub fn from_settings(settings: RecapSettings) -> Result<Self> {
        settings.validate()?;
        let backend = settings.backend.build()?;
        Ok(Self::new()
            .backend(backend)
            .storage_config(settings.storage)
            .config(settings.summarization))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_settings(RecapSettings::from_yaml_file(path)?)
    }

    pub fn host(mut self, host: Arc<dyn ChatHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    pub fn config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    pub fn stores(mut self, stores: Stores) -> Self {
        self.state_store = Some(stores.state);
        self.config_store = Some(stores.config);
        self
    }

    pub fn storage_config(mut self, config: StorageConfig) -> Self {
        self.storage_config = Some(config);
        self
    }

    /// Adds an observer. Several observers are combined in registration order.
    pub fn hooks(mut self, hooks: Arc<dyn SummaryHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// Initial settings, used until a stored configuration exists.
    pub fn config(mut self, config: SummarizationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn build(self) -> Result<SummarizationSession> {
        let host = self
            .host
            .ok_or_else(|| SummarizationError::InvalidConfig("Chat host is required".into()))?;
        let backend = self.backend.ok_or_else(|| {
            SummarizationError::InvalidConfig("Generation backend is required".into())
        })?;

        let configured = match &self.storage_config {
            Some(storage_config) => create_store(storage_config).await?,
            None => None,
        };
        let fallback = configured.unwrap_or_else(Stores::in_memory);
        let state_store = self.state_store.unwrap_or(fallback.state);
        let config_store = self.config_store.unwrap_or(fallback.config);

        let config = match config_store.load_config().await? {
            Some(stored) => {
                debug!("Using stored summarization settings");
                stored
            }
            None => self.config.unwrap_or_default(),
        };
        config.validate()?;

        let hooks: Arc<dyn SummaryHooks> = match self.hooks.len() {
            0 => Arc::new(NoopHooks),
            1 => self.hooks.into_iter().next().unwrap_or_else(|| Arc::new(NoopHooks)),
            _ => Arc::new(CompositeHooks::with_hooks(self.hooks)),
        };

        Ok(SummarizationSession::new(
            host,
            backend,
            state_store,
            config_store,
            hooks,
            config,
        ))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use recap_llm::MockBackend;
    use recap_storage::InMemoryStore;

    #[tokio::test]
    async fn test_build_requires_host_and_backend() {
        let err = SessionBuilder::new()
            .backend(Arc::new(MockBackend::default()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Chat host is required"));

        let err = SessionBuilder::new()
            .host(Arc::new(FakeHost::default()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Generation backend is required"));
    }

    #[tokio::test]
    async fn test_stored_config_wins_over_initial() {
        let store = InMemoryStore::new();
        store
            .save_config(&SummarizationConfig::new(3000).with_enabled(true))
            .await
            .unwrap();

        let session = SessionBuilder::new()
            .host(Arc::new(FakeHost::default()))
            .backend(Arc::new(MockBackend::default()))
            .stores(Stores::from_store(store))
            .config(SummarizationConfig::new(500))
            .build()
            .await
            .unwrap();

        assert_eq!(session.config().token_threshold, 3000);
        assert!(session.is_enabled());
    }

    #[tokio::test]
    async fn test_defaults_without_storage() {
        let session = SessionBuilder::new()
            .host(Arc::new(FakeHost::default()))
            .backend(Arc::new(MockBackend::new("scripted")))
            .build()
            .await
            .unwrap();

        assert_eq!(session.config(), SummarizationConfig::default());
        assert_eq!(session.backend_name(), "scripted");
    }

    #[tokio::test]
    async fn test_invalid_initial_config_rejected() {
        let result = SessionBuilder::new()
            .host(Arc::new(FakeHost::default()))
            .backend(Arc::new(MockBackend::default()))
            .config(SummarizationConfig::new(10))
            .build()
            .await;
        assert!(matches!(result, Err(SummarizationError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_from_settings_with_file_storage() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let yaml = format!(
            "summarization:\n  token_threshold: 400\n  enabled: true\nstorage:\n  type: file\n  path: {}\nbackend:\n  provider: mock\n  mock_response: done\n",
            temp_dir.path().display()
        );
        let settings = RecapSettings::from_yaml(&yaml).unwrap();

        let session = SessionBuilder::from_settings(settings)
            .unwrap()
            .host(Arc::new(FakeHost::default()))
            .build()
            .await
            .unwrap();
        assert_eq!(session.config().token_threshold, 400);

        session.set_token_threshold(900).await.unwrap();
        assert!(temp_dir.path().join("config.yaml").exists());
    }
}
