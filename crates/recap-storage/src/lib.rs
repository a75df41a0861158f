//! State and configuration stores for recap

mod file;
mod in_memory;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use recap_core::{ConfigStore, Result, StateStore, SummarizationError};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File { path: String },
    #[serde(rename = "sqlite")]
    Sqlite { path: String },
}

/// Both store roles, usually backed by the same object.
#[derive(Clone)]
pub struct Stores {
    pub state: Arc<dyn StateStore>,
    pub config: Arc<dyn ConfigStore>,
}

impl Stores {
    pub fn from_store<S>(store: S) -> Self
    where
        S: StateStore + ConfigStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            state: store.clone(),
            config: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(InMemoryStore::new())
    }
}

/// Builds the configured stores. `None` means the caller keeps nothing across restarts.
pub async fn create_store(config: &StorageConfig) -> Result<Option<Stores>> {
    match config {
        StorageConfig::None => Ok(None),
        StorageConfig::Memory => Ok(Some(Stores::in_memory())),
        StorageConfig::File { path } => Ok(Some(Stores::from_store(FileStore::new(path)))),

        #[cfg(feature = "sqlite")]
        StorageConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Some(Stores::from_store(store)))
        }

        #[cfg(not(feature = "sqlite"))]
        StorageConfig::Sqlite { .. } => Err(SummarizationError::InvalidConfig(
            "SQLite storage requires 'sqlite' feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::{ConversationId, SummarizationState};

    #[test]
    fn test_storage_config_yaml() {
        let config: StorageConfig = serde_yaml::from_str("type: file\npath: ./recap-data").unwrap();
        assert_eq!(
            config,
            StorageConfig::File {
                path: "./recap-data".to_string()
            }
        );

        let config: StorageConfig = serde_yaml::from_str("type: memory").unwrap();
        assert_eq!(config, StorageConfig::Memory);
        assert_eq!(StorageConfig::default(), StorageConfig::None);
    }

    #[tokio::test]
    async fn test_create_store_none() {
        assert!(create_store(&StorageConfig::None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_store_memory_shares_backing() {
        let stores = create_store(&StorageConfig::Memory).await.unwrap().unwrap();
        let id = ConversationId::new("c1");
        stores
            .state
            .save_state(&id, &SummarizationState::new())
            .await
            .unwrap();
        assert_eq!(stores.state.list_conversations().await.unwrap(), vec![id]);
        assert!(stores.config.load_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_store_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig::File {
            path: temp_dir.path().to_string_lossy().to_string(),
        };
        let stores = create_store(&config).await.unwrap().unwrap();
        stores
            .state
            .save_state(&ConversationId::new("c1"), &SummarizationState::new())
            .await
            .unwrap();
        assert!(temp_dir.path().join("c1.json").exists());
    }

    #[cfg(not(feature = "sqlite"))]
    #[tokio::test]
    async fn test_sqlite_requires_feature() {
        let config = StorageConfig::Sqlite {
            path: "recap.db".to_string(),
        };
        assert!(matches!(
            create_store(&config).await,
            Err(SummarizationError::InvalidConfig(_))
        ));
    }
}
