//! SQLite store for summarization state and settings

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use recap_core::{
    ConfigStore, ConversationId, Result, StateStore, SummarizationConfig, SummarizationError,
    SummarizationState,
};

const CONFIG_KEY: &str = "summarization_config";

pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    pub async fn new(path: &str) -> Result<Self> {
        let pool = Self::connect(path, None).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Single-connection in-memory database; every pooled connection would otherwise get its own.
    pub async fn in_memory() -> Result<Self> {
        let pool = Self::connect(":memory:", Some(1)).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn connect(path: &str, max_connections: Option<u32>) -> Result<sqlx::SqlitePool> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(path)
            .map_err(persistence)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let mut pool = sqlx::sqlite::SqlitePoolOptions::new();
        if let Some(max) = max_connections {
            pool = pool.max_connections(max);
        }
        pool.connect_with(options).await.map_err(persistence)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS summarization_state (
                conversation_id TEXT PRIMARY KEY,
                updated_at TEXT NOT NULL,
                summary_count INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }
}

fn persistence(err: impl std::fmt::Display) -> SummarizationError {
    SummarizationError::PersistenceFailure(err.to_string())
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn load_state(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<SummarizationState>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM summarization_state WHERE conversation_id = ?")
                .bind(conversation_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn save_state(
        &self,
        conversation_id: &ConversationId,
        state: &SummarizationState,
    ) -> Result<()> {
        let data = serde_json::to_string(state)?;

        sqlx::query(
            r#"
            INSERT INTO summarization_state (conversation_id, updated_at, summary_count, data)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(conversation_id) DO UPDATE SET
                updated_at = excluded.updated_at,
                summary_count = excluded.summary_count,
                data = excluded.data
            "#,
        )
        .bind(conversation_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(state.summary_count() as i64)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        debug!(conversation = %conversation_id, "Saved summarization state to sqlite");
        Ok(())
    }

    async fn delete_state(&self, conversation_id: &ConversationId) -> Result<()> {
        sqlx::query("DELETE FROM summarization_state WHERE conversation_id = ?")
            .bind(conversation_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT conversation_id FROM summarization_state ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows.into_iter().map(|(id,)| ConversationId::new(id)).collect())
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    async fn load_config(&self) -> Result<Option<SummarizationConfig>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(CONFIG_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        match row {
            Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn save_config(&self, config: &SummarizationConfig) -> Result<()> {
        let value = serde_json::to_string(config)?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(CONFIG_KEY)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }
}
