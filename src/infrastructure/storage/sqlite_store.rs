use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use crate::application::ports::{KeyValueStore, StorageError};
use crate::shared::config::DatabaseConfig;

/// SQLite-backed durable medium: a single `offline_store` table keyed by
/// the queue's fixed namespaced keys. Survives process restarts.
pub struct SqliteKeyValueStore {
    pool: Pool<Sqlite>,
}

impl SqliteKeyValueStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Opens the database from config and applies pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM offline_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| StorageError::ReadFailed(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO offline_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_memory_store() -> SqliteKeyValueStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteKeyValueStore::new(pool)
    }

    #[tokio::test]
    async fn test_missing_key_reads_as_none() {
        let store = setup_memory_store().await;
        assert_eq!(store.get("lunara_offline_data").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let store = setup_memory_store().await;
        store.set("lunara_offline_data", "[]").await.unwrap();
        assert_eq!(
            store.get("lunara_offline_data").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_set_overwrites_existing_value() {
        let store = setup_memory_store().await;
        store.set("lunara_pending_sync", "[1]").await.unwrap();
        store.set("lunara_pending_sync", "[1,2]").await.unwrap();
        assert_eq!(
            store.get("lunara_pending_sync").await.unwrap().as_deref(),
            Some("[1,2]")
        );
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("offline.db").display()
            ),
            max_connections: 1,
            connection_timeout: 5,
        };

        let store = SqliteKeyValueStore::connect(&config).await.unwrap();
        store
            .set("lunara_offline_data", r#"[{"id":"mood-entry-1-abc"}]"#)
            .await
            .unwrap();
        store.pool.close().await;
        drop(store);

        let reopened = SqliteKeyValueStore::connect(&config).await.unwrap();
        assert_eq!(
            reopened.get("lunara_offline_data").await.unwrap().as_deref(),
            Some(r#"[{"id":"mood-entry-1-abc"}]"#)
        );
    }
}
