use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::RwLock;

mod persistence;

pub use persistence::{FormPersistence, StoredForm, DEFAULT_FORM_EXPIRY_HOURS};

/// Named slots of the durable local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    SessionId,
    FormData,
    Language,
    /// Reserved for a cached result; nothing writes it yet.
    LastResult,
}

impl SlotKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKey::SessionId => "kanpo_ai_session_id",
            SlotKey::FormData => "kanpo_ai_form_data",
            SlotKey::Language => "kanpo_ai_language",
            SlotKey::LastResult => "kanpo_ai_last_result",
        }
    }
}

/// String key/value store with last-write-wins semantics.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn get(&self, key: SlotKey) -> Result<Option<String>>;
    async fn put(&self, key: SlotKey, value: &str) -> Result<()>;
    async fn remove(&self, key: SlotKey) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<SlotKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn get(&self, key: SlotKey) -> Result<Option<String>> {
        Ok(self.slots.read().await.get(&key).cloned())
    }

    async fn put(&self, key: SlotKey, value: &str) -> Result<()> {
        self.slots.write().await.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: SlotKey) -> Result<()> {
        self.slots.write().await.remove(&key);
        Ok(())
    }
}

/// SQLite backed slot store; survives restarts when given a file URL.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_slots_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_slots_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_slots (
                slot_key   TEXT PRIMARY KEY NOT NULL,
                slot_value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure local_slots table exists")?;
        Ok(())
    }
}

#[async_trait]
impl SlotStore for Storage {
    async fn get(&self, key: SlotKey) -> Result<Option<String>> {
        let row = sqlx::query("SELECT slot_value FROM local_slots WHERE slot_key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read slot {}", key.as_str()))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn put(&self, key: SlotKey, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO local_slots (slot_key, slot_value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(slot_key) DO UPDATE SET slot_value = excluded.slot_value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write slot {}", key.as_str()))?;
        Ok(())
    }

    async fn remove(&self, key: SlotKey) -> Result<()> {
        sqlx::query("DELETE FROM local_slots WHERE slot_key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove slot {}", key.as_str()))?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
