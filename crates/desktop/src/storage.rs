//! Persisted session state.
//!
//! Four entries survive a restart: the access token, the refresh token, the
//! signed-in user and an optional cache of the user directory. They are
//! written by login, refresh and confirmed dashboard changes, read once at
//! startup, and removed together on logout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use thiserror::Error;
use tokio::sync::Mutex;

use erpdesk_auth::{Credentials, User};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt entry '{key}': {message}")]
    Corrupt { key: &'static str, message: String },
    #[error("no storage location available: {0}")]
    Location(String),
}

impl StorageError {
    fn backend(err: impl core::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Key of a persisted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    User,
    UserList,
}

impl StorageKey {
    pub const ALL: [StorageKey; 4] = [
        StorageKey::AccessToken,
        StorageKey::RefreshToken,
        StorageKey::User,
        StorageKey::UserList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::AccessToken => "access",
            StorageKey::RefreshToken => "refresh",
            StorageKey::User => "user",
            StorageKey::UserList => "all_users",
        }
    }
}

/// Key/value backend for session state.
///
/// `set_many` and `remove` must apply all-or-nothing.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    async fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StorageError>;

    async fn remove(&self, keys: &[StorageKey]) -> Result<(), StorageError>;

    async fn set(&self, key: StorageKey, value: String) -> Result<(), StorageError> {
        self.set_many(&[(key, value)]).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed access
// ─────────────────────────────────────────────────────────────────────────────

/// Typed view over a [`SessionStorage`] backend.
#[derive(Clone)]
pub struct SessionVault {
    backend: Arc<dyn SessionStorage>,
}

impl SessionVault {
    pub fn new(backend: Arc<dyn SessionStorage>) -> Self {
        Self { backend }
    }

    pub async fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.backend.get(StorageKey::AccessToken).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.backend.get(StorageKey::RefreshToken).await
    }

    pub async fn store_credentials(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.backend
            .set_many(&[
                (StorageKey::AccessToken, credentials.access_token.clone()),
                (StorageKey::RefreshToken, credentials.refresh_token.clone()),
            ])
            .await
    }

    pub async fn store_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.backend.set(StorageKey::AccessToken, token.to_string()).await
    }

    pub async fn user(&self) -> Result<Option<User>, StorageError> {
        self.get_json(StorageKey::User).await
    }

    pub async fn store_user(&self, user: &User) -> Result<(), StorageError> {
        self.set_json(StorageKey::User, user).await
    }

    pub async fn user_list(&self) -> Result<Option<Vec<User>>, StorageError> {
        self.get_json(StorageKey::UserList).await
    }

    pub async fn store_user_list(&self, users: &[User]) -> Result<(), StorageError> {
        self.set_json(StorageKey::UserList, users).await
    }

    /// Remove every session entry in one step.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(&StorageKey::ALL).await
    }

    async fn get_json<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.as_str(),
                message: e.to_string(),
            })
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<(), StorageError> {
        let payload = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
            key: key.as_str(),
            message: e.to_string(),
        })?;
        self.backend.set(key, payload).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(&key).cloned())
    }

    async fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().await;
        for (key, value) in entries {
            guard.insert(*key, value.clone());
        }
        Ok(())
    }

    async fn remove(&self, keys: &[StorageKey]) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().await;
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite backend
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed storage so a session survives restarts.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    path: PathBuf,
    /// Lazily opened on first use.
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteStorage {
    /// Storage backed by the database file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Storage at `{dir}/session.db`.
    pub fn in_directory(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("session.db"))
    }

    /// Storage at `{app_data_dir}/erpdesk/session.db`.
    pub fn in_default_location() -> Result<Self, StorageError> {
        Ok(Self::new(default_db_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn pool(&self) -> Result<SqlitePool, StorageError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Location(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_entries (
                key       TEXT PRIMARY KEY NOT NULL,
                value     TEXT NOT NULL,
                saved_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(StorageError::backend)?;

        tracing::debug!(path = %self.path.display(), "opened session storage");

        *guard = Some(pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl SessionStorage for SqliteStorage {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        let pool = self.pool().await?;

        let row = sqlx::query(
            r#"
            SELECT value
            FROM session_entries
            WHERE key = ?1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&pool)
        .await
        .map_err(StorageError::backend)?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(StorageError::backend)
    }

    async fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        let now = Utc::now().to_rfc3339();

        let mut tx = pool.begin().await.map_err(StorageError::backend)?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO session_entries (key, value, saved_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key)
                DO UPDATE SET
                    value = excluded.value,
                    saved_at = excluded.saved_at
                "#,
            )
            .bind(key.as_str())
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::backend)?;
        }
        tx.commit().await.map_err(StorageError::backend)
    }

    async fn remove(&self, keys: &[StorageKey]) -> Result<(), StorageError> {
        let pool = self.pool().await?;

        let mut tx = pool.begin().await.map_err(StorageError::backend)?;
        for key in keys {
            sqlx::query("DELETE FROM session_entries WHERE key = ?1")
                .bind(key.as_str())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::backend)?;
        }
        tx.commit().await.map_err(StorageError::backend)
    }
}

/// Resolve `{app_data_dir}/erpdesk/session.db`.
fn default_db_path() -> Result<PathBuf, StorageError> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or_else(|| {
            StorageError::Location(
                "tried data_dir() and home_dir()/.local/share".to_string(),
            )
        })?;

    Ok(base.join("erpdesk").join("session.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpdesk_auth::Role;
    use erpdesk_core::UserId;

    fn sample_user() -> User {
        User {
            id: UserId::new(1),
            username: "admin".into(),
            email: "admin@erp.local".into(),
            first_name: "Ada".into(),
            last_name: "Min".into(),
            role: Role::Admin,
        }
    }

    async fn exercise(vault: SessionVault) {
        assert_eq!(vault.access_token().await.unwrap(), None);

        vault
            .store_credentials(&Credentials::new("a1", "r1"))
            .await
            .unwrap();
        vault.store_user(&sample_user()).await.unwrap();
        vault.store_user_list(&[sample_user()]).await.unwrap();
        vault.store_access_token("a2").await.unwrap();

        assert_eq!(vault.access_token().await.unwrap().as_deref(), Some("a2"));
        assert_eq!(vault.refresh_token().await.unwrap().as_deref(), Some("r1"));
        assert_eq!(vault.user().await.unwrap(), Some(sample_user()));
        assert_eq!(vault.user_list().await.unwrap().map(|l| l.len()), Some(1));

        vault.clear().await.unwrap();
        vault.clear().await.unwrap();
        assert_eq!(vault.access_token().await.unwrap(), None);
        assert_eq!(vault.refresh_token().await.unwrap(), None);
        assert_eq!(vault.user().await.unwrap(), None);
        assert_eq!(vault.user_list().await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_storage_round_trips_and_clears() {
        exercise(SessionVault::new(Arc::new(MemoryStorage::new()))).await;
    }

    #[tokio::test]
    async fn sqlite_storage_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        exercise(SessionVault::new(Arc::new(SqliteStorage::in_directory(dir.path())))).await;
    }

    #[tokio::test]
    async fn sqlite_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let first = SessionVault::new(Arc::new(SqliteStorage::in_directory(dir.path())));
        first.store_user(&sample_user()).await.unwrap();
        drop(first);

        let second = SessionVault::new(Arc::new(SqliteStorage::in_directory(dir.path())));
        assert_eq!(second.user().await.unwrap(), Some(sample_user()));
    }

    #[tokio::test]
    async fn corrupt_user_entry_is_reported() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(StorageKey::User, "{not json".into()).await.unwrap();

        let err = SessionVault::new(storage).user().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { key: "user", .. }));
    }
}
