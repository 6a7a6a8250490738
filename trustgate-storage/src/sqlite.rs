//! SQLite-backed bucket store.
//!
//! All buckets share one `kv` table keyed by `(bucket, key)`. Writes are
//! single-statement upserts, which gives per-key atomicity. Statements run
//! on tokio's blocking pool so a busy connection never stalls a worker.

use crate::error::{StorageError, StorageResult};
use crate::kv::KvStore;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistent [`KvStore`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        initialize_kv_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_kv_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Acquire the connection lock, recovering from poison left by a panic
    /// in another thread while the lock was held.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("SqliteKvStore recovering from poisoned mutex");
            poisoned.into_inner()
        })
    }

    /// Runs a synchronous helper on the blocking pool.
    async fn run_blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&SqliteKvStore) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::Backend(format!("SQLite task failed: {e}")))?
    }

    fn get_sync(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        let conn = self.lock_conn();
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_sync(&self, bucket: &str, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT OR REPLACE INTO kv (bucket, key, value) VALUES (?1, ?2, ?3)",
            params![bucket, key, value],
        )?;
        Ok(())
    }

    fn delete_sync(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let conn = self.lock_conn();
        conn.execute(
            "DELETE FROM kv WHERE bucket = ?1 AND key = ?2",
            params![bucket, key],
        )?;
        Ok(())
    }

    fn list_sync(&self, bucket: &str) -> StorageResult<Vec<(String, String)>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE bucket = ?1 ORDER BY key")?;
        let rows = stmt
            .query_map(params![bucket], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl std::fmt::Debug for SqliteKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteKvStore").finish()
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        let (bucket, key) = (bucket.to_string(), key.to_string());
        self.run_blocking(move |store| store.get_sync(&bucket, &key)).await
    }

    async fn put(&self, bucket: &str, key: &str, value: &str) -> StorageResult<()> {
        let (bucket, key, value) = (bucket.to_string(), key.to_string(), value.to_string());
        self.run_blocking(move |store| store.put_sync(&bucket, &key, &value)).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let (bucket, key) = (bucket.to_string(), key.to_string());
        self.run_blocking(move |store| store.delete_sync(&bucket, &key)).await
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<(String, String)>> {
        let bucket = bucket.to_string();
        self.run_blocking(move |store| store.list_sync(&bucket)).await
    }
}

fn initialize_kv_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            bucket TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (bucket, key)
        );
        "#,
    )?;
    Ok(())
}
