use crate::error::StorageResult;
use async_trait::async_trait;

/// Namespaced key-value bucket.
///
/// Each call is atomic for its own key. Implementations may be backed by a
/// remote service, so every operation can suspend.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a value. `Ok(None)` when the key is absent.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<String>>;

    /// Writes (upserts) a value.
    async fn put(&self, bucket: &str, key: &str, value: &str) -> StorageResult<()>;

    /// Removes a value. Removing an absent key is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Returns every `(key, value)` in a bucket, ordered by key.
    async fn list(&self, bucket: &str) -> StorageResult<Vec<(String, String)>>;
}
