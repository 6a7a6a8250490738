//! In-process bucket store.

use crate::error::StorageResult;
use crate::kv::KvStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory [`KvStore`]. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    buckets: Arc<RwLock<HashMap<String, BTreeMap<String, String>>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys in a bucket.
    pub async fn bucket_len(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for MemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKvStore").finish()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned())
    }

    async fn put(&self, bucket: &str, key: &str, value: &str) -> StorageResult<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        if let Some(b) = buckets.get_mut(bucket) {
            b.remove(key);
            if b.is_empty() {
                buckets.remove(bucket);
            }
        }
        Ok(())
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<(String, String)>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
