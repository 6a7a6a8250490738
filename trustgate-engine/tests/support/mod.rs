//! Shared helpers for engine integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use trustgate_engine::{EngineConfig, PermissionEngine, StaticTrustResolver, TrustRelationshipResolver};
use trustgate_storage::{KvStore, MemoryKvStore, StorageError, StorageResult};

pub const ACTOR: &str = "actor-1";
pub const PEER: &str = "peer-1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Memory store that can be switched into a failing state and counts reads.
#[derive(Default)]
pub struct FlakyKvStore {
    inner: MemoryKvStore,
    failing: AtomicBool,
    reads: AtomicUsize,
    /// Deletes left before every further delete fails. `None` is unlimited.
    delete_budget: Mutex<Option<usize>>,
}

impl FlakyKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Lets `n` more deletes succeed, then fails every later one.
    pub fn fail_deletes_after(&self, n: usize) {
        *self.delete_budget.lock().unwrap() = Some(n);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("backend offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyKvStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.inner.put(bucket, key, value).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.check()?;
        {
            let mut budget = self.delete_budget.lock().unwrap();
            match budget.as_mut() {
                Some(0) => return Err(StorageError::Unavailable("delete rejected".into())),
                Some(n) => *n -= 1,
                None => {}
            }
        }
        self.inner.delete(bucket, key).await
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<(String, String)>> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list(bucket).await
    }
}

/// Memory store whose next `get` on an armed bucket reads the value, then
/// parks until released.
#[derive(Default)]
pub struct GatedKvStore {
    inner: MemoryKvStore,
    armed: Mutex<Option<String>>,
    reached: Notify,
    release: Notify,
}

impl GatedKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the next `get` on `bucket`. Later gets pass straight through.
    pub fn arm(&self, bucket: &str) {
        *self.armed.lock().unwrap() = Some(bucket.to_string());
    }

    /// Waits until the armed `get` has read its value and parked.
    pub async fn wait_parked(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    fn take_gate(&self, bucket: &str) -> bool {
        let mut armed = self.armed.lock().unwrap();
        if armed.as_deref() == Some(bucket) {
            *armed = None;
            return true;
        }
        false
    }
}

#[async_trait]
impl KvStore for GatedKvStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        let value = self.inner.get(bucket, key).await?;
        if self.take_gate(bucket) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        Ok(value)
    }

    async fn put(&self, bucket: &str, key: &str, value: &str) -> StorageResult<()> {
        self.inner.put(bucket, key, value).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.inner.delete(bucket, key).await
    }

    async fn list(&self, bucket: &str) -> StorageResult<Vec<(String, String)>> {
        self.inner.list(bucket).await
    }
}

/// Resolver whose backend is always down.
pub struct FailingResolver;

#[async_trait]
impl TrustRelationshipResolver for FailingResolver {
    async fn resolve_trust_type(&self, _actor: &str, _peer: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("relationship service offline".into()))
    }
}

pub struct Harness {
    pub engine: PermissionEngine,
    pub storage: Arc<FlakyKvStore>,
    pub resolver: Arc<StaticTrustResolver>,
}

/// Engine over a flaky memory store with an empty relationship table.
pub fn harness() -> Harness {
    harness_with_config(EngineConfig::default())
}

pub fn harness_with_config(config: EngineConfig) -> Harness {
    init_tracing();
    let storage = Arc::new(FlakyKvStore::new());
    let resolver = Arc::new(StaticTrustResolver::new());
    let engine = PermissionEngine::new(config, storage.clone(), resolver.clone());
    Harness {
        engine,
        storage,
        resolver,
    }
}

/// Harness with `ACTOR` → `PEER` related through `trust_type`.
pub async fn related(trust_type: &str) -> Harness {
    let h = harness();
    h.resolver.set_relationship(ACTOR, PEER, trust_type).await;
    h
}
