//! Per-relationship permission overrides.
//!
//! Overrides are private to their actor: each actor has its own bucket,
//! keyed by peer id. Every pattern in an override is compiled before the
//! write, so a stored override can always be evaluated.
//!
//! The per-pair cache carries a generation counter bumped under its write
//! lock by every mutation. A read-through fill captured against an older
//! generation is not cached, so a read racing a delete cannot bring the
//! deleted record back.

use crate::cache::RuleCache;
use crate::config::EngineConfig;
use crate::error::{PermissionError, PermissionResult};
use crate::pattern::PatternCache;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};
use trustgate_storage::KvStore;
use trustgate_types::PermissionOverride;

type PairKey = (String, String);

fn pair_key(actor_id: &str, peer_id: &str) -> PairKey {
    (actor_id.to_string(), peer_id.to_string())
}

pub struct TrustPermissionStore {
    storage: Arc<dyn KvStore>,
    config: EngineConfig,
    patterns: Arc<PatternCache>,
    rules: Arc<RuleCache>,
    overrides: RwLock<HashMap<PairKey, Arc<PermissionOverride>>>,
    generation: AtomicU64,
}

impl TrustPermissionStore {
    pub fn new(
        storage: Arc<dyn KvStore>,
        config: &EngineConfig,
        patterns: Arc<PatternCache>,
        rules: Arc<RuleCache>,
    ) -> Self {
        Self {
            storage,
            config: config.clone(),
            patterns,
            rules,
            overrides: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn get_override(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> PermissionResult<Option<Arc<PermissionOverride>>> {
        let key = pair_key(actor_id, peer_id);
        if let Some(ov) = self.overrides.read().await.get(&key) {
            return Ok(Some(ov.clone()));
        }
        let generation = self.generation.load(Ordering::Acquire);
        let bucket = self.config.override_bucket(actor_id);
        let Some(json) = self.storage.get(&bucket, peer_id).await? else {
            return Ok(None);
        };
        let ov = Arc::new(serde_json::from_str::<PermissionOverride>(&json)?);
        let mut overrides = self.overrides.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("override for actor {} peer {} changed during read, not caching", actor_id, peer_id);
            return Ok(Some(ov));
        }
        Ok(Some(overrides.entry(key).or_insert(ov).clone()))
    }

    /// Validates, stamps `updated_at`, and upserts an override.
    pub async fn store_override(
        &self,
        mut ov: PermissionOverride,
    ) -> PermissionResult<Arc<PermissionOverride>> {
        self.validate(&ov)?;
        ov.updated_at = Utc::now();

        let json = serde_json::to_string(&ov)?;
        let bucket = self.config.override_bucket(&ov.actor_id);
        self.storage.put(&bucket, &ov.peer_id, &json).await?;

        let ov = Arc::new(ov);
        {
            let mut overrides = self.overrides.write().await;
            self.generation.fetch_add(1, Ordering::AcqRel);
            overrides.insert(pair_key(&ov.actor_id, &ov.peer_id), ov.clone());
        }
        self.rules.invalidate_pair(&ov.actor_id, &ov.peer_id).await;
        info!(
            "stored permission override for actor {} peer {} ({})",
            ov.actor_id, ov.peer_id, ov.trust_type
        );
        Ok(ov)
    }

    /// Removes an override. Absent overrides are not an error.
    pub async fn delete_override(&self, actor_id: &str, peer_id: &str) -> PermissionResult<()> {
        let bucket = self.config.override_bucket(actor_id);
        self.storage.delete(&bucket, peer_id).await?;
        {
            let mut overrides = self.overrides.write().await;
            self.generation.fetch_add(1, Ordering::AcqRel);
            overrides.remove(&pair_key(actor_id, peer_id));
        }
        self.rules.invalidate_pair(actor_id, peer_id).await;
        info!("deleted permission override for actor {} peer {}", actor_id, peer_id);
        Ok(())
    }

    /// Every override owned by `actor_id`, ordered by peer id.
    pub async fn list_overrides(&self, actor_id: &str) -> PermissionResult<Vec<Arc<PermissionOverride>>> {
        let bucket = self.config.override_bucket(actor_id);
        let mut out = Vec::new();
        for (_, json) in self.storage.list(&bucket).await? {
            out.push(Arc::new(serde_json::from_str::<PermissionOverride>(&json)?));
        }
        Ok(out)
    }

    /// Removes every override owned by `actor_id`. Returns how many were removed.
    ///
    /// The actor's cache slots are dropped even when a delete fails partway,
    /// so overrides already gone from storage stop applying.
    pub async fn delete_actor_overrides(&self, actor_id: &str) -> PermissionResult<usize> {
        let result = self.delete_bucket(actor_id).await;
        {
            let mut overrides = self.overrides.write().await;
            self.generation.fetch_add(1, Ordering::AcqRel);
            overrides.retain(|(actor, _), _| actor != actor_id);
        }
        self.rules.invalidate_actor(actor_id).await;
        let removed = result?;
        info!("deleted {} permission overrides for actor {}", removed, actor_id);
        Ok(removed)
    }

    async fn delete_bucket(&self, actor_id: &str) -> PermissionResult<usize> {
        let bucket = self.config.override_bucket(actor_id);
        let entries = self.storage.list(&bucket).await?;
        for (peer_id, _) in &entries {
            self.storage.delete(&bucket, peer_id).await?;
        }
        Ok(entries.len())
    }

    fn validate(&self, ov: &PermissionOverride) -> PermissionResult<()> {
        for (field, value) in [
            ("actor_id", &ov.actor_id),
            ("peer_id", &ov.peer_id),
            ("trust_type", &ov.trust_type),
        ] {
            if value.is_empty() {
                return Err(PermissionError::Validation(format!(
                    "override {field} must not be empty"
                )));
            }
        }
        ov.permissions.validate()?;
        for (category, pattern) in ov.permissions.pattern_entries() {
            self.patterns.validate(category, pattern)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TrustPermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustPermissionStore")
            .field("override_bucket_prefix", &self.config.override_bucket_prefix)
            .finish()
    }
}
