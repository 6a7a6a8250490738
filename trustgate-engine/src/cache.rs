//! Effective-rule cache.
//!
//! Holds merged rule snapshots keyed by `(trust type, actor, peer, category)`.
//! Entries are `Arc`s replaced whole, so a reader either sees a complete old
//! snapshot or a complete new one. Every invalidation bumps a generation
//! counter under the write lock; a fill computed against an older generation
//! is discarded, which keeps a slow reader from re-inserting a snapshot
//! that a concurrent mutation already invalidated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use trustgate_types::{Category, CategoryPatch, CategoryRule};

/// Cache key for one merged rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub trust_type: String,
    pub actor_id: String,
    pub peer_id: String,
    pub category: Category,
}

impl RuleKey {
    pub fn new(trust_type: &str, actor_id: &str, peer_id: &str, category: Category) -> Self {
        Self {
            trust_type: trust_type.to_string(),
            actor_id: actor_id.to_string(),
            peer_id: peer_id.to_string(),
            category,
        }
    }
}

/// Immutable evaluation snapshot for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRules {
    /// Base rule merged with the override (`merge_base = true`).
    pub effective: CategoryRule,
    /// The override's own, unmerged rule for this category.
    pub override_rule: Option<CategoryPatch>,
}

#[derive(Default)]
pub struct RuleCache {
    entries: RwLock<HashMap<RuleKey, Arc<EffectiveRules>>>,
    generation: AtomicU64,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &RuleKey) -> Option<Arc<EffectiveRules>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Current generation. Capture before loading the inputs of a fill.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `rules` unless an invalidation happened since `generation`
    /// was captured. Returns whether the entry was stored.
    pub async fn insert_if_current(
        &self,
        key: RuleKey,
        generation: u64,
        rules: Arc<EffectiveRules>,
    ) -> bool {
        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        entries.insert(key, rules);
        true
    }

    /// Drops every entry derived from `trust_type`.
    pub async fn invalidate_trust_type(&self, trust_type: &str) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.retain(|k, _| k.trust_type != trust_type);
    }

    /// Drops every entry for the `(actor, peer)` relationship.
    pub async fn invalidate_pair(&self, actor_id: &str, peer_id: &str) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.retain(|k, _| !(k.actor_id == actor_id && k.peer_id == peer_id));
    }

    /// Drops every entry for one actor.
    pub async fn invalidate_actor(&self, actor_id: &str) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.retain(|k, _| k.actor_id != actor_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for RuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleCache")
            .field("generation", &self.generation())
            .finish()
    }
}
