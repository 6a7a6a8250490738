//! Trust relationship lookup.
//!
//! The relationship lifecycle (creation, approval, deletion) lives outside
//! this crate. The engine only needs to know which trust type currently
//! applies to an `(actor, peer)` pair.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use trustgate_storage::StorageResult;

/// Supplies the active trust type for a relationship.
#[async_trait]
pub trait TrustRelationshipResolver: Send + Sync {
    /// Returns the trust type name, or `None` if no relationship exists.
    async fn resolve_trust_type(&self, actor_id: &str, peer_id: &str)
    -> StorageResult<Option<String>>;
}

/// In-memory relationship table.
#[derive(Default)]
pub struct StaticTrustResolver {
    relationships: RwLock<HashMap<(String, String), String>>,
}

impl StaticTrustResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or changes) the trust type of a relationship.
    pub async fn set_relationship(&self, actor_id: &str, peer_id: &str, trust_type: &str) {
        self.relationships.write().await.insert(
            (actor_id.to_string(), peer_id.to_string()),
            trust_type.to_string(),
        );
    }

    /// Removes a relationship. Returns `true` if it existed.
    pub async fn remove_relationship(&self, actor_id: &str, peer_id: &str) -> bool {
        self.relationships
            .write()
            .await
            .remove(&(actor_id.to_string(), peer_id.to_string()))
            .is_some()
    }

    pub async fn len(&self) -> usize {
        self.relationships.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.relationships.read().await.is_empty()
    }
}

impl std::fmt::Debug for StaticTrustResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTrustResolver").finish()
    }
}

#[async_trait]
impl TrustRelationshipResolver for StaticTrustResolver {
    async fn resolve_trust_type(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> StorageResult<Option<String>> {
        Ok(self
            .relationships
            .read()
            .await
            .get(&(actor_id.to_string(), peer_id.to_string()))
            .cloned())
    }
}
