//! Engine facade: one constructible object wiring the registry, override
//! store, caches and evaluator around injected collaborators.

use crate::cache::RuleCache;
use crate::config::EngineConfig;
use crate::error::{PermissionError, PermissionResult};
use crate::evaluator::PermissionEvaluator;
use crate::merge::merge_permission_set;
use crate::pattern::PatternCache;
use crate::registry::TrustTypeRegistry;
use crate::resolver::TrustRelationshipResolver;
use crate::store::TrustPermissionStore;
use std::sync::Arc;
use trustgate_storage::KvStore;
use trustgate_types::{
    AccessDecision, Category, PermissionOverride, PermissionSet, TrustTypeDefinition,
};

/// Trust-based permission engine.
///
/// Construct one per process and share it. Construction does no I/O; call
/// [`warm`](Self::warm) to seed and precompile up front, or let the first
/// evaluation do it lazily.
pub struct PermissionEngine {
    config: EngineConfig,
    patterns: Arc<PatternCache>,
    rules: Arc<RuleCache>,
    registry: Arc<TrustTypeRegistry>,
    store: Arc<TrustPermissionStore>,
    resolver: Arc<dyn TrustRelationshipResolver>,
    evaluator: PermissionEvaluator,
}

impl PermissionEngine {
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn KvStore>,
        resolver: Arc<dyn TrustRelationshipResolver>,
    ) -> Self {
        let patterns = Arc::new(PatternCache::new(config.max_pattern_length));
        let rules = Arc::new(RuleCache::new());
        let registry = Arc::new(TrustTypeRegistry::new(
            storage.clone(),
            &config,
            patterns.clone(),
            rules.clone(),
        ));
        let store = Arc::new(TrustPermissionStore::new(
            storage,
            &config,
            patterns.clone(),
            rules.clone(),
        ));
        let evaluator = PermissionEvaluator::new(
            registry.clone(),
            store.clone(),
            resolver.clone(),
            patterns.clone(),
            rules.clone(),
            config.warm_on_first_evaluate,
        );
        Self {
            config,
            patterns,
            rules,
            registry,
            store,
            resolver,
            evaluator,
        }
    }

    pub async fn warm(&self) -> PermissionResult<()> {
        self.evaluator.warm().await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TrustTypeRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<TrustPermissionStore> {
        &self.store
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    pub fn pattern_cache(&self) -> &Arc<PatternCache> {
        &self.patterns
    }

    pub fn rule_cache(&self) -> &Arc<RuleCache> {
        &self.rules
    }

    // ── Trust types ─────────────────────────────────────────────

    pub async fn register_trust_type(&self, def: TrustTypeDefinition) -> PermissionResult<()> {
        self.registry.register(def).await
    }

    pub async fn get_trust_type(
        &self,
        name: &str,
    ) -> PermissionResult<Option<Arc<TrustTypeDefinition>>> {
        self.registry.get(name).await
    }

    pub async fn list_trust_types(&self) -> PermissionResult<Vec<Arc<TrustTypeDefinition>>> {
        self.registry.list().await
    }

    pub async fn unregister_trust_type(&self, name: &str) -> PermissionResult<bool> {
        self.registry.unregister(name).await
    }

    // ── Overrides ───────────────────────────────────────────────

    pub async fn get_override(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> PermissionResult<Option<Arc<PermissionOverride>>> {
        self.store.get_override(actor_id, peer_id).await
    }

    /// Stores an override after checking that its trust type exists.
    pub async fn store_override(
        &self,
        ov: PermissionOverride,
    ) -> PermissionResult<Arc<PermissionOverride>> {
        if self.registry.get(&ov.trust_type).await?.is_none() {
            return Err(PermissionError::Validation(format!(
                "override references unknown trust type {}",
                ov.trust_type
            )));
        }
        self.store.store_override(ov).await
    }

    pub async fn delete_override(&self, actor_id: &str, peer_id: &str) -> PermissionResult<()> {
        self.store.delete_override(actor_id, peer_id).await
    }

    pub async fn list_overrides(
        &self,
        actor_id: &str,
    ) -> PermissionResult<Vec<Arc<PermissionOverride>>> {
        self.store.list_overrides(actor_id).await
    }

    /// Hook for the relationship lifecycle: a relationship has ended.
    pub async fn on_relationship_deleted(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> PermissionResult<()> {
        self.store.delete_override(actor_id, peer_id).await
    }

    /// Hook for the relationship lifecycle: an actor has been deleted.
    pub async fn on_actor_deleted(&self, actor_id: &str) -> PermissionResult<usize> {
        self.store.delete_actor_overrides(actor_id).await
    }

    /// Administrative view of every category's merged rules for a
    /// relationship. `merge_base = false` shows the result of a full
    /// override instead of the union used on the request path.
    ///
    /// Returns `None` when there is no relationship or its trust type is
    /// not registered. Errors are surfaced, unlike [`evaluate`](Self::evaluate).
    pub async fn effective_permissions(
        &self,
        actor_id: &str,
        peer_id: &str,
        merge_base: bool,
    ) -> PermissionResult<Option<PermissionSet>> {
        let Some(trust_type) = self.resolver.resolve_trust_type(actor_id, peer_id).await? else {
            return Ok(None);
        };
        let Some(def) = self.registry.get(&trust_type).await? else {
            return Ok(None);
        };
        let ov = self.store.get_override(actor_id, peer_id).await?;
        Ok(Some(merge_permission_set(
            &def.permissions,
            ov.as_ref().map(|o| &o.permissions),
            merge_base,
        )))
    }

    // ── Evaluation ──────────────────────────────────────────────

    pub async fn evaluate(
        &self,
        actor_id: &str,
        peer_id: &str,
        category: Category,
        identifier: &str,
        operation: Option<&str>,
    ) -> AccessDecision {
        self.evaluator
            .evaluate(actor_id, peer_id, category, identifier, operation)
            .await
    }

    pub async fn evaluate_acl(&self, trust_type: &str, path: &str, method: &str) -> bool {
        self.evaluator.evaluate_acl(trust_type, path, method).await
    }
}

impl std::fmt::Debug for PermissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEngine")
            .field("config", &self.config)
            .field("evaluator", &self.evaluator)
            .finish()
    }
}
