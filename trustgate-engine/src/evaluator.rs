//! Access decisions.
//!
//! Precedence for a category check, first match wins:
//!
//! 1. no trust relationship → deny
//! 2. unknown trust type → deny
//! 3. identifier matches an exclusion / deny entry → deny
//! 4. identifier matches an allow entry set by the override itself → allow
//! 5. identifier matches an allow entry of the merged rule → allow
//! 6. otherwise → deny
//!
//! Allows on pattern-operation categories are downgraded to deny when the
//! requested operation is not in the merged `operations`.
//!
//! The read path never fails: storage errors, corrupted records and the
//! like are logged and turned into a deny.

use crate::cache::{EffectiveRules, RuleCache, RuleKey};
use crate::error::{PermissionError, PermissionResult};
use crate::merge::merge;
use crate::pattern::{PatternCache, PatternKind};
use crate::registry::{normalize_acl_path, validate_acl_rule, TrustTypeRegistry};
use crate::resolver::TrustRelationshipResolver;
use crate::store::TrustPermissionStore;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};
use trustgate_types::{AccessDecision, AclAccess, Category, DecisionReason};

pub struct PermissionEvaluator {
    registry: Arc<TrustTypeRegistry>,
    store: Arc<TrustPermissionStore>,
    resolver: Arc<dyn TrustRelationshipResolver>,
    patterns: Arc<PatternCache>,
    rules: Arc<RuleCache>,
    warm_on_first_evaluate: bool,
    warmed: OnceCell<()>,
}

impl PermissionEvaluator {
    pub fn new(
        registry: Arc<TrustTypeRegistry>,
        store: Arc<TrustPermissionStore>,
        resolver: Arc<dyn TrustRelationshipResolver>,
        patterns: Arc<PatternCache>,
        rules: Arc<RuleCache>,
        warm_on_first_evaluate: bool,
    ) -> Self {
        Self {
            registry,
            store,
            resolver,
            patterns,
            rules,
            warm_on_first_evaluate,
            warmed: OnceCell::new(),
        }
    }

    /// Seeds the registry and compiles every registered pattern.
    /// Single-flight: concurrent callers share one run.
    pub async fn warm(&self) -> PermissionResult<()> {
        self.warmed
            .get_or_try_init(|| async {
                let defs = self.registry.list().await?;
                for def in &defs {
                    for (category, pattern) in def.permissions.pattern_entries() {
                        self.patterns.validate(category, pattern)?;
                    }
                    for rule in &def.acl_rules {
                        validate_acl_rule(&self.patterns, rule)?;
                    }
                }
                debug!(
                    "warmed permission evaluator: {} trust types, {} compiled patterns",
                    defs.len(),
                    self.patterns.len()
                );
                Ok::<(), PermissionError>(())
            })
            .await?;
        Ok(())
    }

    pub fn is_warm(&self) -> bool {
        self.warmed.initialized()
    }

    async fn lazy_warm(&self) {
        if !self.warm_on_first_evaluate || self.warmed.initialized() {
            return;
        }
        if let Err(e) = self.warm().await {
            warn!("permission evaluator warm-up failed, will retry: {}", e);
        }
    }

    /// Decides whether `peer_id` may perform `operation` on `identifier`
    /// within `category` of `actor_id`'s resources.
    pub async fn evaluate(
        &self,
        actor_id: &str,
        peer_id: &str,
        category: Category,
        identifier: &str,
        operation: Option<&str>,
    ) -> AccessDecision {
        self.lazy_warm().await;
        match self
            .try_evaluate(actor_id, peer_id, category, identifier, operation)
            .await
        {
            Ok(decision) => {
                debug!(
                    "{} {} {}:{} → {}",
                    actor_id, peer_id, category, identifier, decision
                );
                decision
            }
            Err(e) => {
                error!(
                    "permission evaluation failed for actor {} peer {} ({}:{}), denying: {}",
                    actor_id, peer_id, category, identifier, e
                );
                AccessDecision::deny(DecisionReason::EvaluationError)
            }
        }
    }

    async fn try_evaluate(
        &self,
        actor_id: &str,
        peer_id: &str,
        category: Category,
        identifier: &str,
        operation: Option<&str>,
    ) -> PermissionResult<AccessDecision> {
        let Some(trust_type) = self.resolver.resolve_trust_type(actor_id, peer_id).await? else {
            return Ok(AccessDecision::deny(DecisionReason::TrustRelationshipNotFound));
        };
        let Some(rules) = self
            .effective_rules(&trust_type, actor_id, peer_id, category)
            .await?
        else {
            return Ok(AccessDecision::deny(DecisionReason::TrustTypeNotFound));
        };
        self.decide(&rules, category, identifier, operation)
    }

    /// Merged rule snapshot for one key, from cache or freshly computed.
    /// `None` when the trust type is not registered.
    pub async fn effective_rules(
        &self,
        trust_type: &str,
        actor_id: &str,
        peer_id: &str,
        category: Category,
    ) -> PermissionResult<Option<Arc<EffectiveRules>>> {
        let key = RuleKey::new(trust_type, actor_id, peer_id, category);
        if let Some(hit) = self.rules.get(&key).await {
            return Ok(Some(hit));
        }

        let generation = self.rules.generation();
        let Some(def) = self.registry.get(trust_type).await? else {
            return Ok(None);
        };
        let ov = self.store.get_override(actor_id, peer_id).await?;
        let override_rule = ov.as_ref().and_then(|o| o.permissions.patch(category));
        let effective = merge(
            &def.permissions.rule(category),
            override_rule.as_ref(),
            true,
        );

        let rules = Arc::new(EffectiveRules {
            effective,
            override_rule,
        });
        self.rules
            .insert_if_current(key, generation, rules.clone())
            .await;
        Ok(Some(rules))
    }

    fn decide(
        &self,
        rules: &EffectiveRules,
        category: Category,
        identifier: &str,
        operation: Option<&str>,
    ) -> PermissionResult<AccessDecision> {
        let effective = &rules.effective;
        if self
            .patterns
            .matches_any(category, effective.deny_entries(), identifier)?
        {
            return Ok(AccessDecision::deny(DecisionReason::ExplicitDeny));
        }

        let override_allows = match rules.override_rule.as_ref().and_then(|p| p.allow_entries()) {
            Some(entries) => self.patterns.matches_any(category, entries, identifier)?,
            None => false,
        };
        let reason = if override_allows {
            DecisionReason::ExplicitOverrideAllow
        } else if self
            .patterns
            .matches_any(category, effective.allow_entries(), identifier)?
        {
            DecisionReason::TrustTypeAllow
        } else {
            return Ok(AccessDecision::deny(DecisionReason::DefaultDeny));
        };

        if let (Some(op), Some(ops)) = (operation, effective.operations()) {
            if !ops.contains(op) {
                return Ok(AccessDecision::deny(DecisionReason::OperationNotPermitted));
            }
        }
        Ok(AccessDecision::allow(reason))
    }

    /// Endpoint check: the first ACL rule of the trust type whose path
    /// matches and whose methods cover `method` decides. No match rejects.
    pub async fn evaluate_acl(&self, trust_type: &str, path: &str, method: &str) -> bool {
        self.lazy_warm().await;
        match self.try_evaluate_acl(trust_type, path, method).await {
            Ok(allowed) => {
                debug!("acl {} {} {} → {}", trust_type, method, path, allowed);
                allowed
            }
            Err(e) => {
                error!(
                    "ACL evaluation failed for trust type {} ({} {}), rejecting: {}",
                    trust_type, method, path, e
                );
                false
            }
        }
    }

    async fn try_evaluate_acl(
        &self,
        trust_type: &str,
        path: &str,
        method: &str,
    ) -> PermissionResult<bool> {
        let Some(def) = self.registry.get(trust_type).await? else {
            debug!("acl check for unknown trust type {}", trust_type);
            return Ok(false);
        };
        let path = normalize_acl_path(path);
        for rule in &def.acl_rules {
            let matcher = self
                .patterns
                .get_or_compile(normalize_acl_path(&rule.path_pattern), PatternKind::Path)?;
            if matcher.matches(path) && rule.covers_method(method) {
                return Ok(rule.access == AclAccess::Allow);
            }
        }
        Ok(false)
    }
}

impl std::fmt::Debug for PermissionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEvaluator")
            .field("warm_on_first_evaluate", &self.warm_on_first_evaluate)
            .field("warmed", &self.warmed.initialized())
            .finish()
    }
}
