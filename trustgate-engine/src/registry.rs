//! Trust type registry.
//!
//! Definitions live in one global storage bucket as JSON. A definition is
//! immutable once registered: registering the same payload again is a
//! no-op, registering a different payload under an existing name is a
//! validation error. The built-in types are seeded on first access.
//!
//! Cache fills from storage are dropped when a register or unregister ran
//! while the read was in flight.

use crate::builtin::{builtin_trust_types, is_builtin};
use crate::cache::RuleCache;
use crate::config::EngineConfig;
use crate::error::{PermissionError, PermissionResult};
use crate::pattern::{PatternCache, PatternKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};
use trustgate_storage::KvStore;
use trustgate_types::{AclRule, TrustTypeDefinition};

/// Named permission templates shared across relationships.
pub struct TrustTypeRegistry {
    storage: Arc<dyn KvStore>,
    bucket: String,
    seed_builtins: bool,
    patterns: Arc<PatternCache>,
    rules: Arc<RuleCache>,
    /// Last-known definition per name.
    definitions: RwLock<HashMap<String, Arc<TrustTypeDefinition>>>,
    /// Bumped under the `definitions` write lock by every mutation.
    generation: AtomicU64,
    seeded: OnceCell<()>,
}

impl TrustTypeRegistry {
    pub fn new(
        storage: Arc<dyn KvStore>,
        config: &EngineConfig,
        patterns: Arc<PatternCache>,
        rules: Arc<RuleCache>,
    ) -> Self {
        Self {
            storage,
            bucket: config.trust_type_bucket.clone(),
            seed_builtins: config.seed_builtins,
            patterns,
            rules,
            definitions: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            seeded: OnceCell::new(),
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        is_builtin(name)
    }

    /// Inserts any missing built-in definition. Runs once per registry;
    /// a failed attempt is retried on the next access.
    async fn ensure_seeded(&self) -> PermissionResult<()> {
        if !self.seed_builtins {
            return Ok(());
        }
        self.seeded
            .get_or_try_init(|| async {
                let existing: HashSet<String> = self
                    .storage
                    .list(&self.bucket)
                    .await?
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect();
                for def in builtin_trust_types() {
                    if existing.contains(&def.name) {
                        continue;
                    }
                    let json = serde_json::to_string(&def)?;
                    self.storage.put(&self.bucket, &def.name, &json).await?;
                    info!("seeded built-in trust type {}", def.name);
                }
                Ok::<(), PermissionError>(())
            })
            .await?;
        Ok(())
    }

    /// Registers a definition.
    ///
    /// Identical re-registration is a no-op. A different payload under an
    /// existing name (built-in or custom) is rejected.
    pub async fn register(&self, def: TrustTypeDefinition) -> PermissionResult<()> {
        self.validate(&def)?;
        self.ensure_seeded().await?;

        if let Some(existing) = self.load(&def.name).await? {
            if *existing == def {
                debug!("trust type {} already registered with identical payload", def.name);
                return Ok(());
            }
            return Err(PermissionError::Validation(format!(
                "trust type {} is already registered with a different definition",
                def.name
            )));
        }

        let json = serde_json::to_string(&def)?;
        self.storage.put(&self.bucket, &def.name, &json).await?;
        let name = def.name.clone();
        {
            let mut definitions = self.definitions.write().await;
            self.generation.fetch_add(1, Ordering::AcqRel);
            definitions.insert(name.clone(), Arc::new(def));
        }
        self.rules.invalidate_trust_type(&name).await;
        info!("registered trust type {}", name);
        Ok(())
    }

    /// Removes a custom definition. Built-ins are reserved.
    /// Returns `true` if the definition existed.
    pub async fn unregister(&self, name: &str) -> PermissionResult<bool> {
        if is_builtin(name) {
            return Err(PermissionError::Validation(format!(
                "built-in trust type {name} cannot be removed"
            )));
        }
        let existed = self.storage.get(&self.bucket, name).await?.is_some();
        self.storage.delete(&self.bucket, name).await?;
        {
            let mut definitions = self.definitions.write().await;
            self.generation.fetch_add(1, Ordering::AcqRel);
            definitions.remove(name);
        }
        self.rules.invalidate_trust_type(name).await;
        if existed {
            info!("unregistered trust type {}", name);
        }
        Ok(existed)
    }

    pub async fn get(&self, name: &str) -> PermissionResult<Option<Arc<TrustTypeDefinition>>> {
        self.ensure_seeded().await?;
        if let Some(def) = self.definitions.read().await.get(name) {
            return Ok(Some(def.clone()));
        }
        self.load(name).await
    }

    /// Snapshot of every registered definition, ordered by name.
    pub async fn list(&self) -> PermissionResult<Vec<Arc<TrustTypeDefinition>>> {
        self.ensure_seeded().await?;
        let generation = self.generation.load(Ordering::Acquire);
        let mut defs = Vec::new();
        for (_, json) in self.storage.list(&self.bucket).await? {
            let def: TrustTypeDefinition = serde_json::from_str(&json)?;
            defs.push(Arc::new(def));
        }
        let mut cache = self.definitions.write().await;
        if self.generation.load(Ordering::Acquire) == generation {
            for def in &defs {
                cache.insert(def.name.clone(), def.clone());
            }
        }
        Ok(defs)
    }

    /// Reads a definition from storage and refreshes the cache slot.
    async fn load(&self, name: &str) -> PermissionResult<Option<Arc<TrustTypeDefinition>>> {
        let generation = self.generation.load(Ordering::Acquire);
        let Some(json) = self.storage.get(&self.bucket, name).await? else {
            return Ok(None);
        };
        let def = Arc::new(serde_json::from_str::<TrustTypeDefinition>(&json)?);
        let mut definitions = self.definitions.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("trust type {} changed during read, not caching", name);
            return Ok(Some(def));
        }
        definitions.insert(name.to_string(), def.clone());
        Ok(Some(def))
    }

    /// Rejects definitions that could not be evaluated later.
    fn validate(&self, def: &TrustTypeDefinition) -> PermissionResult<()> {
        if def.name.trim().is_empty() || def.name.trim() != def.name {
            return Err(PermissionError::Validation(format!(
                "invalid trust type name {:?}",
                def.name
            )));
        }
        def.permissions.validate()?;
        for (category, pattern) in def.permissions.pattern_entries() {
            self.patterns.validate(category, pattern)?;
        }
        for rule in &def.acl_rules {
            validate_acl_rule(&self.patterns, rule)?;
        }
        Ok(())
    }
}

/// ACL paths are matched with any leading `/` removed on both sides.
pub(crate) fn normalize_acl_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

pub(crate) fn validate_acl_rule(patterns: &PatternCache, rule: &AclRule) -> PermissionResult<()> {
    patterns
        .get_or_compile(normalize_acl_path(&rule.path_pattern), PatternKind::Path)
        .map(|_| ())
        .map_err(|e| match e {
            PermissionError::Validation(msg) => {
                PermissionError::Validation(format!("ACL rule {:?}: {msg}", rule.path_pattern))
            }
            other => other,
        })
}

impl std::fmt::Debug for TrustTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustTypeRegistry")
            .field("bucket", &self.bucket)
            .field("seed_builtins", &self.seed_builtins)
            .field("seeded", &self.seeded.initialized())
            .finish()
    }
}
