//! Permission engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`PermissionEngine`](crate::PermissionEngine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest pattern (in characters) accepted at write time.
    pub max_pattern_length: usize,

    /// Insert the built-in trust types on first registry access.
    pub seed_builtins: bool,

    /// Global bucket holding trust type definitions.
    pub trust_type_bucket: String,

    /// Prefix of the per-actor bucket holding overrides
    /// (`{prefix}:{actor_id}`).
    pub override_bucket_prefix: String,

    /// Run the warm-up once, lazily, on the first evaluation.
    pub warm_on_first_evaluate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pattern_length: 256,
            seed_builtins: true,
            trust_type_bucket: "_trust_types".to_string(),
            override_bucket_prefix: "_trust_permissions".to_string(),
            warm_on_first_evaluate: true,
        }
    }
}

impl EngineConfig {
    /// Bucket name for one actor's overrides.
    pub fn override_bucket(&self, actor_id: &str) -> String {
        format!("{}:{}", self.override_bucket_prefix, actor_id)
    }
}
