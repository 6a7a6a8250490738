use crate::rules::PartialPermissionSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-relationship adjustment layered over a trust type.
///
/// Keyed by `(actor_id, peer_id)` and private to the owning actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub actor_id: String,
    pub peer_id: String,
    pub trust_type: String,
    #[serde(default)]
    pub permissions: PartialPermissionSet,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub notes: String,
    /// Set by the store on every write.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl PermissionOverride {
    pub fn new(
        actor_id: impl Into<String>,
        peer_id: impl Into<String>,
        trust_type: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            peer_id: peer_id.into(),
            trust_type: trust_type.into(),
            permissions: PartialPermissionSet::default(),
            created_by: String::new(),
            notes: String::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_permissions(mut self, permissions: PartialPermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
