use crate::acl::AclRule;
use crate::rules::PermissionSet;
use serde::{Deserialize, Serialize};

/// A named, reusable permission template shared by every relationship that
/// references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustTypeDefinition {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub acl_rules: Vec<AclRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_scope: Option<String>,
}

impl TrustTypeDefinition {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            permissions: PermissionSet::default(),
            acl_rules: Vec::new(),
            oauth_scope: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_acl_rules(mut self, rules: Vec<AclRule>) -> Self {
        self.acl_rules = rules;
        self
    }

    pub fn with_oauth_scope(mut self, scope: impl Into<String>) -> Self {
        self.oauth_scope = Some(scope.into());
        self
    }
}
