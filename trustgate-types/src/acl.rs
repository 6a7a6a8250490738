//! Endpoint-level access rules.
//!
//! On the wire an ACL rule is a three-element array:
//! `[path_pattern, methods, "a" | "r"]`, where `methods` is a
//! comma-separated list of HTTP verbs, or empty / `any` for every verb.

use crate::error::{TypeError, TypeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of a matching ACL rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclAccess {
    Allow,
    Reject,
}

impl AclAccess {
    pub fn as_code(&self) -> &'static str {
        match self {
            AclAccess::Allow => "a",
            AclAccess::Reject => "r",
        }
    }

    pub fn from_code(code: &str) -> TypeResult<Self> {
        match code {
            "a" => Ok(AclAccess::Allow),
            "r" => Ok(AclAccess::Reject),
            other => Err(TypeError::InvalidAclRule(format!(
                "access must be \"a\" or \"r\", got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for AclAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AclAccess::Allow => write!(f, "allow"),
            AclAccess::Reject => write!(f, "reject"),
        }
    }
}

/// An ordered HTTP endpoint rule. The first matching rule in a trust type's
/// list decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(String, String, String)", into = "(String, String, String)")]
pub struct AclRule {
    pub path_pattern: String,
    /// Upper-cased HTTP verbs. Empty means any verb.
    pub methods: BTreeSet<String>,
    pub access: AclAccess,
}

impl AclRule {
    /// Builds a rule from its wire components.
    pub fn new(path_pattern: impl Into<String>, methods: &str, access: AclAccess) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            methods: parse_methods(methods),
            access,
        }
    }

    pub fn allow(path_pattern: impl Into<String>, methods: &str) -> Self {
        Self::new(path_pattern, methods, AclAccess::Allow)
    }

    pub fn reject(path_pattern: impl Into<String>, methods: &str) -> Self {
        Self::new(path_pattern, methods, AclAccess::Reject)
    }

    /// True if the rule applies to `method` (case-insensitive).
    pub fn covers_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.contains(&method.to_ascii_uppercase())
    }

    /// The comma-joined methods string used on the wire.
    pub fn methods_string(&self) -> String {
        self.methods.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// "any" anywhere in the list widens the whole rule.
fn parse_methods(methods: &str) -> BTreeSet<String> {
    let verbs: BTreeSet<String> = methods
        .split(',')
        .map(|m| m.trim().to_ascii_uppercase())
        .filter(|m| !m.is_empty())
        .collect();
    if verbs.contains("ANY") {
        return BTreeSet::new();
    }
    verbs
}

impl TryFrom<(String, String, String)> for AclRule {
    type Error = TypeError;

    fn try_from((path_pattern, methods, access): (String, String, String)) -> TypeResult<Self> {
        let access = AclAccess::from_code(&access)?;
        Ok(Self {
            path_pattern,
            methods: parse_methods(&methods),
            access,
        })
    }
}

impl From<AclRule> for (String, String, String) {
    fn from(rule: AclRule) -> Self {
        let methods = rule.methods_string();
        (rule.path_pattern, methods, rule.access.as_code().to_string())
    }
}
