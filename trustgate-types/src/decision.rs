use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a decision came out the way it did. Stable across releases; suitable
/// for audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    TrustRelationshipNotFound,
    TrustTypeNotFound,
    ExplicitDeny,
    ExplicitOverrideAllow,
    TrustTypeAllow,
    DefaultDeny,
    OperationNotPermitted,
    /// An internal failure was absorbed; details are only in the logs.
    EvaluationError,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::TrustRelationshipNotFound => "trust relationship not found",
            DecisionReason::TrustTypeNotFound => "trust type not found",
            DecisionReason::ExplicitDeny => "explicit deny",
            DecisionReason::ExplicitOverrideAllow => "explicit override allow",
            DecisionReason::TrustTypeAllow => "trust type allow",
            DecisionReason::DefaultDeny => "default deny",
            DecisionReason::OperationNotPermitted => "operation not permitted",
            DecisionReason::EvaluationError => "evaluation error",
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(
            self,
            DecisionReason::ExplicitOverrideAllow | DecisionReason::TrustTypeAllow
        )
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single access check. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AccessDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }

    pub fn reason_str(&self) -> &'static str {
        self.reason.as_str()
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allowed { "allow" } else { "deny" };
        write!(f, "{verdict}: {}", self.reason)
    }
}
