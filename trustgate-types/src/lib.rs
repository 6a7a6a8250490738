//! Core types for trustgate.
//!
//! Defines the permission data model shared by storage and evaluation:
//!
//! - [`Category`] names one of the six permission namespaces
//! - [`PermissionSet`] holds a complete rule per category (trust type templates)
//! - [`PartialPermissionSet`] holds a sparse per-relationship adjustment
//! - [`AclRule`] is an endpoint-level allow/reject rule
//! - [`TrustTypeDefinition`] and [`PermissionOverride`] are the stored records
//! - [`AccessDecision`] is what the evaluator hands back to callers
//!
//! The JSON shapes produced by these types are the wire format of the
//! permission-management REST surface.

mod acl;
mod category;
mod decision;
mod error;
mod permission_override;
mod rules;
mod trust_type;

pub use acl::{AclAccess, AclRule};
pub use category::{Category, RuleShape};
pub use decision::{AccessDecision, DecisionReason};
pub use error::{TypeError, TypeResult};
pub use permission_override::PermissionOverride;
pub use rules::{
    AllowDenyPatch, AllowDenyRule, CategoryPatch, CategoryRule, PartialPermissionSet,
    PatternRule, PatternRulePatch, PermissionSet,
};
pub use trust_type::TrustTypeDefinition;
