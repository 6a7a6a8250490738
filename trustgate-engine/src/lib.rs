//! Trust-based permission engine.
//!
//! Decides whether a peer may access a resource owned by an actor, given
//! the trust type of their relationship and any per-relationship override.
//!
//! # Architecture
//!
//! - [`pattern`] compiles glob, path and URI patterns into cached matchers
//! - [`merge`] combines a trust type's base rules with an override
//! - [`TrustTypeRegistry`] holds named, immutable permission templates
//! - [`TrustPermissionStore`] holds per-relationship overrides
//! - [`PermissionEvaluator`] applies precedence and returns a decision
//! - [`PermissionEngine`] wires all of the above around injected storage
//!   and relationship collaborators
//!
//! Write paths return [`PermissionError`]. Read paths (`evaluate`,
//! `evaluate_acl`) never fail: any internal error becomes a deny.

pub mod builtin;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod merge;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod store;

pub use cache::{EffectiveRules, RuleCache, RuleKey};
pub use config::EngineConfig;
pub use engine::PermissionEngine;
pub use error::{PermissionError, PermissionResult};
pub use evaluator::PermissionEvaluator;
pub use pattern::{Matcher, PatternCache, PatternKind};
pub use registry::TrustTypeRegistry;
pub use resolver::{StaticTrustResolver, TrustRelationshipResolver};
pub use store::TrustPermissionStore;
