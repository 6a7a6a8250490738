//! Combining a trust type's base rules with a relationship override.
//!
//! Pattern-operation rules (`properties`, `resources`):
//! - `merge_base = true`: `patterns` and `excluded_patterns` are unioned
//!   with the base; `operations` is replaced when the override sets it.
//! - `merge_base = false`: every field the override sets replaces the base.
//!
//! Allow-deny rules (`methods`, `actions`, `tools`, `prompts`) are always
//! replaced field by field, whatever `merge_base` says.
//!
//! In every case a field the override leaves unset inherits the base.

use std::collections::BTreeSet;
use trustgate_types::{
    AllowDenyPatch, AllowDenyRule, Category, CategoryPatch, CategoryRule, PartialPermissionSet,
    PatternRule, PatternRulePatch, PermissionSet,
};

/// Merges one category rule with an optional patch.
///
/// A patch whose shape does not match the base is ignored; both come from
/// the same category accessor, so this only happens on misuse.
pub fn merge(base: &CategoryRule, patch: Option<&CategoryPatch>, merge_base: bool) -> CategoryRule {
    match (base, patch) {
        (CategoryRule::Pattern(b), Some(CategoryPatch::Pattern(p))) => {
            CategoryRule::Pattern(merge_pattern_rule(b, p, merge_base))
        }
        (CategoryRule::AllowDeny(b), Some(CategoryPatch::AllowDeny(p))) => {
            CategoryRule::AllowDeny(merge_allow_deny_rule(b, p))
        }
        (base, _) => base.clone(),
    }
}

pub fn merge_pattern_rule(base: &PatternRule, patch: &PatternRulePatch, merge_base: bool) -> PatternRule {
    let combine = |base: &BTreeSet<String>, patch: &Option<BTreeSet<String>>| match patch {
        Some(p) if merge_base => base.union(p).cloned().collect(),
        Some(p) => p.clone(),
        None => base.clone(),
    };
    PatternRule {
        patterns: combine(&base.patterns, &patch.patterns),
        excluded_patterns: combine(&base.excluded_patterns, &patch.excluded_patterns),
        operations: patch
            .operations
            .clone()
            .unwrap_or_else(|| base.operations.clone()),
    }
}

pub fn merge_allow_deny_rule(base: &AllowDenyRule, patch: &AllowDenyPatch) -> AllowDenyRule {
    AllowDenyRule {
        allowed: patch.allowed.clone().unwrap_or_else(|| base.allowed.clone()),
        denied: patch.denied.clone().unwrap_or_else(|| base.denied.clone()),
    }
}

/// Applies [`merge`] to every category.
pub fn merge_permission_set(
    base: &PermissionSet,
    patch: Option<&PartialPermissionSet>,
    merge_base: bool,
) -> PermissionSet {
    let Some(patch) = patch else {
        return base.clone();
    };
    PermissionSet {
        properties: merge_pattern_opt(&base.properties, patch.properties.as_ref(), merge_base),
        resources: merge_pattern_opt(&base.resources, patch.resources.as_ref(), merge_base),
        methods: merge_allow_deny_opt(&base.methods, patch.methods.as_ref()),
        actions: merge_allow_deny_opt(&base.actions, patch.actions.as_ref()),
        tools: merge_allow_deny_opt(&base.tools, patch.tools.as_ref()),
        prompts: merge_allow_deny_opt(&base.prompts, patch.prompts.as_ref()),
    }
}

fn merge_pattern_opt(base: &PatternRule, patch: Option<&PatternRulePatch>, merge_base: bool) -> PatternRule {
    patch.map_or_else(|| base.clone(), |p| merge_pattern_rule(base, p, merge_base))
}

fn merge_allow_deny_opt(base: &AllowDenyRule, patch: Option<&AllowDenyPatch>) -> AllowDenyRule {
    patch.map_or_else(|| base.clone(), |p| merge_allow_deny_rule(base, p))
}

/// Merges the rule for a single category out of whole sets.
pub fn merge_category(
    base: &PermissionSet,
    patch: Option<&PartialPermissionSet>,
    category: Category,
    merge_base: bool,
) -> CategoryRule {
    let category_patch = patch.and_then(|p| p.patch(category));
    merge(&base.rule(category), category_patch.as_ref(), merge_base)
}
