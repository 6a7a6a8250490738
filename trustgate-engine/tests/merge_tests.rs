//! Merging base rules with overrides.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;
use trustgate_engine::merge::{merge, merge_allow_deny_rule, merge_category, merge_pattern_rule, merge_permission_set};
use trustgate_types::{
    AllowDenyPatch, AllowDenyRule, Category, CategoryPatch, CategoryRule, PartialPermissionSet,
    PatternRule, PatternRulePatch, PermissionSet,
};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn base_properties() -> PatternRule {
    PatternRule::new()
        .with_patterns(["public/*"])
        .with_operations(["read"])
        .with_excluded(["private/*"])
}

// ── Pattern-operation ───────────────────────────────────────────

#[test]
fn union_adds_patterns_and_exclusions() {
    let patch = PatternRulePatch::new()
        .with_patterns(["memory_*"])
        .with_excluded(["memory_personal"]);
    let merged = merge_pattern_rule(&base_properties(), &patch, true);
    assert_eq!(merged.patterns, set(&["memory_*", "public/*"]));
    assert_eq!(merged.excluded_patterns, set(&["memory_personal", "private/*"]));
    assert_eq!(merged.operations, set(&["read"]));
}

#[test]
fn union_replaces_operations() {
    let patch = PatternRulePatch::new().with_operations(["write"]);
    let merged = merge_pattern_rule(&base_properties(), &patch, true);
    assert_eq!(merged.operations, set(&["write"]));
    assert_eq!(merged.patterns, set(&["public/*"]));
}

#[test]
fn full_override_replaces_set_fields_only() {
    let patch = PatternRulePatch::new().with_patterns(["notes/*"]);
    let merged = merge_pattern_rule(&base_properties(), &patch, false);
    assert_eq!(merged.patterns, set(&["notes/*"]));
    assert_eq!(merged.excluded_patterns, set(&["private/*"]));
    assert_eq!(merged.operations, set(&["read"]));
}

#[test]
fn explicit_empty_set_clears_under_full_override() {
    let patch = PatternRulePatch::new().with_excluded(Vec::<String>::new());
    let merged = merge_pattern_rule(&base_properties(), &patch, false);
    assert!(merged.excluded_patterns.is_empty());
}

#[test]
fn explicit_empty_set_keeps_base_under_union() {
    let patch = PatternRulePatch::new().with_excluded(Vec::<String>::new());
    let merged = merge_pattern_rule(&base_properties(), &patch, true);
    assert_eq!(merged.excluded_patterns, set(&["private/*"]));
}

// ── Allow-deny ──────────────────────────────────────────────────

#[test]
fn allow_deny_is_replaced_regardless_of_merge_base() {
    let base = CategoryRule::AllowDeny(AllowDenyRule::new().with_allowed(["*"]));
    let patch = CategoryPatch::AllowDeny(AllowDenyPatch::new().with_allowed(["get_*", "list_*"]));
    for merge_base in [true, false] {
        let merged = merge(&base, Some(&patch), merge_base);
        assert_eq!(merged.allow_entries(), &set(&["get_*", "list_*"]));
    }
}

#[test]
fn allow_deny_unset_field_inherits() {
    let base = AllowDenyRule::new()
        .with_allowed(["get_*"])
        .with_denied(["delete_*"]);
    let merged = merge_allow_deny_rule(&base, &AllowDenyPatch::new().with_allowed(["list_*"]));
    assert_eq!(merged.allowed, set(&["list_*"]));
    assert_eq!(merged.denied, set(&["delete_*"]));
}

// ── Whole sets ──────────────────────────────────────────────────

#[test]
fn no_patch_returns_base() {
    let base = PermissionSet::new().with_properties(base_properties());
    assert_eq!(merge_permission_set(&base, None, true), base);
    assert_eq!(merge(&base.rule(Category::Properties), None, true), base.rule(Category::Properties));
}

#[test]
fn untouched_categories_inherit() {
    let base = PermissionSet::new()
        .with_properties(base_properties())
        .with_tools(AllowDenyRule::new().with_allowed(["search"]));
    let patch = PartialPermissionSet::new()
        .with_methods(AllowDenyPatch::new().with_allowed(["get_*"]));
    let merged = merge_permission_set(&base, Some(&patch), true);
    assert_eq!(merged.properties, base.properties);
    assert_eq!(merged.tools, base.tools);
    assert_eq!(merged.methods.allowed, set(&["get_*"]));
}

#[test]
fn merge_category_picks_one_rule() {
    let base = PermissionSet::new().with_properties(base_properties());
    let patch = PartialPermissionSet::new()
        .with_properties(PatternRulePatch::new().with_patterns(["memory_*"]));
    let rule = merge_category(&base, Some(&patch), Category::Properties, true);
    assert_eq!(rule.allow_entries(), &set(&["memory_*", "public/*"]));
    let untouched = merge_category(&base, Some(&patch), Category::Resources, true);
    assert_eq!(untouched, base.rule(Category::Resources));
}

#[test]
fn mismatched_shapes_leave_base_alone() {
    let base = CategoryRule::Pattern(base_properties());
    let patch = CategoryPatch::AllowDeny(AllowDenyPatch::new().with_allowed(["x"]));
    assert_eq!(merge(&base, Some(&patch), true), base);
}

// ── Laws ────────────────────────────────────────────────────────

fn entries() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z_*]{1,8}", 0..5)
}

fn pattern_rule() -> impl Strategy<Value = PatternRule> {
    (entries(), entries(), entries()).prop_map(|(patterns, operations, excluded_patterns)| PatternRule {
        patterns,
        operations,
        excluded_patterns,
    })
}

fn pattern_patch() -> impl Strategy<Value = PatternRulePatch> {
    (
        prop::option::of(entries()),
        prop::option::of(entries()),
        prop::option::of(entries()),
    )
        .prop_map(|(patterns, operations, excluded_patterns)| PatternRulePatch {
            patterns,
            operations,
            excluded_patterns,
        })
}

proptest! {
    #[test]
    fn union_is_superset_of_base(base in pattern_rule(), patch in pattern_patch()) {
        let merged = merge_pattern_rule(&base, &patch, true);
        prop_assert!(merged.patterns.is_superset(&base.patterns));
        prop_assert!(merged.excluded_patterns.is_superset(&base.excluded_patterns));
    }

    #[test]
    fn union_is_idempotent(base in pattern_rule(), patch in pattern_patch()) {
        let once = merge_pattern_rule(&base, &patch, true);
        let twice = merge_pattern_rule(&once, &patch, true);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn full_override_takes_patch_fields(base in pattern_rule(), patch in pattern_patch()) {
        let merged = merge_pattern_rule(&base, &patch, false);
        prop_assert_eq!(&merged.patterns, patch.patterns.as_ref().unwrap_or(&base.patterns));
        prop_assert_eq!(&merged.operations, patch.operations.as_ref().unwrap_or(&base.operations));
        prop_assert_eq!(
            &merged.excluded_patterns,
            patch.excluded_patterns.as_ref().unwrap_or(&base.excluded_patterns)
        );
    }

    #[test]
    fn empty_patch_is_identity(base in pattern_rule(), merge_base in any::<bool>()) {
        let merged = merge_pattern_rule(&base, &PatternRulePatch::new(), merge_base);
        prop_assert_eq!(merged, base);
    }
}
