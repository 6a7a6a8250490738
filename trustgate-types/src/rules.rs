//! Category rules, complete and partial.
//!
//! Trust type templates carry a [`PermissionSet`] with one complete rule per
//! category. Per-relationship overrides carry a [`PartialPermissionSet`] in
//! which every category, and every field inside a category, is optional.
//! A field that is present in a patch takes part in the merge; a field that
//! is absent inherits the base value.

use crate::category::{Category, RuleShape};
use crate::error::{TypeError, TypeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn to_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

// ── Complete rules ──────────────────────────────────────────────

/// Rule for the pattern-operation categories (`properties`, `resources`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRule {
    #[serde(default)]
    pub patterns: BTreeSet<String>,
    #[serde(default)]
    pub operations: BTreeSet<String>,
    #[serde(default)]
    pub excluded_patterns: BTreeSet<String>,
}

impl PatternRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = to_set(patterns);
        self
    }

    pub fn with_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operations = to_set(operations);
        self
    }

    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_patterns = to_set(excluded);
        self
    }
}

/// Rule for the allow-deny categories (`methods`, `actions`, `tools`, `prompts`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowDenyRule {
    #[serde(default)]
    pub allowed: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub denied: BTreeSet<String>,
}

impl AllowDenyRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = to_set(allowed);
        self
    }

    pub fn with_denied<I, S>(mut self, denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied = to_set(denied);
        self
    }
}

/// A complete rule for one category, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRule {
    Pattern(PatternRule),
    AllowDeny(AllowDenyRule),
}

impl CategoryRule {
    /// Entries that grant access: `patterns` or `allowed`.
    pub fn allow_entries(&self) -> &BTreeSet<String> {
        match self {
            CategoryRule::Pattern(r) => &r.patterns,
            CategoryRule::AllowDeny(r) => &r.allowed,
        }
    }

    /// Entries that revoke access: `excluded_patterns` or `denied`.
    pub fn deny_entries(&self) -> &BTreeSet<String> {
        match self {
            CategoryRule::Pattern(r) => &r.excluded_patterns,
            CategoryRule::AllowDeny(r) => &r.denied,
        }
    }

    /// Permitted operations. `None` for allow-deny rules, which have no
    /// operation dimension.
    pub fn operations(&self) -> Option<&BTreeSet<String>> {
        match self {
            CategoryRule::Pattern(r) => Some(&r.operations),
            CategoryRule::AllowDeny(_) => None,
        }
    }

    pub fn shape(&self) -> RuleShape {
        match self {
            CategoryRule::Pattern(_) => RuleShape::PatternOperation,
            CategoryRule::AllowDeny(_) => RuleShape::AllowDeny,
        }
    }
}

/// One complete rule per category. Missing categories deserialize to an
/// empty rule, which grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionSet {
    #[serde(default)]
    pub properties: PatternRule,
    #[serde(default)]
    pub methods: AllowDenyRule,
    #[serde(default)]
    pub actions: AllowDenyRule,
    #[serde(default)]
    pub tools: AllowDenyRule,
    #[serde(default)]
    pub resources: PatternRule,
    #[serde(default)]
    pub prompts: AllowDenyRule,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(mut self, rule: PatternRule) -> Self {
        self.properties = rule;
        self
    }

    pub fn with_methods(mut self, rule: AllowDenyRule) -> Self {
        self.methods = rule;
        self
    }

    pub fn with_actions(mut self, rule: AllowDenyRule) -> Self {
        self.actions = rule;
        self
    }

    pub fn with_tools(mut self, rule: AllowDenyRule) -> Self {
        self.tools = rule;
        self
    }

    pub fn with_resources(mut self, rule: PatternRule) -> Self {
        self.resources = rule;
        self
    }

    pub fn with_prompts(mut self, rule: AllowDenyRule) -> Self {
        self.prompts = rule;
        self
    }

    /// Returns a snapshot of the rule for `category`.
    pub fn rule(&self, category: Category) -> CategoryRule {
        match category {
            Category::Properties => CategoryRule::Pattern(self.properties.clone()),
            Category::Resources => CategoryRule::Pattern(self.resources.clone()),
            Category::Methods => CategoryRule::AllowDeny(self.methods.clone()),
            Category::Actions => CategoryRule::AllowDeny(self.actions.clone()),
            Category::Tools => CategoryRule::AllowDeny(self.tools.clone()),
            Category::Prompts => CategoryRule::AllowDeny(self.prompts.clone()),
        }
    }

    /// Replaces the rule for `category`. Fails if the rule has the wrong shape.
    pub fn set_rule(&mut self, category: Category, rule: CategoryRule) -> TypeResult<()> {
        match (category, rule) {
            (Category::Properties, CategoryRule::Pattern(r)) => self.properties = r,
            (Category::Resources, CategoryRule::Pattern(r)) => self.resources = r,
            (Category::Methods, CategoryRule::AllowDeny(r)) => self.methods = r,
            (Category::Actions, CategoryRule::AllowDeny(r)) => self.actions = r,
            (Category::Tools, CategoryRule::AllowDeny(r)) => self.tools = r,
            (Category::Prompts, CategoryRule::AllowDeny(r)) => self.prompts = r,
            (category, rule) => {
                return Err(TypeError::InvalidRule {
                    category: category.to_string(),
                    reason: format!("expected {:?} rule, got {:?}", category.shape(), rule.shape()),
                });
            }
        }
        Ok(())
    }

    /// Checks structural constraints that serde cannot express.
    pub fn validate(&self) -> TypeResult<()> {
        if !self.prompts.denied.is_empty() {
            return Err(TypeError::InvalidRule {
                category: Category::Prompts.to_string(),
                reason: "prompts support an allow list only".into(),
            });
        }
        Ok(())
    }

    /// Every pattern string in the set (allow and deny entries, not operations),
    /// paired with its category.
    pub fn pattern_entries(&self) -> Vec<(Category, &str)> {
        let mut out = Vec::new();
        for (category, rule) in [
            (Category::Properties, &self.properties),
            (Category::Resources, &self.resources),
        ] {
            push_entries(&mut out, category, &rule.patterns);
            push_entries(&mut out, category, &rule.excluded_patterns);
        }
        for (category, rule) in [
            (Category::Methods, &self.methods),
            (Category::Actions, &self.actions),
            (Category::Tools, &self.tools),
            (Category::Prompts, &self.prompts),
        ] {
            push_entries(&mut out, category, &rule.allowed);
            push_entries(&mut out, category, &rule.denied);
        }
        out
    }
}

fn push_entries<'a>(out: &mut Vec<(Category, &'a str)>, category: Category, set: &'a BTreeSet<String>) {
    out.extend(set.iter().map(|p| (category, p.as_str())));
}

// ── Partial rules ───────────────────────────────────────────────

/// Sparse adjustment to a [`PatternRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_patterns: Option<BTreeSet<String>>,
}

impl PatternRulePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = Some(to_set(patterns));
        self
    }

    pub fn with_operations<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operations = Some(to_set(operations));
        self
    }

    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_patterns = Some(to_set(excluded));
        self
    }
}

/// Sparse adjustment to an [`AllowDenyRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowDenyPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied: Option<BTreeSet<String>>,
}

impl AllowDenyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(to_set(allowed));
        self
    }

    pub fn with_denied<I, S>(mut self, denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied = Some(to_set(denied));
        self
    }
}

/// A partial rule for one category, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryPatch {
    Pattern(PatternRulePatch),
    AllowDeny(AllowDenyPatch),
}

impl CategoryPatch {
    /// The patch's own allow entries, if the patch sets them.
    pub fn allow_entries(&self) -> Option<&BTreeSet<String>> {
        match self {
            CategoryPatch::Pattern(p) => p.patterns.as_ref(),
            CategoryPatch::AllowDeny(p) => p.allowed.as_ref(),
        }
    }

    /// The patch's own deny entries, if the patch sets them.
    pub fn deny_entries(&self) -> Option<&BTreeSet<String>> {
        match self {
            CategoryPatch::Pattern(p) => p.excluded_patterns.as_ref(),
            CategoryPatch::AllowDeny(p) => p.denied.as_ref(),
        }
    }
}

/// Per-relationship permission adjustment: any subset of categories, any
/// subset of fields per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialPermissionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PatternRulePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<AllowDenyPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<AllowDenyPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<AllowDenyPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<PatternRulePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<AllowDenyPatch>,
}

impl PartialPermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(mut self, patch: PatternRulePatch) -> Self {
        self.properties = Some(patch);
        self
    }

    pub fn with_methods(mut self, patch: AllowDenyPatch) -> Self {
        self.methods = Some(patch);
        self
    }

    pub fn with_actions(mut self, patch: AllowDenyPatch) -> Self {
        self.actions = Some(patch);
        self
    }

    pub fn with_tools(mut self, patch: AllowDenyPatch) -> Self {
        self.tools = Some(patch);
        self
    }

    pub fn with_resources(mut self, patch: PatternRulePatch) -> Self {
        self.resources = Some(patch);
        self
    }

    pub fn with_prompts(mut self, patch: AllowDenyPatch) -> Self {
        self.prompts = Some(patch);
        self
    }

    /// Returns a snapshot of the patch for `category`, if one is set.
    pub fn patch(&self, category: Category) -> Option<CategoryPatch> {
        match category {
            Category::Properties => self.properties.clone().map(CategoryPatch::Pattern),
            Category::Resources => self.resources.clone().map(CategoryPatch::Pattern),
            Category::Methods => self.methods.clone().map(CategoryPatch::AllowDeny),
            Category::Actions => self.actions.clone().map(CategoryPatch::AllowDeny),
            Category::Tools => self.tools.clone().map(CategoryPatch::AllowDeny),
            Category::Prompts => self.prompts.clone().map(CategoryPatch::AllowDeny),
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.patch(*c).is_none())
    }

    pub fn validate(&self) -> TypeResult<()> {
        let prompt_denies = self
            .prompts
            .as_ref()
            .and_then(|p| p.denied.as_ref())
            .is_some_and(|d| !d.is_empty());
        if prompt_denies {
            return Err(TypeError::InvalidRule {
                category: Category::Prompts.to_string(),
                reason: "prompts support an allow list only".into(),
            });
        }
        Ok(())
    }

    /// Every pattern string the patch sets, paired with its category.
    pub fn pattern_entries(&self) -> Vec<(Category, &str)> {
        let mut out = Vec::new();
        for (category, patch) in [
            (Category::Properties, &self.properties),
            (Category::Resources, &self.resources),
        ] {
            if let Some(p) = patch {
                for set in [&p.patterns, &p.excluded_patterns].into_iter().flatten() {
                    push_entries(&mut out, category, set);
                }
            }
        }
        for (category, patch) in [
            (Category::Methods, &self.methods),
            (Category::Actions, &self.actions),
            (Category::Tools, &self.tools),
            (Category::Prompts, &self.prompts),
        ] {
            if let Some(p) = patch {
                for set in [&p.allowed, &p.denied].into_iter().flatten() {
                    push_entries(&mut out, category, set);
                }
            }
        }
        out
    }
}
