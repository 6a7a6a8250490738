//! Pattern compilation and matching.
//!
//! Three pattern kinds are supported:
//!
//! - **Glob**: `*` matches any run of characters (including none), `?`
//!   matches exactly one, everything else is literal. Matching is anchored
//!   to the whole identifier and case-sensitive.
//! - **Path**: glob semantics over `/`-delimited identifiers. `*` is not
//!   slash-aware. A `<name>` placeholder matches one non-empty segment, so
//!   `subscriptions/<id>` matches `subscriptions/123`.
//! - **Uri**: `scheme://rest`. The scheme must match exactly; a non-empty
//!   `rest` is glob-matched against the remainder. `scheme://` alone
//!   matches every identifier with that scheme.
//!
//! Globs compile to `regex-lite` programs, which run in linear time, so no
//! pattern can trigger catastrophic backtracking. Pattern length is bounded
//! at compile time.

use crate::error::{PermissionError, PermissionResult};
use regex_lite::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use trustgate_types::Category;

pub const DEFAULT_MAX_PATTERN_LENGTH: usize = 256;

/// How a pattern string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Glob,
    Path,
    Uri,
}

impl PatternKind {
    /// The kind used for an entry of `category`. Resource entries are URIs
    /// only when they carry a scheme separator.
    pub fn for_category(category: Category, pattern: &str) -> Self {
        match category {
            Category::Properties => PatternKind::Path,
            Category::Resources if pattern.contains("://") => PatternKind::Uri,
            _ => PatternKind::Glob,
        }
    }
}

enum Compiled {
    Any,
    Literal(String),
    Glob(Regex),
    Uri {
        scheme: String,
        rest: Option<Box<Compiled>>,
    },
}

impl Compiled {
    fn matches(&self, identifier: &str) -> bool {
        match self {
            Compiled::Any => true,
            Compiled::Literal(lit) => lit == identifier,
            Compiled::Glob(re) => re.is_match(identifier),
            Compiled::Uri { scheme, rest } => match identifier.split_once("://") {
                Some((s, remainder)) if s == scheme => {
                    rest.as_ref().is_none_or(|m| m.matches(remainder))
                }
                _ => false,
            },
        }
    }
}

/// A compiled pattern. Immutable once built.
pub struct Matcher {
    pattern: String,
    kind: PatternKind,
    compiled: Compiled,
}

impl Matcher {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn matches(&self, identifier: &str) -> bool {
        self.compiled.matches(identifier)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("pattern", &self.pattern)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Compiles `pattern` with the default length bound.
pub fn compile(pattern: &str, kind: PatternKind) -> PermissionResult<Matcher> {
    compile_with_limit(pattern, kind, DEFAULT_MAX_PATTERN_LENGTH)
}

/// Compiles `pattern`, rejecting empty patterns and patterns longer than
/// `max_len` characters.
pub fn compile_with_limit(
    pattern: &str,
    kind: PatternKind,
    max_len: usize,
) -> PermissionResult<Matcher> {
    if pattern.is_empty() {
        return Err(PermissionError::Validation(
            "pattern must not be empty".into(),
        ));
    }
    let len = pattern.chars().count();
    if len > max_len {
        return Err(PermissionError::Validation(format!(
            "pattern is {len} characters, limit is {max_len}"
        )));
    }

    let compiled = match kind {
        PatternKind::Glob => compile_glob(pattern, false)?,
        PatternKind::Path => compile_glob(pattern, true)?,
        PatternKind::Uri => compile_uri(pattern)?,
    };
    Ok(Matcher {
        pattern: pattern.to_string(),
        kind,
        compiled,
    })
}

fn compile_uri(pattern: &str) -> PermissionResult<Compiled> {
    let (scheme, rest) = pattern.split_once("://").ok_or_else(|| {
        PermissionError::Validation(format!("URI pattern {pattern:?} has no scheme"))
    })?;
    if scheme.is_empty() || scheme.contains(['*', '?']) {
        return Err(PermissionError::Validation(format!(
            "URI pattern {pattern:?} needs a literal scheme"
        )));
    }
    let rest = if rest.is_empty() {
        None
    } else {
        Some(Box::new(compile_glob(rest, false)?))
    };
    Ok(Compiled::Uri {
        scheme: scheme.to_string(),
        rest,
    })
}

fn compile_glob(pattern: &str, path_placeholders: bool) -> PermissionResult<Compiled> {
    if pattern.chars().all(|c| c == '*') {
        return Ok(Compiled::Any);
    }
    let chars: Vec<char> = pattern.chars().collect();
    let has_placeholder =
        path_placeholders && (0..chars.len()).any(|i| placeholder_len(&chars[i..]).is_some());
    if !has_placeholder && !pattern.contains(['*', '?']) {
        return Ok(Compiled::Literal(pattern.to_string()));
    }

    let mut re = String::with_capacity(pattern.len() * 2 + 8);
    re.push_str("(?s)^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                re.push_str(".*");
            }
            '?' => re.push('.'),
            '<' if path_placeholders => {
                if let Some(len) = placeholder_len(&chars[i..]) {
                    re.push_str("[^/]+");
                    i += len;
                    continue;
                }
                re.push_str(&regex_lite::escape("<"));
            }
            c => {
                let mut buf = [0u8; 4];
                re.push_str(&regex_lite::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }
    re.push('$');

    let regex = Regex::new(&re).map_err(|e| {
        PermissionError::Validation(format!("pattern {pattern:?} does not compile: {e}"))
    })?;
    Ok(Compiled::Glob(regex))
}

/// Length of a `<name>` placeholder at the start of `chars`, brackets included.
fn placeholder_len(chars: &[char]) -> Option<usize> {
    if chars.first() != Some(&'<') {
        return None;
    }
    let close = chars.iter().position(|c| *c == '>')?;
    let name = &chars[1..close];
    if name.is_empty() || !name.iter().all(|c| c.is_ascii_alphanumeric() || *c == '_') {
        return None;
    }
    Some(close + 1)
}

// ── PatternCache ────────────────────────────────────────────────

/// Process-wide cache of compiled matchers, keyed by kind and raw pattern.
///
/// Entries are immutable and never evicted: the same pattern string always
/// compiles to the same matcher regardless of which trust type holds it.
pub struct PatternCache {
    max_pattern_length: usize,
    compiled: RwLock<HashMap<(PatternKind, String), Arc<Matcher>>>,
}

impl PatternCache {
    pub fn new(max_pattern_length: usize) -> Self {
        Self {
            max_pattern_length,
            compiled: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_pattern_length(&self) -> usize {
        self.max_pattern_length
    }

    /// Returns the cached matcher, compiling it on first use.
    pub fn get_or_compile(&self, pattern: &str, kind: PatternKind) -> PermissionResult<Arc<Matcher>> {
        let key = (kind, pattern.to_string());
        {
            let compiled = self.compiled.read().unwrap_or_else(|p| p.into_inner());
            if let Some(m) = compiled.get(&key) {
                return Ok(m.clone());
            }
        }
        let matcher = Arc::new(compile_with_limit(pattern, kind, self.max_pattern_length)?);
        let mut compiled = self.compiled.write().unwrap_or_else(|p| p.into_inner());
        Ok(compiled.entry(key).or_insert(matcher).clone())
    }

    /// Compiles a category entry, surfacing any validation error.
    pub fn validate(&self, category: Category, pattern: &str) -> PermissionResult<()> {
        self.get_or_compile(pattern, PatternKind::for_category(category, pattern))
            .map(|_| ())
            .map_err(|e| match e {
                PermissionError::Validation(msg) => {
                    PermissionError::Validation(format!("{category}: {msg}"))
                }
                other => other,
            })
    }

    /// True if `identifier` matches any of `patterns` under `category` rules.
    pub fn matches_any<'a, I>(
        &self,
        category: Category,
        patterns: I,
        identifier: &str,
    ) -> PermissionResult<bool>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for pattern in patterns {
            let matcher =
                self.get_or_compile(pattern, PatternKind::for_category(category, pattern))?;
            if matcher.matches(identifier) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn len(&self) -> usize {
        self.compiled.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PATTERN_LENGTH)
    }
}

impl fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternCache")
            .field("max_pattern_length", &self.max_pattern_length)
            .field("entries", &self.len())
            .finish()
    }
}
