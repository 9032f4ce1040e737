//! Hidden key matching.
//!
//! A hidden key is reported as not found before any store call is made.
//! Each pattern is checked three ways:
//!
//! - without a `/`, it matches any single path component (`.git` hides
//!   `/foo/.git/bar` but not `/.gitignore`);
//! - with a `/`, it matches as a segment-aligned prefix (`/foo` hides `/foo`
//!   and `/foo/bar` but not `/foobar`);
//! - every pattern is also a shell glob over the whole key, where `*` does
//!   not cross `/`.

use glob::{MatchOptions, Pattern};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct HideRule {
    raw: String,
    glob: Option<Pattern>,
}

impl HideRule {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_owned(),
            glob: Pattern::new(raw).ok(),
        }
    }

    fn matches(&self, key: &str) -> bool {
        let pattern = self.raw.as_str();
        if !pattern.contains('/') {
            if key.split('/').any(|component| component == pattern) {
                return true;
            }
        } else if let Some(rest) = key.strip_prefix(pattern) {
            if rest.is_empty() || rest.starts_with('/') {
                return true;
            }
        }
        self.glob
            .as_ref()
            .is_some_and(|glob| glob.matches_with(key, GLOB_OPTIONS))
    }
}

/// Compiled hide patterns.
#[derive(Debug, Clone, Default)]
pub struct HiddenMatcher {
    rules: Vec<HideRule>,
}

impl HiddenMatcher {
    /// Compile the given patterns. Patterns that are not valid globs still
    /// apply as component or prefix rules.
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            rules: patterns
                .iter()
                .map(AsRef::as_ref)
                .filter(|p| !p.is_empty())
                .map(HideRule::new)
                .collect(),
        }
    }

    /// Whether `key` must be treated as non-existent.
    #[must_use]
    pub fn is_hidden(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(key))
    }
}
