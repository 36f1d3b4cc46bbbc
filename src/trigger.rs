//! Trigger path matching.
//!
//! Patterns use the `glob` crate's shell dialect with a literal separator:
//! `*` and `?` never cross `/`, `[...]` and `[!...]` are character classes,
//! and a `**` path component matches any number of directories.

use glob::{MatchOptions, Pattern, PatternError};
use tracing::{debug, warn};

use crate::webhook::Commit;

/// Matches everything, including nested paths.
pub const MATCH_EVERYTHING: &str = "**";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

struct TriggerPattern {
    source: String,
    compiled: Result<Pattern, PatternError>,
}

/// Compiled set of trigger globs.
pub struct PathMatcher {
    patterns: Vec<TriggerPattern>,
}

impl PathMatcher {
    /// Compiles `patterns`. Invalid patterns are logged and never match.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(|source| {
                let source = source.as_ref().to_string();
                let compiled = Pattern::new(&source);
                if let Err(e) = &compiled {
                    warn!("Invalid trigger pattern '{}': {}", source, e);
                }
                TriggerPattern { source, compiled }
            })
            .collect();

        Self { patterns }
    }

    /// True if `path` satisfies at least one valid pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| match &pattern.compiled {
            Ok(compiled) => compiled.matches_with(path, MATCH_OPTIONS),
            Err(e) => {
                debug!("Skipping invalid trigger pattern '{}': {}", pattern.source, e);
                false
            }
        })
    }

    /// True if any added, modified or removed path of `commit` matches.
    pub fn any_matches(&self, commit: &Commit) -> bool {
        commit.changed_paths().any(|path| self.matches(path))
    }

    /// Every matching path of `commit`, in added/modified/removed order.
    pub fn matching_paths(&self, commit: &Commit) -> Vec<String> {
        commit
            .changed_paths()
            .filter(|path| self.matches(path))
            .map(String::from)
            .collect()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }
}
