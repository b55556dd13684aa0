//! Path exclusion filtering.
//!
//! Exclusions are captured once per run as an immutable snapshot and shared
//! by reference with the parallel checking phase; nothing here is global
//! mutable state.

use crate::config::ConfigError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::path::Path;

#[derive(Debug)]
enum Matcher {
    Globs(GlobSet),
    Regexes(Vec<Regex>),
}

/// Immutable set of exclusion patterns scoped to one project root.
#[derive(Debug)]
pub struct PathExclusions {
    matcher: Matcher,
}

impl PathExclusions {
    /// Compile exclusion patterns. Glob-style by default; regular expressions
    /// when `use_regex_matching` is set. Regex patterns are anchored at the
    /// start of the project-relative path.
    pub fn new(patterns: &[String], use_regex_matching: bool) -> Result<Self, ConfigError> {
        let matcher = if use_regex_matching {
            let mut regexes = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let anchored = format!("^(?:{pattern})");
                let regex = Regex::new(&anchored).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                regexes.push(regex);
            }
            Matcher::Regexes(regexes)
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in patterns {
                let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                builder.add(glob);
            }
            let set = builder.build().map_err(|e| ConfigError::InvalidPattern {
                pattern: patterns.join(", "),
                reason: e.to_string(),
            })?;
            Matcher::Globs(set)
        };

        Ok(Self { matcher })
    }

    /// Whether a project-relative path is excluded from analysis.
    ///
    /// A pattern matching a directory excludes everything beneath it, so the
    /// path and each of its ancestors are tested.
    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        let mut current = Some(relative_path);
        while let Some(path) = current {
            if path.as_os_str().is_empty() {
                break;
            }
            if self.matches(path) {
                return true;
            }
            current = path.parent();
        }
        false
    }

    fn matches(&self, path: &Path) -> bool {
        match &self.matcher {
            Matcher::Globs(set) => set.is_match(path),
            Matcher::Regexes(regexes) => {
                let text = path.to_string_lossy();
                regexes.iter().any(|r| r.is_match(&text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globs(patterns: &[&str]) -> PathExclusions {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        PathExclusions::new(&patterns, false).unwrap()
    }

    #[test]
    fn glob_pattern_excludes_directory_and_contents() {
        let exclusions = globs(&["**/tests"]);

        assert!(exclusions.is_excluded(Path::new("src/tests")));
        assert!(exclusions.is_excluded(Path::new("src/tests/test_api.py")));
        assert!(!exclusions.is_excluded(Path::new("src/api/handlers.py")));
    }

    #[test]
    fn glob_pattern_matches_suffix_wildcards() {
        let exclusions = globs(&["**/*__pycache__"]);

        assert!(exclusions.is_excluded(Path::new("pkg/__pycache__/mod.py")));
        assert!(!exclusions.is_excluded(Path::new("pkg/cache.py")));
    }

    #[test]
    fn regex_patterns_anchor_at_path_start() {
        let patterns = vec![r"generated/.*".to_string()];
        let exclusions = PathExclusions::new(&patterns, true).unwrap();

        assert!(exclusions.is_excluded(Path::new("generated/models.py")));
        assert!(!exclusions.is_excluded(Path::new("src/generated_helpers.py")));
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let patterns = vec!["(unclosed".to_string()];
        let err = PathExclusions::new(&patterns, true).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_pattern_set_excludes_nothing() {
        let exclusions = globs(&[]);
        assert!(!exclusions.is_excluded(Path::new("anything/at/all.py")));
    }
}
