use crate::DEFAULT_IGNORE_PATTERNS;
use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};

/// Glob matching is done on base names only and is case-sensitive.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Set of glob patterns matched against base names.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    /// Compiled patterns, built-in ones first
    patterns: Vec<Pattern>,
}

impl Default for IgnoreSet {
    /// The built-in list: manifest files, VCS metadata and OS metadata files.
    fn default() -> Self {
        let patterns = DEFAULT_IGNORE_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { patterns }
    }
}

impl IgnoreSet {
    /// A set that ignores nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add one glob pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid glob.
    pub fn add(&mut self, pattern: &str) -> Result<()> {
        let compiled =
            Pattern::new(pattern).with_context(|| format!("Invalid ignore pattern: {pattern}"))?;
        self.patterns.push(compiled);
        Ok(())
    }

    /// Whether `name` (a base name, not a path) matches any pattern.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(".filecheck", true)]
    #[case(".filecheck.tmp", true)]
    #[case(".git", true)]
    #[case(".DS_Store", true)]
    #[case("Icon\r", true)]
    #[case("._Icon\r", true)]
    #[case("icon.png", false)]
    #[case(".filecheck.bak", false)]
    #[case("notes.txt", false)]
    fn test_default_patterns(#[case] name: &str, #[case] ignored: bool) {
        assert_eq!(IgnoreSet::default().is_match(name), ignored);
    }

    #[test]
    fn test_added_patterns_match_base_names() -> Result<()> {
        let mut ignore = IgnoreSet::empty();
        ignore.add("*.swp")?;
        ignore.add("build?")?;

        assert!(ignore.is_match("file.swp"));
        assert!(ignore.is_match("build1"));
        assert!(!ignore.is_match("file.SWP"));
        assert!(!ignore.is_match("build"));
        Ok(())
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut ignore = IgnoreSet::empty();
        assert!(ignore.add("a**b").is_err());
        assert!(!ignore.is_match("a**b"));
    }
}
