//! Lexical matching against a blocklist snapshot.
//!
//! All comparisons run over [`normalize`](super::normalize::normalize)d text.
//! Absence of a match is a normal outcome, not an error.

use crate::blocklist::{BlocklistSnapshot, MatchMode};
use crate::classifier::normalize::{normalize, stem, tokenize};
use crate::classifier::Category;

/// Configuration for the lexical matcher.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Maximum Levenshtein distance for `fuzzy` rules.
    pub max_edit_distance: usize,
    /// Minimum pattern length for fuzzy matching; shorter patterns fall back
    /// to exact comparison to keep short words from matching half the
    /// dictionary.
    pub min_fuzzy_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_edit_distance: 1,
            min_fuzzy_len: 5,
        }
    }
}

/// A single lexical hit: the rule's category and severity, plus the pattern
/// that fired (for diagnostics, never for user display).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalMatch {
    /// Category of the matched rule.
    pub category: Category,
    /// Severity of the matched rule (0-100).
    pub severity: u8,
    /// The rule pattern that matched.
    pub pattern: String,
}

/// Matches text and URL hosts against the active blocklist snapshot.
#[derive(Debug, Clone, Default)]
pub struct LexicalMatcher {
    config: MatcherConfig,
}

impl LexicalMatcher {
    /// Creates a matcher with default settings.
    pub fn new() -> Self {
        Self::with_config(MatcherConfig::default())
    }

    /// Creates a matcher with the given configuration.
    pub fn with_config(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Matches `text` against every applicable rule in the snapshot.
    ///
    /// A rule applies when its language is unset (wildcard), the query has no
    /// language hint, or the two match. Returns one [`LexicalMatch`] per
    /// matching rule; an empty vec means no rule fired.
    pub fn matches(
        &self,
        text: &str,
        language: Option<&str>,
        snapshot: &BlocklistSnapshot,
    ) -> Vec<LexicalMatch> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Vec::new();
        }
        let tokens = tokenize(&normalized);
        let stemmed: Vec<String> = tokens.iter().map(|t| stem(t)).collect();

        let mut found = Vec::new();
        for rule in snapshot.rules() {
            if !language_applies(rule.entry().language.as_deref(), language) {
                continue;
            }
            let hit = match rule.entry().match_mode {
                MatchMode::Exact => normalized.contains(rule.normalized()),
                MatchMode::Stem => window_eq(&stemmed, rule.stemmed()),
                MatchMode::Fuzzy => self.fuzzy_hit(&normalized, &tokens, rule.tokens()),
            };
            if hit {
                found.push(LexicalMatch {
                    category: rule.entry().category,
                    severity: rule.entry().severity,
                    pattern: rule.entry().pattern.clone(),
                });
            }
        }
        found
    }

    /// Checks a URL host against the snapshot's domain blocklist.
    ///
    /// A host is blocked when any dot-suffix of it is listed, so
    /// `cdn.bad.example` matches a `bad.example` entry.
    pub fn match_host(&self, host: &str, snapshot: &BlocklistSnapshot) -> Option<LexicalMatch> {
        let host = host.trim().to_lowercase();
        if host.is_empty() {
            return None;
        }
        let labels: Vec<&str> = host.split('.').collect();
        for start in 0..labels.len().saturating_sub(1) {
            let candidate = labels[start..].join(".");
            if let Some((category, severity)) = snapshot.domain(&candidate) {
                return Some(LexicalMatch {
                    category,
                    severity,
                    pattern: candidate,
                });
            }
        }
        None
    }

    fn fuzzy_hit(&self, normalized: &str, tokens: &[&str], pattern_tokens: &[String]) -> bool {
        let pattern = pattern_tokens.join(" ");
        if pattern.len() < self.config.min_fuzzy_len {
            return normalized.contains(&pattern);
        }
        let width = pattern_tokens.len();
        if width == 0 || width > tokens.len() {
            return false;
        }
        for window in tokens.windows(width) {
            let candidate = window.join(" ");
            if strsim::levenshtein(&candidate, &pattern) <= self.config.max_edit_distance {
                return true;
            }
        }
        false
    }
}

fn language_applies(rule_language: Option<&str>, hint: Option<&str>) -> bool {
    match (rule_language, hint) {
        (None, _) => true,
        // No hint never narrows filtering.
        (Some(_), None) => true,
        (Some(rule), Some(hint)) => rule.eq_ignore_ascii_case(hint),
    }
}

fn window_eq(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::{BlocklistStore, DomainEntry, RuleDocument, RuleEntry};

    fn snapshot_with(rules: Vec<RuleEntry>, domains: Vec<DomainEntry>) -> BlocklistStore {
        let doc = RuleDocument { rules, domains };
        BlocklistStore::from_document(&doc).unwrap()
    }

    fn matcher() -> LexicalMatcher {
        LexicalMatcher::new()
    }

    // === Exact matching ===

    #[test]
    fn exact_match_on_normalized_substring() {
        let store = snapshot_with(
            vec![RuleEntry::new("proxy site", Category::Circumvention, 80)],
            vec![],
        );
        let found = matcher().matches("Best PROXY site ever", None, &store.current());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, Category::Circumvention);
        assert_eq!(found[0].severity, 80);
    }

    #[test]
    fn exact_match_defeats_leetspeak() {
        let store = snapshot_with(
            vec![RuleEntry::new("proxy", Category::Circumvention, 80)],
            vec![],
        );
        let found = matcher().matches("pr0xy", None, &store.current());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn no_match_returns_empty_vec() {
        let store = snapshot_with(
            vec![RuleEntry::new("proxy", Category::Circumvention, 80)],
            vec![],
        );
        assert!(matcher()
            .matches("free download", None, &store.current())
            .is_empty());
    }

    #[test]
    fn empty_text_matches_nothing() {
        let store = snapshot_with(
            vec![RuleEntry::new("proxy", Category::Circumvention, 80)],
            vec![],
        );
        assert!(matcher().matches("   ", None, &store.current()).is_empty());
    }

    // === Stem matching ===

    #[test]
    fn stem_match_tolerates_inflection() {
        let store = snapshot_with(
            vec![RuleEntry::new("buy gun", Category::Weapons, 90)
                .with_mode(crate::blocklist::MatchMode::Stem)],
            vec![],
        );
        let snapshot = store.current();
        assert_eq!(matcher().matches("buying guns online", None, &snapshot).len(), 1);
        assert!(matcher().matches("begun again", None, &snapshot).is_empty());
    }

    // === Fuzzy matching ===

    #[test]
    fn fuzzy_match_tolerates_one_edit() {
        let store = snapshot_with(
            vec![RuleEntry::new("gambling", Category::Gambling, 85)
                .with_mode(crate::blocklist::MatchMode::Fuzzy)],
            vec![],
        );
        let snapshot = store.current();
        assert_eq!(matcher().matches("gamblng sites", None, &snapshot).len(), 1);
        assert!(matcher().matches("scrambling eggs", None, &snapshot).is_empty());
    }

    #[test]
    fn short_fuzzy_patterns_require_exact() {
        let store = snapshot_with(
            vec![RuleEntry::new("gun", Category::Weapons, 90)
                .with_mode(crate::blocklist::MatchMode::Fuzzy)],
            vec![],
        );
        let snapshot = store.current();
        // "fun" is one edit from "gun" but the pattern is below min_fuzzy_len.
        assert!(matcher().matches("fun times", None, &snapshot).is_empty());
        assert_eq!(matcher().matches("gun shop", None, &snapshot).len(), 1);
    }

    // === Language filtering ===

    #[test]
    fn language_scoped_rule_skips_other_languages() {
        let store = snapshot_with(
            vec![RuleEntry::new("waffen", Category::Weapons, 90).with_language("de")],
            vec![],
        );
        let snapshot = store.current();
        assert!(matcher().matches("waffen kaufen", Some("en"), &snapshot).is_empty());
        assert_eq!(matcher().matches("waffen kaufen", Some("de"), &snapshot).len(), 1);
        // Missing hint never narrows filtering.
        assert_eq!(matcher().matches("waffen kaufen", None, &snapshot).len(), 1);
    }

    #[test]
    fn wildcard_rule_applies_to_all_languages() {
        let store = snapshot_with(
            vec![RuleEntry::new("proxy", Category::Circumvention, 80)],
            vec![],
        );
        let snapshot = store.current();
        assert_eq!(matcher().matches("proxy", Some("fr"), &snapshot).len(), 1);
    }

    // === Multiple rules ===

    #[test]
    fn all_matching_rules_reported() {
        let store = snapshot_with(
            vec![
                RuleEntry::new("proxy", Category::Circumvention, 80),
                RuleEntry::new("unblocked games", Category::Circumvention, 65),
                RuleEntry::new("casino", Category::Gambling, 85),
            ],
            vec![],
        );
        let found = matcher().matches("proxy for unblocked games", None, &store.current());
        assert_eq!(found.len(), 2);
    }

    // === Host matching ===

    #[test]
    fn host_suffix_matches_listed_domain() {
        let store = snapshot_with(
            vec![],
            vec![DomainEntry::new("bad.example", Category::Adult, 90)],
        );
        let snapshot = store.current();
        let hit = matcher().match_host("cdn.bad.example", &snapshot);
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().pattern, "bad.example");
        assert!(matcher().match_host("notbad.example", &snapshot).is_none());
    }

    #[test]
    fn host_match_is_case_insensitive() {
        let store = snapshot_with(
            vec![],
            vec![DomainEntry::new("bad.example", Category::Adult, 90)],
        );
        assert!(matcher()
            .match_host("BAD.Example", &store.current())
            .is_some());
    }

    #[test]
    fn empty_host_matches_nothing() {
        let store = snapshot_with(
            vec![],
            vec![DomainEntry::new("bad.example", Category::Adult, 90)],
        );
        assert!(matcher().match_host("", &store.current()).is_none());
    }
}
