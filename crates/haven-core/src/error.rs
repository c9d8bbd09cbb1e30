//! Error types for blocklist loading.

use thiserror::Error;

/// Reasons a rule document is rejected.
///
/// A rejected load or reload never partially applies: the store keeps serving
/// the previous snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A rule has an empty pattern.
    #[error("rule {index}: empty pattern")]
    EmptyPattern {
        /// Position of the offending rule in the document.
        index: usize,
    },

    /// A rule pattern normalizes to nothing and can never match.
    #[error("rule {index}: pattern {pattern:?} has no matchable content")]
    InvalidPattern {
        /// Position of the offending rule in the document.
        index: usize,
        /// The offending pattern.
        pattern: String,
    },

    /// Two rules share a pattern+language without an override flag.
    #[error("duplicate rule for pattern {pattern:?} (language {language:?})")]
    DuplicateRule {
        /// The duplicated pattern.
        pattern: String,
        /// The duplicated language scope.
        language: Option<String>,
    },

    /// A domain entry has an empty host.
    #[error("domain {index}: empty host")]
    EmptyHost {
        /// Position of the offending domain in the document.
        index: usize,
    },

    /// The document is not valid JSON or references an unknown category.
    #[error("malformed rule document: {0}")]
    Parse(#[from] serde_json::Error),
}
