//! Blocklist rules, immutable snapshots, and the hot-reloadable store.
//!
//! The rule set is represented as an immutable, versioned [`BlocklistSnapshot`]
//! published behind an atomic pointer swap. Readers pin one snapshot per
//! request and are never exposed to a partially-applied rule set; a failed
//! reload leaves the previous snapshot authoritative.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::classifier::normalize::{normalize, stem, tokenize};
use crate::classifier::Category;
use crate::error::LoadError;

/// How a rule pattern is compared against text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Normalized substring match.
    #[default]
    Exact,
    /// Word-stem comparison, tolerant of inflection.
    Stem,
    /// Edit-distance comparison over normalized tokens.
    Fuzzy,
}

impl MatchMode {
    /// Returns a human-readable name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            MatchMode::Exact => "Exact",
            MatchMode::Stem => "Stem",
            MatchMode::Fuzzy => "Fuzzy",
        }
    }
}

/// A single blocklist rule. Immutable once loaded; identified by
/// pattern+language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// The pattern to match.
    pub pattern: String,
    /// How the pattern is compared.
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Category this rule maps to.
    pub category: Category,
    /// Severity (0-100); values above 100 are clamped at load.
    pub severity: u8,
    /// Language code (ISO 639-1); `None` applies to every language.
    #[serde(default)]
    pub language: Option<String>,
    /// Marks this entry as an override: it replaces an earlier rule with the
    /// same pattern+language instead of raising a duplicate error.
    #[serde(default)]
    pub replace: bool,
}

impl RuleEntry {
    /// Creates an exact-match rule.
    pub fn new(pattern: impl Into<String>, category: Category, severity: u8) -> Self {
        Self {
            pattern: pattern.into(),
            match_mode: MatchMode::Exact,
            category,
            severity,
            language: None,
            replace: false,
        }
    }

    /// Sets the match mode.
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Scopes the rule to a language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Marks the rule as an override for an earlier duplicate.
    pub fn with_replace(mut self) -> Self {
        self.replace = true;
        self
    }

    fn key(&self) -> (String, Option<String>) {
        (self.pattern.clone(), self.language.clone())
    }
}

/// A blocked domain. Hosts are matched by dot-suffix, so an entry for
/// `bad.example` also covers `cdn.bad.example`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
    /// The domain to block.
    pub host: String,
    /// Category attributed to the domain.
    pub category: Category,
    /// Severity (0-100) attributed to the domain.
    pub severity: u8,
}

impl DomainEntry {
    /// Creates a domain entry.
    pub fn new(host: impl Into<String>, category: Category, severity: u8) -> Self {
        Self {
            host: host.into(),
            category,
            severity,
        }
    }
}

/// The loadable rule-set representation consumed by `load`/`reload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Textual pattern rules.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    /// Blocked domains.
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
}

/// A rule with its match forms precomputed at load time, so per-request
/// matching allocates nothing for the pattern side.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    entry: RuleEntry,
    normalized: String,
    tokens: Vec<String>,
    stemmed: Vec<String>,
}

impl CompiledRule {
    fn compile(entry: RuleEntry) -> Self {
        let normalized = normalize(&entry.pattern);
        let tokens: Vec<String> = tokenize(&normalized).iter().map(|t| t.to_string()).collect();
        let stemmed: Vec<String> = tokens.iter().map(|t| stem(t)).collect();
        Self {
            entry,
            normalized,
            tokens,
            stemmed,
        }
    }

    /// The rule as loaded.
    pub fn entry(&self) -> &RuleEntry {
        &self.entry
    }

    /// The normalized pattern.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The normalized pattern tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The stemmed pattern tokens.
    pub fn stemmed(&self) -> &[String] {
        &self.stemmed
    }
}

/// An immutable, versioned view of the rule set.
///
/// Created at load/reload time, owned by the [`BlocklistStore`], and
/// read-shared by all concurrent pipeline invocations. Never mutated after
/// construction, only replaced wholesale.
#[derive(Debug)]
pub struct BlocklistSnapshot {
    version: u64,
    loaded_at: DateTime<Utc>,
    rules: Vec<CompiledRule>,
    domains: HashMap<String, (Category, u8)>,
}

impl BlocklistSnapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            loaded_at: Utc::now(),
            rules: Vec::new(),
            domains: HashMap::new(),
        }
    }

    fn build(version: u64, document: &RuleDocument) -> Result<Self, LoadError> {
        let mut seen: HashMap<(String, Option<String>), usize> = HashMap::new();
        let mut compiled: Vec<CompiledRule> = Vec::with_capacity(document.rules.len());

        for (index, entry) in document.rules.iter().enumerate() {
            let mut entry = entry.clone();
            if entry.pattern.trim().is_empty() {
                return Err(LoadError::EmptyPattern { index });
            }
            if normalize(&entry.pattern).is_empty() {
                return Err(LoadError::InvalidPattern {
                    index,
                    pattern: entry.pattern,
                });
            }
            entry.severity = entry.severity.min(100);

            let key = entry.key();
            match seen.get(&key).copied() {
                Some(slot) if entry.replace => {
                    compiled[slot] = CompiledRule::compile(entry);
                }
                Some(_) => {
                    return Err(LoadError::DuplicateRule {
                        pattern: entry.pattern,
                        language: entry.language,
                    });
                }
                None => {
                    seen.insert(key, compiled.len());
                    compiled.push(CompiledRule::compile(entry));
                }
            }
        }

        let mut domains = HashMap::with_capacity(document.domains.len());
        for (index, entry) in document.domains.iter().enumerate() {
            let host = entry.host.trim().to_lowercase();
            if host.is_empty() {
                return Err(LoadError::EmptyHost { index });
            }
            domains.insert(host, (entry.category, entry.severity.min(100)));
        }

        Ok(Self {
            version,
            loaded_at: Utc::now(),
            rules: compiled,
            domains,
        })
    }

    /// Monotonic snapshot version. The initial empty snapshot is version 0.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When this snapshot was loaded.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// The compiled pattern rules.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Looks up a blocked domain by exact host.
    pub fn domain(&self, host: &str) -> Option<(Category, u8)> {
        self.domains.get(host).copied()
    }

    /// Number of pattern rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Number of blocked domains.
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// True when the snapshot holds no rules and no domains.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.domains.is_empty()
    }
}

/// Holds the current rule set and supports atomic hot-reload.
///
/// The snapshot pointer is the only shared mutable resource in the pipeline.
/// It is updated via a single publish under a write lock held for a pointer
/// store, never via in-place mutation, so concurrent readers never observe a
/// torn rule set. In-flight requests keep their pinned `Arc` until they
/// complete.
#[derive(Debug)]
pub struct BlocklistStore {
    current: RwLock<Arc<BlocklistSnapshot>>,
}

impl BlocklistStore {
    /// Creates a store with an empty version-0 snapshot.
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(Arc::new(BlocklistSnapshot::empty())),
        }
    }

    /// Creates a store from a parsed rule document.
    pub fn from_document(document: &RuleDocument) -> Result<Self, LoadError> {
        let snapshot = BlocklistSnapshot::build(1, document)?;
        tracing::info!(
            version = snapshot.version(),
            rules = snapshot.rule_count(),
            domains = snapshot.domain_count(),
            "blocklist loaded"
        );
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Creates a store from a JSON rule document.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let document: RuleDocument = serde_json::from_str(json)?;
        Self::from_document(&document)
    }

    /// Returns the active snapshot. Never blocks on a reload in progress
    /// beyond the pointer read itself.
    pub fn current(&self) -> Arc<BlocklistSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Builds a new snapshot from the document and publishes it atomically.
    ///
    /// On error the previous snapshot remains authoritative; a rule set is
    /// never partially applied. Returns the new snapshot version.
    pub fn reload(&self, document: &RuleDocument) -> Result<u64, LoadError> {
        let next_version = self.current.read().version() + 1;
        let snapshot = BlocklistSnapshot::build(next_version, document)?;
        let version = snapshot.version();
        let rules = snapshot.rule_count();
        let domains = snapshot.domain_count();
        *self.current.write() = Arc::new(snapshot);
        tracing::info!(version, rules, domains, "blocklist reloaded");
        Ok(version)
    }

    /// Parses JSON and reloads.
    pub fn reload_json(&self, json: &str) -> Result<u64, LoadError> {
        let document: RuleDocument = serde_json::from_str(json)?;
        self.reload(&document)
    }
}

impl Default for BlocklistStore {
    fn default() -> Self {
        Self::empty()
    }
}
