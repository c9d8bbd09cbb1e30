//! Haven Core - blocklist, lexical matching, risk scoring, and policy routing.
//!
//! This crate holds the synchronous safety logic of the Haven content safety
//! pipeline. The async per-request orchestration lives in `haven-filter`.

pub mod blocklist;
pub mod classifier;
pub mod error;
pub mod policy;

pub use blocklist::{
    BlocklistSnapshot, BlocklistStore, DomainEntry, MatchMode, RuleDocument, RuleEntry,
};
pub use classifier::{
    Category, CategoryConfidence, ContextDampener, LexicalMatch, LexicalMatcher, MatcherConfig,
    RiskAssessment, RiskScorer, SignalSource,
};
pub use error::LoadError;
pub use policy::{CategoryPolicy, PolicyAction, PolicyDecision, PolicyTable};
