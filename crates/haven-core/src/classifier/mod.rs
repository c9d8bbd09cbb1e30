//! Content classification: normalization, lexical matching, and risk scoring.

mod category;
pub mod lexical;
pub mod normalize;
pub mod scorer;

pub use category::Category;
pub use lexical::{LexicalMatch, LexicalMatcher, MatcherConfig};
pub use scorer::{CategoryConfidence, ContextDampener, RiskAssessment, RiskScorer, SignalSource};
