//! Haven Filter - the async content safety pipeline.
//!
//! Intercepts a query and its aggregated results, computes risk assessments
//! against the active blocklist snapshot and an optional external classifier,
//! and decides per item whether to block, annotate, or pass through,
//! attaching crisis-resource references for sensitive categories.

pub mod classify;
pub mod error;
pub mod pipeline;
pub mod upstream;

pub use classify::{classify_with_timeout, ClassifierError, SafetyClassifier};
pub use error::FilterError;
pub use pipeline::{Advisory, PipelineConfig, SafeResponse, SafetyPipeline, ScoredItem};
pub use upstream::{SearchItem, SearchProvider, SearchQuery, UpstreamError};
