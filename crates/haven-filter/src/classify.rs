//! External safety-classifier boundary.
//!
//! The "AI" safety check is an external collaborator reached over a
//! request/response call. It sits behind a narrow capability trait so the
//! pipeline can be exercised with a deterministic stub, and every invocation
//! is bounded by a caller-supplied timeout. The classifier being unreachable
//! is an expected condition, not a pipeline failure.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use haven_core::CategoryConfidence;

/// Ways the external classifier can fail. All of them are recovered locally
/// by degrading to lexical-only scoring.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The call did not complete within the configured timeout.
    #[error("classifier timed out")]
    Timeout,

    /// Transport-level failure reaching the classifier.
    #[error("classifier transport failure: {0}")]
    Transport(String),

    /// The classifier is not configured or is known to be down.
    #[error("classifier unavailable")]
    Unavailable,
}

/// Capability interface for the external safety classifier.
#[async_trait]
pub trait SafetyClassifier: Send + Sync {
    /// Classifies text into category confidences (0.0 to 1.0 each).
    async fn classify(&self, text: &str) -> Result<Vec<CategoryConfidence>, ClassifierError>;

    /// Returns the name of this classifier for logging/debugging.
    fn name(&self) -> &'static str {
        "classifier"
    }
}

/// Invokes the classifier with a hard deadline.
///
/// An elapsed deadline surfaces as [`ClassifierError::Timeout`]; the caller
/// proceeds with lexical-only scoring either way.
pub async fn classify_with_timeout(
    classifier: &dyn SafetyClassifier,
    text: &str,
    limit: Duration,
) -> Result<Vec<CategoryConfidence>, ClassifierError> {
    match tokio::time::timeout(limit, classifier.classify(text)).await {
        Ok(result) => result,
        Err(_) => Err(ClassifierError::Timeout),
    }
}
