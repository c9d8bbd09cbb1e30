//! Error types for the filter pipeline.

use thiserror::Error;

use crate::upstream::UpstreamError;

/// A failed pipeline invocation.
///
/// Scoring-side problems never appear here: classifier trouble degrades to
/// lexical-only scoring and uncertainty degrades toward `warn`. The only
/// hard failure is the upstream aggregator refusing to produce results.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The aggregation engine failed to return results.
    #[error("upstream search failed: {0}")]
    Upstream(#[from] UpstreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_converts() {
        let err: FilterError = UpstreamError::Timeout.into();
        assert!(matches!(err, FilterError::Upstream(UpstreamError::Timeout)));
        assert!(err.to_string().contains("upstream"));
    }
}
