//! Upstream aggregation-engine boundary.
//!
//! The multi-engine search federation is an external collaborator: it hands
//! the pipeline a query plus raw result items and takes back the filtered
//! set. Items are opaque text to be scored, not structured metadata to
//! validate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An incoming search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The raw query text.
    pub text: String,
    /// Language hint (ISO 639-1), when the caller knows it.
    #[serde(default)]
    pub language: Option<String>,
}

impl SearchQuery {
    /// Creates a query without a language hint.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }

    /// Attaches a language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// One raw result from the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    /// Result title.
    pub title: String,
    /// Result snippet.
    pub snippet: String,
    /// Result URL.
    pub url: String,
}

impl SearchItem {
    /// Creates a result item.
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }

    /// All scoreable text of the item, joined for matching.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.title, self.snippet, self.url)
    }

    /// Extracts the URL host, lowercased and without the port. Returns
    /// `None` for URLs with no scheme separator.
    pub fn host(&self) -> Option<String> {
        let (_, rest) = self.url.split_once("://")?;
        let authority = rest.split('/').next().unwrap_or(rest);
        let host = authority.split(':').next().unwrap_or(authority);
        if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        }
    }
}

/// Failure to obtain results from the aggregation engine. Propagated to the
/// caller as a failed search; the pipeline invents no results and leaves
/// retries to the aggregator.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport-level failure reaching the aggregator.
    #[error("upstream search transport failure: {0}")]
    Transport(String),

    /// The aggregator did not answer in time.
    #[error("upstream search timed out")]
    Timeout,
}

/// Capability interface for the external aggregation engine.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs the query and returns raw, unfiltered results.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>, UpstreamError>;
}
