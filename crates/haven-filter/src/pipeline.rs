//! Per-request safety pipeline.
//!
//! One invocation per incoming query; invocations run concurrently and share
//! nothing but the read-only blocklist snapshot. The flow per request:
//! score the query, short-circuit on a block before anything is fetched,
//! otherwise fetch results and score every item independently under a
//! bounded fan-out, then reassemble in original order.
//!
//! No task is spawned on the runtime: every sub-future is owned by the
//! request future, so dropping a cancelled request cancels classifier calls
//! and in-flight scoring cooperatively.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use haven_core::{
    BlocklistSnapshot, BlocklistStore, Category, LexicalMatcher, PolicyDecision, PolicyTable,
    RiskAssessment, RiskScorer,
};

use crate::classify::{classify_with_timeout, SafetyClassifier};
use crate::error::FilterError;
use crate::upstream::{SearchItem, SearchProvider, SearchQuery};

/// Tunables for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Deadline for each external classifier call.
    pub classifier_timeout: Duration,
    /// Upper bound on concurrently scored result items per request.
    pub max_concurrency: usize,
    /// Whether the external classifier is also consulted per result item
    /// (it is always consulted for the query itself when configured).
    pub classify_results: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: Duration::from_millis(800),
            max_concurrency: 8,
            classify_results: true,
        }
    }
}

impl PipelineConfig {
    /// Config with per-item classifier calls disabled.
    pub fn lexical_results_only() -> Self {
        Self {
            classify_results: false,
            ..Self::default()
        }
    }
}

/// Worst-case category found across the query and surviving items, so the
/// presentation layer can show a crisis banner even when nothing was
/// blocked outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    /// The category with the highest configured severity that triggered.
    pub category: Category,
    /// Crisis-resource reference for that category, when configured.
    pub resource_ref: Option<String>,
}

/// A retained result item with its decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// The item as received from the aggregator.
    pub item: SearchItem,
    /// The per-item decision (`allow`, `warn`, or `attach_resource`;
    /// blocked items are dropped from the response).
    pub decision: PolicyDecision,
}

/// The annotated response handed back to the presentation layer. Decision
/// data only; rendering blocked placeholders and hotline banners is the
/// caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeResponse {
    /// Decision for the query itself.
    pub query_decision: PolicyDecision,
    /// Surviving items, in the aggregator's original order.
    pub results: Vec<ScoredItem>,
    /// Worst-case advisory across query and surviving items.
    pub advisory: Option<Advisory>,
}

impl SafeResponse {
    /// True when the query itself was blocked and nothing was fetched.
    pub fn query_blocked(&self) -> bool {
        self.query_decision.is_block()
    }
}

/// The content safety pipeline.
pub struct SafetyPipeline {
    store: Arc<BlocklistStore>,
    provider: Arc<dyn SearchProvider>,
    classifier: Option<Arc<dyn SafetyClassifier>>,
    matcher: LexicalMatcher,
    scorer: RiskScorer,
    policies: PolicyTable,
    config: PipelineConfig,
    limiter: Arc<Semaphore>,
}

impl SafetyPipeline {
    /// Creates a pipeline with kid-safe policies, the default matcher and
    /// scorer, and no external classifier.
    pub fn new(store: Arc<BlocklistStore>, provider: Arc<dyn SearchProvider>) -> Self {
        let config = PipelineConfig::default();
        let limiter = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            store,
            provider,
            classifier: None,
            matcher: LexicalMatcher::new(),
            scorer: RiskScorer::new(),
            policies: PolicyTable::kid_safe_defaults(),
            config,
            limiter,
        }
    }

    /// Attaches an external classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn SafetyClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replaces the policy table.
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Replaces the lexical matcher.
    pub fn with_matcher(mut self, matcher: LexicalMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replaces the scorer.
    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replaces the configuration and resizes the fan-out limit.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.limiter = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        self.config = config;
        self
    }

    /// Runs one query through the pipeline.
    ///
    /// The blocklist snapshot is pinned once and used for the whole request,
    /// so a concurrent reload never produces a half-old, half-new response.
    pub async fn run(&self, query: &SearchQuery) -> Result<SafeResponse, FilterError> {
        let snapshot = self.store.current();
        let language = query.language.as_deref();

        let query_assessment = self
            .assess(&query.text, language, &snapshot, true)
            .await;
        let query_decision = self.policies.decide(&query_assessment);

        if query_decision.is_block() {
            tracing::info!(
                version = snapshot.version(),
                score = query_assessment.score,
                category = ?query_decision.category,
                "query blocked, skipping result fetch"
            );
            let advisory = self.advisory(std::iter::once(&query_assessment));
            return Ok(SafeResponse {
                query_decision,
                results: Vec::new(),
                advisory,
            });
        }

        let items = self.provider.search(query).await?;
        let total = items.len();

        // Item scoring has no cross-item dependency; fan out bounded by the
        // semaphore and let join_all keep the original order.
        let scored = futures::future::join_all(
            items
                .into_iter()
                .map(|item| self.score_item(item, language, &snapshot)),
        )
        .await;

        let mut results = Vec::with_capacity(scored.len());
        let mut surviving = vec![query_assessment];
        let mut dropped = 0usize;
        for (item, assessment, decision) in scored {
            if decision.is_block() {
                dropped += 1;
                tracing::debug!(
                    category = ?decision.category,
                    score = assessment.score,
                    "result suppressed"
                );
                continue;
            }
            surviving.push(assessment);
            results.push(ScoredItem { item, decision });
        }
        if dropped > 0 {
            tracing::info!(dropped, total, version = snapshot.version(), "results filtered");
        }

        let advisory = self.advisory(surviving.iter());
        Ok(SafeResponse {
            query_decision,
            results,
            advisory,
        })
    }

    /// Scores one piece of text: lexical matches plus (optionally) the
    /// external classifier, degraded to lexical-only on any classifier error.
    async fn assess(
        &self,
        text: &str,
        language: Option<&str>,
        snapshot: &BlocklistSnapshot,
        use_classifier: bool,
    ) -> RiskAssessment {
        let matches = self.matcher.matches(text, language, snapshot);
        let verdicts = if use_classifier {
            self.classifier_verdicts(text).await
        } else {
            None
        };
        self.scorer
            .score(text, &matches, verdicts.as_deref(), &self.policies)
    }

    async fn score_item(
        &self,
        item: SearchItem,
        language: Option<&str>,
        snapshot: &BlocklistSnapshot,
    ) -> (SearchItem, RiskAssessment, PolicyDecision) {
        // A closed semaphore would only mean the limiter is gone; scoring
        // must still happen.
        let _permit = self.limiter.acquire().await.ok();

        let text = item.searchable_text();
        let mut matches = self.matcher.matches(&text, language, snapshot);
        if let Some(host) = item.host() {
            if let Some(hit) = self.matcher.match_host(&host, snapshot) {
                matches.push(hit);
            }
        }
        let verdicts = if self.config.classify_results {
            self.classifier_verdicts(&text).await
        } else {
            None
        };
        let assessment = self
            .scorer
            .score(&text, &matches, verdicts.as_deref(), &self.policies);
        let decision = self.policies.decide(&assessment);
        (item, assessment, decision)
    }

    async fn classifier_verdicts(
        &self,
        text: &str,
    ) -> Option<Vec<haven_core::CategoryConfidence>> {
        let classifier = self.classifier.as_ref()?;
        match classify_with_timeout(
            classifier.as_ref(),
            text,
            self.config.classifier_timeout,
        )
        .await
        {
            Ok(verdicts) => Some(verdicts),
            Err(error) => {
                tracing::warn!(
                    classifier = classifier.name(),
                    %error,
                    "classifier unavailable, scoring lexical-only"
                );
                None
            }
        }
    }

    fn advisory<'a>(
        &self,
        assessments: impl Iterator<Item = &'a RiskAssessment>,
    ) -> Option<Advisory> {
        let mut best: Option<(Category, u8)> = None;
        for assessment in assessments {
            for &category in assessment.categories.keys() {
                let severity = self.policies.policy(category).severity;
                if best.map_or(true, |(_, s)| severity > s) {
                    best = Some((category, severity));
                }
            }
        }
        best.map(|(category, _)| Advisory {
            category,
            resource_ref: self.policies.policy(category).hotline,
        })
    }
}
