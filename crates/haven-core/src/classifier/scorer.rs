//! Risk scoring: combines lexical matches and external-classifier verdicts
//! into a single 0-100 assessment.
//!
//! Signals combine by maximum, per category and overall. A single severe
//! signal wins; averaging would dilute it. Assessments are produced fresh per
//! query or result and are intentionally not serializable: they are never
//! persisted.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::lexical::LexicalMatch;
use crate::classifier::Category;
use crate::policy::PolicyTable;

/// Which signals produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Blocklist matches only.
    Lexical,
    /// External classifier only.
    Classifier,
    /// Both signal kinds contributed.
    Combined,
}

/// One category verdict from the external classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfidence {
    /// The reported category.
    pub category: Category,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
}

impl CategoryConfidence {
    /// Creates a verdict, clamping confidence into range.
    pub fn new(category: Category, confidence: f32) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// The result of scoring one piece of text against one snapshot version.
///
/// A pure function of its inputs: identical text, snapshot, and classifier
/// output always produce an identical assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Overall risk (0-100): the worst per-category score.
    pub score: u8,
    /// Per-category scores for every triggered category.
    pub categories: BTreeMap<Category, u8>,
    /// Which signals contributed.
    pub source: SignalSource,
}

impl RiskAssessment {
    /// An assessment with no triggered categories.
    pub fn clear() -> Self {
        Self {
            score: 0,
            categories: BTreeMap::new(),
            source: SignalSource::Lexical,
        }
    }

    /// True when any category triggered.
    pub fn is_flagged(&self) -> bool {
        !self.categories.is_empty()
    }

    /// The highest-scoring category, ties broken by category order.
    pub fn top_category(&self) -> Option<(Category, u8)> {
        let mut best: Option<(Category, u8)> = None;
        for (&category, &score) in &self.categories {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((category, score));
            }
        }
        best
    }
}

static EDUCATIONAL_CONTEXT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?:history|origins?|evolution|timeline)\s+(?:of|behind)\b",
        r"^what\s+(?:is|are|was|were)\b",
        r"^(?:effects?|impact|consequences?|dangers?)\s+of\b",
        r"^(?:science|chemistry|physics|biology)\s+(?:of|behind)\b",
        r"^why\s+(?:is|are|do|does|did|was|were)\b",
        r"\b(?:for\s+kids|for\s+students|for\s+school|homework|essay|report|project)\b",
        r"\b(?:definition|meaning|explained|overview|summary)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid educational-context pattern"))
    .collect()
});

/// Detects research-style phrasing that lowers scores for categories whose
/// policy allows it. Crisis and exploitation categories never reduce.
#[derive(Debug, Clone)]
pub struct ContextDampener {
    patterns: Vec<Regex>,
    reduction: u8,
}

impl Default for ContextDampener {
    fn default() -> Self {
        Self {
            patterns: EDUCATIONAL_CONTEXT.clone(),
            reduction: 30,
        }
    }
}

impl ContextDampener {
    /// Creates a dampener with a custom reduction amount.
    pub fn with_reduction(reduction: u8) -> Self {
        Self {
            reduction,
            ..Self::default()
        }
    }

    /// A dampener that never applies.
    pub fn disabled() -> Self {
        Self {
            patterns: Vec::new(),
            reduction: 0,
        }
    }

    /// True when the text reads as educational phrasing.
    pub fn applies(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.patterns.iter().any(|p| p.is_match(&lowered))
    }

    /// The score reduction applied to reducible categories.
    pub fn reduction(&self) -> u8 {
        self.reduction
    }
}

/// Combines lexical and classifier signals into a [`RiskAssessment`].
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    dampener: ContextDampener,
}

impl RiskScorer {
    /// Creates a scorer with the default educational-context dampener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scorer with a custom dampener.
    pub fn with_dampener(dampener: ContextDampener) -> Self {
        Self { dampener }
    }

    /// Scores text given its lexical matches and optional classifier
    /// verdicts.
    ///
    /// Per category the base is the highest lexical severity; a classifier
    /// verdict contributes `confidence * category weight`, merged by max.
    /// The overall score is the worst category, clamped to 0-100. `verdicts`
    /// is `None` when the classifier was unavailable; scoring then proceeds
    /// on lexical signals alone.
    pub fn score(
        &self,
        text: &str,
        matches: &[LexicalMatch],
        verdicts: Option<&[CategoryConfidence]>,
        table: &PolicyTable,
    ) -> RiskAssessment {
        let mut categories: BTreeMap<Category, u8> = BTreeMap::new();

        for hit in matches {
            let entry = categories.entry(hit.category).or_insert(0);
            *entry = (*entry).max(hit.severity.min(100));
        }
        let lexical_signal = !matches.is_empty();

        let mut classifier_signal = false;
        if let Some(verdicts) = verdicts {
            for verdict in verdicts {
                let weight = table.policy(verdict.category).weight;
                let contribution =
                    (verdict.confidence.clamp(0.0, 1.0) * f32::from(weight)).round() as u8;
                if contribution == 0 {
                    continue;
                }
                classifier_signal = true;
                let entry = categories.entry(verdict.category).or_insert(0);
                *entry = (*entry).max(contribution);
            }
        }

        if !categories.is_empty() && self.dampener.applies(text) {
            for (category, score) in categories.iter_mut() {
                if table.policy(*category).reducible {
                    *score = score.saturating_sub(self.dampener.reduction());
                }
            }
            categories.retain(|_, score| *score > 0);
        }

        let score = categories.values().copied().max().unwrap_or(0).min(100);
        let source = match (lexical_signal, classifier_signal) {
            (true, true) => SignalSource::Combined,
            (false, true) => SignalSource::Classifier,
            _ => SignalSource::Lexical,
        };

        RiskAssessment {
            score,
            categories,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(category: Category, severity: u8) -> LexicalMatch {
        LexicalMatch {
            category,
            severity,
            pattern: "test".to_string(),
        }
    }

    fn table() -> PolicyTable {
        PolicyTable::kid_safe_defaults()
    }

    // === Lexical scoring ===

    #[test]
    fn no_signals_scores_zero() {
        let assessment = RiskScorer::new().score("anything", &[], None, &table());
        assert_eq!(assessment.score, 0);
        assert!(!assessment.is_flagged());
        assert_eq!(assessment.source, SignalSource::Lexical);
    }

    #[test]
    fn base_score_is_max_lexical_severity() {
        let matches = vec![
            hit(Category::Violence, 40),
            hit(Category::Violence, 90),
            hit(Category::Gambling, 60),
        ];
        let assessment = RiskScorer::new().score("text", &matches, None, &table());
        assert_eq!(assessment.score, 90);
        assert_eq!(assessment.categories[&Category::Violence], 90);
        assert_eq!(assessment.categories[&Category::Gambling], 60);
    }

    // === Classifier contribution ===

    #[test]
    fn classifier_contribution_scaled_by_weight() {
        let mut table = PolicyTable::kid_safe_defaults();
        table.set(
            Category::Violence,
            crate::policy::CategoryPolicy::new(80, 90).with_weight(50),
        );
        let verdicts = vec![CategoryConfidence::new(Category::Violence, 0.8)];
        let assessment = RiskScorer::new().score("text", &[], Some(&verdicts), &table);
        assert_eq!(assessment.score, 40);
        assert_eq!(assessment.source, SignalSource::Classifier);
    }

    #[test]
    fn worst_signal_wins_per_category() {
        let matches = vec![hit(Category::Violence, 85)];
        let verdicts = vec![CategoryConfidence::new(Category::Violence, 0.5)];
        let assessment = RiskScorer::new().score("text", &matches, Some(&verdicts), &table());
        // Lexical 85 beats classifier 50; they are not averaged.
        assert_eq!(assessment.score, 85);
        assert_eq!(assessment.source, SignalSource::Combined);
    }

    #[test]
    fn classifier_can_raise_lexical_score() {
        let matches = vec![hit(Category::Violence, 40)];
        let verdicts = vec![CategoryConfidence::new(Category::Violence, 0.95)];
        let assessment = RiskScorer::new().score("text", &matches, Some(&verdicts), &table());
        assert_eq!(assessment.score, 95);
    }

    #[test]
    fn missing_classifier_degrades_to_lexical_only() {
        let matches = vec![hit(Category::SelfHarm, 90)];
        let with = RiskScorer::new().score("text", &matches, Some(&[]), &table());
        let without = RiskScorer::new().score("text", &matches, None, &table());
        assert_eq!(with.score, 90);
        assert_eq!(without.score, 90);
        assert_eq!(without.source, SignalSource::Lexical);
    }

    #[test]
    fn confidence_clamped() {
        let verdict = CategoryConfidence::new(Category::Violence, 7.5);
        assert_eq!(verdict.confidence, 1.0);
        let verdict = CategoryConfidence::new(Category::Violence, -1.0);
        assert_eq!(verdict.confidence, 0.0);
    }

    // === Dampening ===

    #[test]
    fn educational_context_reduces_reducible_categories() {
        let matches = vec![hit(Category::Drugs, 90)];
        let assessment =
            RiskScorer::new().score("effects of heroin for school report", &matches, None, &table());
        assert_eq!(assessment.score, 60);
    }

    #[test]
    fn educational_context_never_reduces_crisis_categories() {
        let matches = vec![hit(Category::SelfHarm, 90)];
        let assessment =
            RiskScorer::new().score("what is suicide", &matches, None, &table());
        assert_eq!(assessment.score, 90);
    }

    #[test]
    fn dampened_to_zero_drops_category() {
        let matches = vec![hit(Category::Piracy, 20)];
        let assessment =
            RiskScorer::new().score("what is a torrent", &matches, None, &table());
        assert!(!assessment.is_flagged());
        assert_eq!(assessment.score, 0);
    }

    #[test]
    fn disabled_dampener_keeps_full_score() {
        let scorer = RiskScorer::with_dampener(ContextDampener::disabled());
        let matches = vec![hit(Category::Drugs, 90)];
        let assessment = scorer.score("what is heroin", &matches, None, &table());
        assert_eq!(assessment.score, 90);
    }

    // === Determinism ===

    #[test]
    fn identical_inputs_yield_identical_assessments() {
        let matches = vec![hit(Category::Violence, 70), hit(Category::Gambling, 50)];
        let verdicts = vec![CategoryConfidence::new(Category::Hate, 0.9)];
        let scorer = RiskScorer::new();
        let a = scorer.score("some text", &matches, Some(&verdicts), &table());
        let b = scorer.score("some text", &matches, Some(&verdicts), &table());
        assert_eq!(a, b);
    }

    #[test]
    fn top_category_breaks_ties_deterministically() {
        let matches = vec![hit(Category::Gambling, 70), hit(Category::Violence, 70)];
        let scorer = RiskScorer::new();
        let a = scorer.score("text", &matches, None, &table());
        // Violence precedes Gambling in category order.
        assert_eq!(a.top_category(), Some((Category::Violence, 70)));
    }
}
