//! Category policies and the routing of risk assessments to actions.
//!
//! Policy is a data table, not scattered conditionals: adding a category,
//! changing a threshold, or pointing a category at a different crisis
//! resource is a configuration change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::scorer::RiskAssessment;
use crate::classifier::Category;

/// Action to take for assessed content, least to most restrictive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Pass through unchanged.
    #[default]
    Allow,
    /// Retain with an advisory annotation.
    Warn,
    /// Retain with an advisory annotation and a crisis-resource reference.
    AttachResource,
    /// Remove entirely.
    Block,
}

impl PolicyAction {
    /// Returns a human-readable name for this action.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyAction::Allow => "Allow",
            PolicyAction::Warn => "Warn",
            PolicyAction::AttachResource => "AttachResource",
            PolicyAction::Block => "Block",
        }
    }
}

/// Per-category policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    /// Scores at or above this value are blocked.
    pub block_threshold: u8,
    /// Configured severity of the category, used to pick which category's
    /// resource is surfaced when several trigger at once. Distinct from any
    /// per-rule severity.
    pub severity: u8,
    /// Weight (0-100) applied to external-classifier confidence for this
    /// category.
    pub weight: u8,
    /// Crisis-resource reference attached to decisions in this category.
    /// Only an identifier; wording and directory live with the presentation
    /// layer.
    pub hotline: Option<String>,
    /// Whether research-style phrasing may dampen this category's score.
    pub reducible: bool,
}

impl CategoryPolicy {
    /// Creates a policy with the given threshold and configured severity.
    pub fn new(block_threshold: u8, severity: u8) -> Self {
        Self {
            block_threshold: block_threshold.min(100),
            severity: severity.min(100),
            weight: 100,
            hotline: None,
            reducible: false,
        }
    }

    /// Attaches a crisis-resource reference.
    pub fn with_hotline(mut self, hotline: impl Into<String>) -> Self {
        self.hotline = Some(hotline.into());
        self
    }

    /// Sets the classifier weight.
    pub fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight.min(100);
        self
    }

    /// Allows educational-context dampening for this category.
    pub fn reducible(mut self) -> Self {
        self.reducible = true;
        self
    }

    /// Fallback for categories missing from the table: warn on any presence,
    /// block only at the ceiling. Uncertainty never degrades to silent allow.
    pub fn conservative() -> Self {
        Self::new(100, 50)
    }
}

/// Decision for one piece of content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The action to take.
    pub action: PolicyAction,
    /// The category that determined the resource reference, when any
    /// category triggered.
    pub category: Option<Category>,
    /// Crisis-resource reference for the presentation layer.
    pub resource_ref: Option<String>,
}

impl PolicyDecision {
    /// A pass-through decision.
    pub fn allow() -> Self {
        Self::default()
    }

    /// True when the content must be removed.
    pub fn is_block(&self) -> bool {
        self.action == PolicyAction::Block
    }

    /// True when the content is retained but annotated.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self.action,
            PolicyAction::Warn | PolicyAction::AttachResource
        )
    }
}

/// Mapping of categories to policies, evaluated most-severe-wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyTable {
    policies: BTreeMap<Category, CategoryPolicy>,
}

impl PolicyTable {
    /// Creates an empty table. Every category falls back to
    /// [`CategoryPolicy::conservative`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Default policy for a kid-safe deployment.
    pub fn kid_safe_defaults() -> Self {
        let mut table = Self::new();
        table.set(Category::Violence, CategoryPolicy::new(80, 90).reducible());
        table.set(
            Category::SelfHarm,
            CategoryPolicy::new(70, 95).with_hotline("988-lifeline"),
        );
        table.set(Category::Adult, CategoryPolicy::new(80, 90));
        table.set(
            Category::Exploitation,
            CategoryPolicy::new(60, 100).with_hotline("childhelp"),
        );
        table.set(
            Category::Drugs,
            CategoryPolicy::new(80, 90)
                .with_hotline("samhsa-helpline")
                .reducible(),
        );
        table.set(Category::Weapons, CategoryPolicy::new(80, 90).reducible());
        table.set(Category::Gambling, CategoryPolicy::new(80, 85).reducible());
        table.set(Category::Hate, CategoryPolicy::new(80, 90).reducible());
        table.set(Category::Illegal, CategoryPolicy::new(80, 90));
        table.set(Category::Circumvention, CategoryPolicy::new(75, 80));
        table.set(Category::Piracy, CategoryPolicy::new(80, 60).reducible());
        table
    }

    /// A lighter table that raises block thresholds for most categories.
    /// Self-harm and exploitation keep their kid-safe settings.
    pub fn permissive_defaults() -> Self {
        let mut table = Self::kid_safe_defaults();
        for category in Category::all() {
            if matches!(category, Category::SelfHarm | Category::Exploitation) {
                continue;
            }
            if let Some(policy) = table.policies.get_mut(category) {
                policy.block_threshold = policy.block_threshold.saturating_add(10).min(100);
            }
        }
        table
    }

    /// Sets the policy for a category.
    pub fn set(&mut self, category: Category, policy: CategoryPolicy) {
        self.policies.insert(category, policy);
    }

    /// Returns the policy for a category, or `None` when unset.
    pub fn get(&self, category: Category) -> Option<&CategoryPolicy> {
        self.policies.get(&category)
    }

    /// Returns the effective policy for a category, falling back to the
    /// conservative default.
    pub fn policy(&self, category: Category) -> CategoryPolicy {
        self.policies
            .get(&category)
            .cloned()
            .unwrap_or_else(CategoryPolicy::conservative)
    }

    /// Routes a risk assessment to a decision.
    ///
    /// Per triggered category: score at or above the block threshold blocks;
    /// below it warns, upgraded to a resource attachment when the category
    /// has a hotline. The most restrictive action wins overall, and the
    /// category with the highest *configured* severity (not score) supplies
    /// the resource reference, so a crisis-resource category outranks a
    /// merely warn-level one.
    pub fn decide(&self, assessment: &RiskAssessment) -> PolicyDecision {
        let mut action = PolicyAction::Allow;
        let mut decisive: Option<(Category, u8)> = None;

        for (&category, &score) in &assessment.categories {
            let policy = self.policy(category);
            let category_action = if score >= policy.block_threshold {
                PolicyAction::Block
            } else if policy.hotline.is_some() {
                PolicyAction::AttachResource
            } else {
                PolicyAction::Warn
            };
            action = action.max(category_action);
            if decisive.map_or(true, |(_, severity)| policy.severity > severity) {
                decisive = Some((category, policy.severity));
            }
        }

        match decisive {
            Some((category, _)) => PolicyDecision {
                action,
                category: Some(category),
                resource_ref: self.policy(category).hotline,
            },
            None => PolicyDecision::allow(),
        }
    }
}
