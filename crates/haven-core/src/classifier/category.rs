//! Safety categories for content classification.

use serde::{Deserialize, Serialize};

/// Sensitive-content classes that queries and results can be classified into.
///
/// Each category carries its own block threshold and optional crisis-resource
/// association in the [`PolicyTable`](crate::policy::PolicyTable).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Content promoting or describing violence.
    Violence,
    /// Content related to self-harm or suicide.
    SelfHarm,
    /// Adult or sexually explicit content.
    Adult,
    /// Abuse or exploitation of minors or vulnerable people.
    Exploitation,
    /// Drugs and controlled substances.
    Drugs,
    /// Firearms, explosives, and other weapons.
    Weapons,
    /// Gambling and betting services.
    Gambling,
    /// Hate speech or discrimination.
    Hate,
    /// Content promoting illegal activities.
    Illegal,
    /// Proxy, VPN, and filter-circumvention tooling.
    Circumvention,
    /// Piracy and copyright infringement.
    Piracy,
}

impl Category {
    /// Returns all available categories.
    pub fn all() -> &'static [Category] {
        &[
            Category::Violence,
            Category::SelfHarm,
            Category::Adult,
            Category::Exploitation,
            Category::Drugs,
            Category::Weapons,
            Category::Gambling,
            Category::Hate,
            Category::Illegal,
            Category::Circumvention,
            Category::Piracy,
        ]
    }

    /// Returns a human-readable name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Violence => "Violence",
            Category::SelfHarm => "Self-Harm",
            Category::Adult => "Adult",
            Category::Exploitation => "Exploitation",
            Category::Drugs => "Drugs",
            Category::Weapons => "Weapons",
            Category::Gambling => "Gambling",
            Category::Hate => "Hate",
            Category::Illegal => "Illegal",
            Category::Circumvention => "Circumvention",
            Category::Piracy => "Piracy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_all_returns_all_variants() {
        let all = Category::all();
        assert_eq!(all.len(), 11);
    }

    #[test]
    fn category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Category::SelfHarm).unwrap(),
            "\"self_harm\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Circumvention).unwrap(),
            "\"circumvention\""
        );
    }

    #[test]
    fn category_roundtrips() {
        for cat in Category::all() {
            let json = serde_json::to_string(cat).unwrap();
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(*cat, back);
        }
    }

    #[test]
    fn unknown_category_rejected() {
        let result: Result<Category, _> = serde_json::from_str("\"astrology\"");
        assert!(result.is_err());
    }
}
