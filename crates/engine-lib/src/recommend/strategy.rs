//! Recommendation strategies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance families of the eighth generation used as the second tier
pub const GEN8_FAMILIES: [&str; 3] = ["ecs.g8y", "ecs.c8y", "ecs.r8y"];

/// Ranking rule the remote service applies to its candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityRule {
    NewProductFirst,
    InventoryFirst,
    PriceFirst,
}

impl PriorityRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityRule::NewProductFirst => "NewProductFirst",
            PriorityRule::InventoryFirst => "InventoryFirst",
            PriorityRule::PriceFirst => "PriceFirst",
        }
    }
}

impl fmt::Display for PriorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named recommendation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationStrategy {
    pub name: String,
    pub priority: PriorityRule,
    #[serde(default)]
    pub family_restriction: Option<Vec<String>>,
}

impl RecommendationStrategy {
    pub fn new(name: impl Into<String>, priority: PriorityRule) -> Self {
        Self {
            name: name.into(),
            priority,
            family_restriction: None,
        }
    }

    pub fn restricted_to<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.family_restriction = Some(families.into_iter().map(Into::into).collect());
        self
    }
}

/// Newest products first, then the eighth generation by inventory, then by price
pub fn default_strategies() -> Vec<RecommendationStrategy> {
    vec![
        RecommendationStrategy::new("newest-unrestricted", PriorityRule::NewProductFirst),
        RecommendationStrategy::new("gen8-inventory", PriorityRule::InventoryFirst)
            .restricted_to(GEN8_FAMILIES),
        RecommendationStrategy::new("gen8-price", PriorityRule::PriceFirst)
            .restricted_to(GEN8_FAMILIES),
    ]
}
