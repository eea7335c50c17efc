//! Product classification
//!
//! Input records may describe products other than compute instances
//! (managed databases, object storage, CDN). Those are recorded as
//! skipped before any external call is made.

use serde::{Deserialize, Serialize};

/// Version of the built-in deny list
pub const DEFAULT_FILTER_VERSION: &str = "2025-12";

const DEFAULT_TARGET_LABELS: &[&str] = &["ecs"];

const DEFAULT_DENY_KEYWORDS: &[&str] = &[
    "polardb",
    "polar.",
    "rds",
    "redis",
    "mongodb",
    "database",
    "waf",
    "security center",
    "oss",
    "slb",
    "cdn",
    "nas",
];

/// Versioned product deny list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub version: String,
    /// Labels always treated as compute, checked before the deny list
    #[serde(default)]
    pub target_labels: Vec<String>,
    pub deny_keywords: Vec<String>,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            version: DEFAULT_FILTER_VERSION.to_string(),
            target_labels: DEFAULT_TARGET_LABELS.iter().map(|s| s.to_string()).collect(),
            deny_keywords: DEFAULT_DENY_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Classification of a record's product label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductKind {
    Target,
    NonTarget { keyword: String },
}

/// Case-insensitive product classifier
#[derive(Debug, Clone)]
pub struct ProductClassifier {
    version: String,
    target_labels: Vec<String>,
    deny_keywords: Vec<String>,
}

impl ProductClassifier {
    pub fn new(filter: ProductFilter) -> Self {
        let normalize = |values: Vec<String>| -> Vec<String> {
            values
                .into_iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        };
        Self {
            version: filter.version,
            target_labels: normalize(filter.target_labels),
            deny_keywords: normalize(filter.deny_keywords),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classify(&self, label: &str) -> ProductKind {
        let label = label.trim().to_lowercase();
        if label.is_empty() || self.target_labels.iter().any(|t| *t == label) {
            return ProductKind::Target;
        }

        match self
            .deny_keywords
            .iter()
            .find(|k| contains_keyword(&label, k))
        {
            Some(keyword) => ProductKind::NonTarget {
                keyword: keyword.clone(),
            },
            None => ProductKind::Target,
        }
    }
}

/// Whether `keyword` occurs in `label` on word boundaries.
///
/// A keyword edge that is itself punctuation (`polar.`) needs no boundary
/// on that side, so prefix keywords still match longer codes.
fn contains_keyword(label: &str, keyword: &str) -> bool {
    let needs_start = keyword.starts_with(|c: char| c.is_alphanumeric());
    let needs_end = keyword.ends_with(|c: char| c.is_alphanumeric());

    label.match_indices(keyword).any(|(start, _)| {
        let before = label[..start].chars().next_back();
        let after = label[start + keyword.len()..].chars().next();
        let open = !needs_start || before.map_or(true, |c| !c.is_alphanumeric());
        let close = !needs_end || after.map_or(true, |c| !c.is_alphanumeric());
        open && close
    })
}

impl Default for ProductClassifier {
    fn default() -> Self {
        Self::new(ProductFilter::default())
    }
}
