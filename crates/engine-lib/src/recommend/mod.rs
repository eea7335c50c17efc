//! Instance type recommendation
//!
//! This module provides:
//! - The port the remote recommendation service is reached through
//! - Named strategies tried in a fixed priority order
//! - The degrading resolver that walks those strategies
//! - The [`SkuSource`] seam shared with the catalog matcher

mod resolver;
mod strategy;

pub use resolver::{
    AttemptOutcome, RemoteResolver, Resolution, StrategyAttempt, DEFAULT_CALL_TIMEOUT,
};
pub use strategy::{default_strategies, PriorityRule, RecommendationStrategy, GEN8_FAMILIES};

use crate::catalog::MatchTier;
use crate::error::{PortError, Result};
use crate::models::{BillingTerm, ResourceRequirement};
use async_trait::async_trait;
use serde::Serialize;

/// Parameters of one recommendation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendQuery {
    pub cpu_cores: u32,
    pub memory_gb: f64,
    pub billing_term: BillingTerm,
    pub strategy_name: String,
    pub priority: PriorityRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_restriction: Option<Vec<String>>,
}

/// Trait for remote recommendation service clients
#[async_trait]
pub trait RecommendationPort: Send + Sync {
    /// Return the top-ranked instance type for the query
    async fn recommend(&self, query: &RecommendQuery) -> std::result::Result<String, PortError>;
}

/// Where a resolved SKU came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum SkuOrigin {
    Remote { strategy: String },
    Catalog { tier: MatchTier },
}

/// A resolved SKU and its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct SkuChoice {
    pub sku: String,
    pub origin: SkuOrigin,
}

/// Anything that can turn a requirement into a SKU
#[async_trait]
pub trait SkuSource: Send + Sync {
    /// Resolve a SKU for `req` under the batch's billing term
    async fn resolve(&self, req: &ResourceRequirement, term: BillingTerm) -> Result<SkuChoice>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
