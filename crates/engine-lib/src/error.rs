//! Error taxonomy for the quotation engine
//!
//! Ports report [`PortError`]; resolvers translate those into
//! [`EngineError`], which the batch orchestrator turns into ledger
//! entries.

use crate::recommend::StrategyAttempt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the resolvers
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Requirement fields failed validation at the boundary
    #[error("Invalid requirement: {0}")]
    InvalidRequirement(String),

    /// Every configured recommendation strategy failed
    #[error(
        "No instance type could be recommended for {cpu_cores}C {memory_gb}G after {} strategies",
        attempts.len()
    )]
    RecommendationExhausted {
        cpu_cores: u32,
        memory_gb: f64,
        attempts: Vec<StrategyAttempt>,
    },

    /// The pricing service answered but has no tariff for this SKU
    #[error("No price for {sku} in {region} ({term})")]
    PricingNotFound {
        sku: String,
        region: String,
        term: String,
    },

    /// Network, timeout or request validation failure
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// Engine was wired with an unusable configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch item aborted unexpectedly
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable classification used by ledgers and metrics
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidRequirement(_) => ErrorKind::InvalidRequirement,
            EngineError::RecommendationExhausted { .. } => ErrorKind::RecommendationExhausted,
            EngineError::PricingNotFound { .. } => ErrorKind::PricingNotFound,
            EngineError::Transport { .. } => ErrorKind::Transport,
            EngineError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn transport(operation: &str, err: &PortError) -> Self {
        EngineError::Transport {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

/// Closed classification of [`EngineError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequirement,
    RecommendationExhausted,
    PricingNotFound,
    Transport,
    InvalidConfig,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequirement => "invalid_requirement",
            ErrorKind::RecommendationExhausted => "recommendation_exhausted",
            ErrorKind::PricingNotFound => "pricing_not_found",
            ErrorKind::Transport => "transport",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors reported by the external service ports
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    /// Service reachable, nothing to return for the query
    #[error("empty result")]
    EmptyResult,

    /// Service reachable, the requested item does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Service rejected the request (bad parameters)
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Call exceeded the caller-supplied deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl PortError {
    /// Whether the service answered with a semantic miss rather than failing
    pub fn is_semantic_miss(&self) -> bool {
        matches!(self, PortError::EmptyResult | PortError::NotFound(_))
    }
}
