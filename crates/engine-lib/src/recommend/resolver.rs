//! Degrading remote resolver
//!
//! Walks the configured strategies in order against the recommendation
//! port. The first strategy that yields a SKU wins; when every strategy
//! fails the resolver reports `RecommendationExhausted`. There is no
//! catalog fallback here: a SKU the service would not recommend is never
//! invented locally.

use super::{
    RecommendQuery, RecommendationPort, RecommendationStrategy, SkuChoice, SkuOrigin, SkuSource,
};
use crate::error::{EngineError, PortError, Result};
use crate::models::{BillingTerm, ResourceRequirement};
use crate::observability::EngineMetrics;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Default deadline for a single recommendation call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened when one strategy was tried
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum AttemptOutcome {
    Recommended(String),
    Empty,
    Failed(String),
    TimedOut,
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Recommended(_) => "recommended",
            AttemptOutcome::Empty => "empty",
            AttemptOutcome::Failed(_) => "failed",
            AttemptOutcome::TimedOut => "timed_out",
        }
    }
}

/// Record of one strategy attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
}

/// Successful resolution with the attempts that led to it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub sku: String,
    pub strategy: String,
    pub attempts: Vec<StrategyAttempt>,
}

/// Resolver driving the remote recommendation service
pub struct RemoteResolver {
    port: Arc<dyn RecommendationPort>,
    strategies: Vec<RecommendationStrategy>,
    call_timeout: Duration,
    metrics: EngineMetrics,
}

impl RemoteResolver {
    /// Create a resolver; at least one strategy is required
    pub fn new(
        port: Arc<dyn RecommendationPort>,
        strategies: Vec<RecommendationStrategy>,
    ) -> Result<Self> {
        if strategies.is_empty() {
            return Err(EngineError::InvalidConfig(
                "remote resolver needs at least one strategy".to_string(),
            ));
        }

        Ok(Self {
            port,
            strategies,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            metrics: EngineMetrics::new(),
        })
    }

    /// Set the per-call deadline
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn strategies(&self) -> &[RecommendationStrategy] {
        &self.strategies
    }

    /// Try each strategy in order until one yields a SKU
    pub async fn resolve_with_attempts(
        &self,
        req: &ResourceRequirement,
        term: BillingTerm,
    ) -> Result<Resolution> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for (position, strategy) in self.strategies.iter().enumerate() {
            let outcome = self.attempt(strategy, req, term).await;

            self.metrics
                .record_recommendation_attempt(&strategy.name, outcome.label());

            match &outcome {
                AttemptOutcome::Recommended(sku) => {
                    info!(
                        step = position + 1,
                        strategy = %strategy.name,
                        priority = %strategy.priority,
                        sku = %sku,
                        "Strategy recommended instance type"
                    );
                }
                AttemptOutcome::Empty => {
                    warn!(
                        step = position + 1,
                        strategy = %strategy.name,
                        "Strategy returned no recommendation"
                    );
                }
                AttemptOutcome::Failed(message) => {
                    warn!(
                        step = position + 1,
                        strategy = %strategy.name,
                        error = %message,
                        "Strategy call failed"
                    );
                }
                AttemptOutcome::TimedOut => {
                    warn!(
                        step = position + 1,
                        strategy = %strategy.name,
                        timeout_ms = self.call_timeout.as_millis() as u64,
                        "Strategy call timed out"
                    );
                }
            }

            let recommended = match &outcome {
                AttemptOutcome::Recommended(sku) => Some(sku.clone()),
                _ => None,
            };

            attempts.push(StrategyAttempt {
                strategy: strategy.name.clone(),
                outcome,
            });

            if let Some(sku) = recommended {
                return Ok(Resolution {
                    sku,
                    strategy: strategy.name.clone(),
                    attempts,
                });
            }
        }

        error!(
            cpu_cores = req.cpu_cores,
            memory_gb = req.memory_gb,
            strategies = attempts.len(),
            "All recommendation strategies failed"
        );

        Err(EngineError::RecommendationExhausted {
            cpu_cores: req.cpu_cores,
            memory_gb: req.memory_gb,
            attempts,
        })
    }

    async fn attempt(
        &self,
        strategy: &RecommendationStrategy,
        req: &ResourceRequirement,
        term: BillingTerm,
    ) -> AttemptOutcome {
        let query = RecommendQuery {
            cpu_cores: req.cpu_cores,
            memory_gb: req.memory_gb,
            billing_term: term,
            strategy_name: strategy.name.clone(),
            priority: strategy.priority,
            family_restriction: strategy.family_restriction.clone(),
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.call_timeout, self.port.recommend(&query)).await;
        self.metrics
            .observe_external_call("recommend", start.elapsed().as_secs_f64());

        match result {
            Err(_) => AttemptOutcome::TimedOut,
            Ok(Err(PortError::Timeout(_))) => AttemptOutcome::TimedOut,
            Ok(Err(PortError::EmptyResult)) | Ok(Err(PortError::NotFound(_))) => {
                AttemptOutcome::Empty
            }
            Ok(Err(e)) => AttemptOutcome::Failed(e.to_string()),
            Ok(Ok(sku)) if sku.trim().is_empty() => AttemptOutcome::Empty,
            Ok(Ok(sku)) => AttemptOutcome::Recommended(sku.trim().to_string()),
        }
    }
}

#[async_trait]
impl SkuSource for RemoteResolver {
    async fn resolve(&self, req: &ResourceRequirement, term: BillingTerm) -> Result<SkuChoice> {
        let resolution = self.resolve_with_attempts(req, term).await?;
        Ok(SkuChoice {
            sku: resolution.sku,
            origin: SkuOrigin::Remote {
                strategy: resolution.strategy,
            },
        })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
