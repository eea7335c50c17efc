//! Engine library for compute SKU quotation
//!
//! This crate provides the core functionality for:
//! - Catalog matching of resource requirements to instance shapes
//! - Degrading multi-strategy recommendation through a remote service
//! - Generation-aware pricing with explicit not-found handling
//! - Batch orchestration into an ordered quotation ledger
//! - Metrics and structured logging

pub mod batch;
pub mod catalog;
pub mod error;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod recommend;
pub mod sku;

pub use batch::{BatchOrchestrator, BatchSettings, ProductClassifier, ProductFilter, ProductKind};
pub use catalog::{CatalogMatch, CatalogMatcher, InstanceCatalog, MatchTier};
pub use error::{EngineError, ErrorKind, PortError, Result};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use pricing::{PriceQuery, PriceQuote, PricingPort, PricingResolver};
pub use recommend::{
    RecommendQuery, RecommendationPort, RecommendationStrategy, RemoteResolver, SkuChoice,
    SkuOrigin, SkuSource,
};
