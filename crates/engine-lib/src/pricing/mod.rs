//! Region and term qualified pricing
//!
//! Pricing a compute SKU needs disk parameters, and the disk category the
//! pricing service accepts depends on the instance generation. The
//! generation is read from the SKU code, mapped to a category through
//! [`DiskCategoryTable`], and only then is the priced query issued.

mod disk;
mod resolver;

pub use disk::{DiskCategory, DiskCategoryTable, DiskSizes, GenerationBand, DEFAULT_SYSTEM_DISK_GB};
pub use resolver::{PriceQuote, PricingResolver, DEFAULT_PRICING_TIMEOUT};

use crate::error::PortError;
use crate::models::BillingTerm;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

/// Parameters of one price lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuery {
    pub sku: String,
    pub region: String,
    pub billing_term: BillingTerm,
    pub cpu_cores: u32,
    pub memory_gb: f64,
    pub disk_category: DiskCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_level: Option<String>,
    pub disk_sizes: DiskSizes,
}

/// Trait for remote pricing service clients
#[async_trait]
pub trait PricingPort: Send + Sync {
    /// Price of one billing period (a month or a year) for the query
    async fn get_price(&self, query: &PriceQuery) -> Result<Decimal, PortError>;
}
