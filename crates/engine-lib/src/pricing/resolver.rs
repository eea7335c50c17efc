//! Pricing resolver

use super::{DiskCategory, DiskCategoryTable, DiskSizes, PriceQuery, PricingPort};
use crate::error::{EngineError, PortError, Result};
use crate::models::{BillingTerm, ResourceRequirement};
use crate::observability::EngineMetrics;
use crate::sku::{Generation, SkuCode};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default deadline for a single pricing call
pub const DEFAULT_PRICING_TIMEOUT: Duration = Duration::from_secs(30);

/// A resolved monthly price and the parameters it was quoted with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub monthly_amount: Decimal,
    pub annual_amount: Decimal,
    pub disk_category: DiskCategory,
    pub generation: Option<Generation>,
}

/// Resolver issuing generation-aware price queries
pub struct PricingResolver {
    port: Arc<dyn PricingPort>,
    disk_table: DiskCategoryTable,
    system_disk_gb: u32,
    call_timeout: Duration,
    metrics: EngineMetrics,
}

impl PricingResolver {
    pub fn new(port: Arc<dyn PricingPort>) -> Self {
        Self {
            port,
            disk_table: DiskCategoryTable::default(),
            system_disk_gb: super::DEFAULT_SYSTEM_DISK_GB,
            call_timeout: DEFAULT_PRICING_TIMEOUT,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn with_disk_table(mut self, table: DiskCategoryTable) -> Self {
        self.disk_table = table;
        self
    }

    pub fn with_system_disk_gb(mut self, size_gb: u32) -> Self {
        self.system_disk_gb = size_gb;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn disk_table(&self) -> &DiskCategoryTable {
        &self.disk_table
    }

    /// Price a SKU for a requirement, sizing the data disk from its storage
    pub async fn price_for(
        &self,
        sku: &str,
        req: &ResourceRequirement,
        region: &str,
        term: BillingTerm,
    ) -> Result<PriceQuote> {
        let disks = DiskSizes::for_storage(self.system_disk_gb, req.storage_gb);
        self.price(sku, region, term, disks, req.cpu_cores, req.memory_gb)
            .await
    }

    /// Monthly price of `sku` in `region` for `term`
    pub async fn price(
        &self,
        sku: &str,
        region: &str,
        term: BillingTerm,
        disks: DiskSizes,
        cpu_cores: u32,
        memory_gb: f64,
    ) -> Result<PriceQuote> {
        let generation = SkuCode::parse(sku).and_then(|code| code.generation());
        let disk_category = self.disk_table.category_for_generation(generation);

        debug!(
            sku = %sku,
            generation = ?generation.map(|g| g.0),
            disk_category = %disk_category,
            "Selected disk category"
        );

        let query = PriceQuery {
            sku: sku.to_string(),
            region: region.to_string(),
            billing_term: term,
            cpu_cores,
            memory_gb,
            disk_category,
            performance_level: disk_category.performance_level().map(str::to_string),
            disk_sizes: disks,
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.call_timeout, self.port.get_price(&query))
            .await
            .unwrap_or(Err(PortError::Timeout(self.call_timeout)));
        self.metrics
            .observe_external_call("price", start.elapsed().as_secs_f64());

        let period_amount = match result {
            Ok(amount) if amount.is_sign_negative() => {
                self.metrics.record_pricing("transport");
                warn!(sku = %sku, amount = %amount, "Pricing service returned a negative amount");
                return Err(EngineError::Transport {
                    operation: "price".to_string(),
                    message: format!("malformed reply: negative amount {}", amount),
                });
            }
            Ok(amount) => amount,
            Err(e) if e.is_semantic_miss() => {
                self.metrics.record_pricing("not_found");
                warn!(sku = %sku, region = %region, term = %term, "No tariff for SKU");
                return Err(EngineError::PricingNotFound {
                    sku: sku.to_string(),
                    region: region.to_string(),
                    term: term.to_string(),
                });
            }
            Err(e) => {
                self.metrics.record_pricing("transport");
                warn!(sku = %sku, error = %e, "Pricing call failed");
                return Err(EngineError::transport("price", &e));
            }
        };

        self.metrics.record_pricing("priced");
        let monthly_amount = term.monthly_amount(period_amount);

        info!(
            sku = %sku,
            region = %region,
            term = %term,
            disk_category = %disk_category,
            monthly_amount = %monthly_amount,
            "Priced instance type"
        );

        Ok(PriceQuote {
            monthly_amount,
            annual_amount: term.annual_amount(period_amount),
            disk_category,
            generation,
        })
    }
}
