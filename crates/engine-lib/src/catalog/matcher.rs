//! Deterministic catalog matching
//!
//! Three tiers: exact key lookup, nearest shape within the requested
//! workload class, then the catalog's default SKU.

use super::{CatalogEntry, InstanceCatalog};
use crate::error::Result;
use crate::models::{BillingTerm, ResourceRequirement};
use crate::recommend::{SkuChoice, SkuOrigin, SkuSource};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Which tier produced a catalog match
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "tier")]
pub enum MatchTier {
    Exact,
    Nearest { distance: f64 },
    ClassDefault,
}

/// Result of a catalog match
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    pub sku: String,
    pub tier: MatchTier,
}

/// Network-free matcher over an [`InstanceCatalog`]
#[derive(Debug, Clone)]
pub struct CatalogMatcher {
    catalog: Arc<InstanceCatalog>,
}

impl CatalogMatcher {
    pub fn new(catalog: Arc<InstanceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &InstanceCatalog {
        &self.catalog
    }

    /// Match a requirement to a SKU. Never fails.
    pub fn match_sku(&self, req: &ResourceRequirement) -> CatalogMatch {
        if let Some(entry) = self.exact(req) {
            info!(
                workload_class = %req.workload_class,
                cpu_cores = req.cpu_cores,
                memory_gb = req.memory_gb,
                sku = %entry.sku,
                "Exact catalog match"
            );
            return CatalogMatch {
                sku: entry.sku.clone(),
                tier: MatchTier::Exact,
            };
        }

        if let Some((entry, distance)) = self.nearest(req) {
            info!(
                workload_class = %req.workload_class,
                cpu_cores = req.cpu_cores,
                memory_gb = req.memory_gb,
                sku = %entry.sku,
                matched_cpu = entry.cpu_cores,
                matched_memory_gb = entry.memory_gb,
                distance = distance,
                "Nearest catalog match"
            );
            return CatalogMatch {
                sku: entry.sku.clone(),
                tier: MatchTier::Nearest { distance },
            };
        }

        warn!(
            workload_class = %req.workload_class,
            default_sku = %self.catalog.default_sku(),
            "No catalog entries for workload class, using default"
        );
        CatalogMatch {
            sku: self.catalog.default_sku().to_string(),
            tier: MatchTier::ClassDefault,
        }
    }

    fn exact(&self, req: &ResourceRequirement) -> Option<&CatalogEntry> {
        if req.memory_gb.fract() != 0.0 || req.memory_gb > u32::MAX as f64 {
            return None;
        }
        self.catalog
            .lookup(req.workload_class, req.cpu_cores, req.memory_gb as u32)
    }

    /// Minimum Manhattan distance; ties go to the smaller (cpu, memory) shape
    fn nearest(&self, req: &ResourceRequirement) -> Option<(&CatalogEntry, f64)> {
        self.catalog
            .entries_for(req.workload_class)
            .map(|entry| (entry, manhattan_distance(entry, req)))
            .min_by(|(a, da), (b, db)| {
                da.total_cmp(db)
                    .then_with(|| a.cpu_cores.cmp(&b.cpu_cores))
                    .then_with(|| a.memory_gb.cmp(&b.memory_gb))
            })
    }
}

/// `|Δcpu| + |Δmemory|`, unweighted
pub(crate) fn manhattan_distance(entry: &CatalogEntry, req: &ResourceRequirement) -> f64 {
    (entry.cpu_cores as f64 - req.cpu_cores as f64).abs()
        + (entry.memory_gb as f64 - req.memory_gb).abs()
}

#[async_trait]
impl SkuSource for CatalogMatcher {
    async fn resolve(&self, req: &ResourceRequirement, _term: BillingTerm) -> Result<SkuChoice> {
        let matched = self.match_sku(req);
        Ok(SkuChoice {
            sku: matched.sku,
            origin: SkuOrigin::Catalog { tier: matched.tier },
        })
    }

    fn name(&self) -> &'static str {
        "catalog"
    }
}
