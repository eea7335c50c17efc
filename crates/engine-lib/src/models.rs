//! Core data models for the quotation engine

use crate::error::{EngineError, ErrorKind, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Coarse workload category used to partition the instance catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum WorkloadClass {
    General,
    Compute,
    MemoryIntensive,
}

impl WorkloadClass {
    pub const ALL: [WorkloadClass; 3] = [
        WorkloadClass::General,
        WorkloadClass::Compute,
        WorkloadClass::MemoryIntensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadClass::General => "general",
            WorkloadClass::Compute => "compute",
            WorkloadClass::MemoryIntensive => "memory_intensive",
        }
    }

    /// Lenient conversion used at the deserialization boundary.
    /// Unknown labels become `General`.
    pub fn coerce(label: &str) -> Self {
        match label.parse() {
            Ok(class) => class,
            Err(_) => {
                warn!(label = %label, "Unknown workload class, using general");
                WorkloadClass::General
            }
        }
    }
}

impl FromStr for WorkloadClass {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "general_purpose" => Ok(WorkloadClass::General),
            "compute" | "compute_intensive" | "compute-intensive" => Ok(WorkloadClass::Compute),
            "memory_intensive" | "memory-intensive" | "memory" => {
                Ok(WorkloadClass::MemoryIntensive)
            }
            other => Err(EngineError::InvalidRequirement(format!(
                "unknown workload class '{}'",
                other
            ))),
        }
    }
}

impl From<String> for WorkloadClass {
    fn from(label: String) -> Self {
        WorkloadClass::coerce(&label)
    }
}

impl fmt::Display for WorkloadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized resource requirement produced by the upstream parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RequirementFields")]
pub struct ResourceRequirement {
    pub cpu_cores: u32,
    pub memory_gb: f64,
    pub storage_gb: f64,
    pub workload_class: WorkloadClass,
    pub environment: String,
}

impl ResourceRequirement {
    pub fn new(
        cpu_cores: u32,
        memory_gb: f64,
        storage_gb: f64,
        workload_class: WorkloadClass,
        environment: impl Into<String>,
    ) -> Result<Self> {
        if cpu_cores == 0 {
            return Err(EngineError::InvalidRequirement(
                "cpu_cores must be positive".to_string(),
            ));
        }
        if !memory_gb.is_finite() || memory_gb <= 0.0 {
            return Err(EngineError::InvalidRequirement(format!(
                "memory_gb must be positive, got {}",
                memory_gb
            )));
        }
        if !storage_gb.is_finite() || storage_gb < 0.0 {
            return Err(EngineError::InvalidRequirement(format!(
                "storage_gb must not be negative, got {}",
                storage_gb
            )));
        }

        Ok(Self {
            cpu_cores,
            memory_gb,
            storage_gb,
            workload_class,
            environment: environment.into(),
        })
    }

    /// Shorthand for a general-purpose requirement without storage
    pub fn general(cpu_cores: u32, memory_gb: f64) -> Result<Self> {
        Self::new(cpu_cores, memory_gb, 0.0, WorkloadClass::General, "prod")
    }
}

#[derive(Deserialize)]
struct RequirementFields {
    cpu_cores: u32,
    memory_gb: f64,
    #[serde(default)]
    storage_gb: f64,
    #[serde(default = "default_workload_class")]
    workload_class: WorkloadClass,
    #[serde(default)]
    environment: String,
}

fn default_workload_class() -> WorkloadClass {
    WorkloadClass::General
}

impl TryFrom<RequirementFields> for ResourceRequirement {
    type Error = EngineError;

    fn try_from(fields: RequirementFields) -> Result<Self> {
        ResourceRequirement::new(
            fields.cpu_cores,
            fields.memory_gb,
            fields.storage_gb,
            fields.workload_class,
            fields.environment,
        )
    }
}

/// Subscription term used for recommendation and pricing queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingTerm {
    #[default]
    Monthly,
    Annual,
}

impl BillingTerm {
    /// Charge type token sent to the remote services
    pub fn charge_type(&self) -> &'static str {
        "PrePaid"
    }

    /// Price unit token sent to the pricing service
    pub fn price_unit(&self) -> &'static str {
        match self {
            BillingTerm::Monthly => "Month",
            BillingTerm::Annual => "Year",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            BillingTerm::Monthly => 1,
            BillingTerm::Annual => 12,
        }
    }

    /// Normalize a per-period amount to a per-month amount (2 dp)
    pub fn monthly_amount(&self, period_amount: Decimal) -> Decimal {
        to_cents(period_amount / Decimal::from(self.months()))
    }

    /// Cost of twelve months at this term, computed from the unrounded period amount
    pub fn annual_amount(&self, period_amount: Decimal) -> Decimal {
        to_cents(period_amount * Decimal::from(12 / self.months()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingTerm::Monthly => "monthly",
            BillingTerm::Annual => "annual",
        }
    }
}

fn to_cents(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);
    amount
}

impl FromStr for BillingTerm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(BillingTerm::Monthly),
            "annual" | "yearly" | "year" => Ok(BillingTerm::Annual),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown billing term '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BillingTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record handed over by the upstream parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub source_ref: String,
    pub requirement: ResourceRequirement,
    #[serde(default = "default_product_label")]
    pub product_label: String,
}

fn default_product_label() -> String {
    "ECS".to_string()
}

impl QuoteRecord {
    pub fn new(source_ref: impl Into<String>, requirement: ResourceRequirement) -> Self {
        Self {
            source_ref: source_ref.into(),
            requirement,
            product_label: default_product_label(),
        }
    }

    pub fn with_product(mut self, label: impl Into<String>) -> Self {
        self.product_label = label.into();
        self
    }
}

/// Outcome of a single ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Success,
    Skipped,
    Failed,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Success => "success",
            QuoteStatus::Skipped => "skipped",
            QuoteStatus::Failed => "failed",
        }
    }
}

/// Quotation outcome for one input record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationResult {
    pub source_ref: String,
    pub requirement: ResourceRequirement,
    pub product_label: String,
    pub sku: Option<String>,
    pub instance_family_label: Option<String>,
    pub monthly_price: Option<Decimal>,
    /// Twelve-month cost from the quoted period price, free of per-month rounding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_price: Option<Decimal>,
    pub status: QuoteStatus,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl QuotationResult {
    pub fn success(
        record: &QuoteRecord,
        sku: String,
        family_label: String,
        monthly_price: Decimal,
        annual_price: Decimal,
    ) -> Self {
        Self {
            source_ref: record.source_ref.clone(),
            requirement: record.requirement.clone(),
            product_label: record.product_label.clone(),
            sku: Some(sku),
            instance_family_label: Some(family_label),
            monthly_price: Some(monthly_price),
            annual_price: Some(annual_price),
            status: QuoteStatus::Success,
            error: None,
            error_kind: None,
        }
    }

    pub fn skipped(record: &QuoteRecord, reason: String) -> Self {
        Self {
            source_ref: record.source_ref.clone(),
            requirement: record.requirement.clone(),
            product_label: record.product_label.clone(),
            sku: None,
            instance_family_label: None,
            monthly_price: None,
            annual_price: None,
            status: QuoteStatus::Skipped,
            error: Some(reason),
            error_kind: None,
        }
    }

    /// Failed entry; `sku` is kept when resolution succeeded but pricing did not
    pub fn failed(record: &QuoteRecord, sku: Option<(String, String)>, error: &EngineError) -> Self {
        let (sku, instance_family_label) = match sku {
            Some((sku, label)) => (Some(sku), Some(label)),
            None => (None, None),
        };
        Self {
            source_ref: record.source_ref.clone(),
            requirement: record.requirement.clone(),
            product_label: record.product_label.clone(),
            sku,
            instance_family_label,
            monthly_price: None,
            annual_price: None,
            status: QuoteStatus::Failed,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

/// Append-only collection of results for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    entries: Vec<QuotationResult>,
}

impl Ledger {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn append(&mut self, result: QuotationResult) {
        self.entries.push(result);
    }

    pub(crate) fn close(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn entries(&self) -> &[QuotationResult] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuotationResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<QuotationResult> {
        self.entries
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total: self.entries.len(),
            ..LedgerSummary::default()
        };

        for entry in &self.entries {
            match entry.status {
                QuoteStatus::Success => {
                    summary.succeeded += 1;
                    if let Some(price) = entry.monthly_price {
                        summary.total_monthly += price;
                    }
                    summary.annual_estimate += entry
                        .annual_price
                        .or_else(|| entry.monthly_price.map(|p| p * Decimal::from(12)))
                        .unwrap_or_default();
                }
                QuoteStatus::Skipped => summary.skipped += 1,
                QuoteStatus::Failed => summary.failed += 1,
            }
        }

        if summary.succeeded > 0 {
            summary.average_monthly = Some(
                (summary.total_monthly / Decimal::from(summary.succeeded as u64))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            );
        }

        summary
    }
}

/// Aggregate counts and cost totals of a ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_monthly: Decimal,
    pub annual_estimate: Decimal,
    pub average_monthly: Option<Decimal>,
}
