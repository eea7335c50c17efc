//! Batch orchestrator

use super::{ProductClassifier, ProductKind};
use crate::catalog::MatchTier;
use crate::error::{EngineError, Result};
use crate::models::{BillingTerm, Ledger, QuotationResult, QuoteRecord};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::pricing::PricingResolver;
use crate::recommend::{SkuOrigin, SkuSource};
use crate::sku::instance_family_label;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Per-run settings shared by every item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub region: String,
    pub billing_term: BillingTerm,
    /// Maximum items in flight; 1 processes strictly in order
    pub concurrency: usize,
}

impl BatchSettings {
    pub fn new(region: impl Into<String>, billing_term: BillingTerm) -> Self {
        Self {
            region: region.into(),
            billing_term,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(EngineError::InvalidConfig("region must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// State shared with every item task
struct Shared {
    source: Arc<dyn SkuSource>,
    pricing: Arc<PricingResolver>,
    classifier: ProductClassifier,
    settings: BatchSettings,
    logger: StructuredLogger,
}

/// Drives records through classification, SKU resolution and pricing
pub struct BatchOrchestrator {
    shared: Arc<Shared>,
    metrics: EngineMetrics,
}

impl BatchOrchestrator {
    pub fn new(
        source: Arc<dyn SkuSource>,
        pricing: Arc<PricingResolver>,
        classifier: ProductClassifier,
        settings: BatchSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                source,
                pricing,
                classifier,
                settings,
                logger: StructuredLogger::new("batch"),
            }),
            metrics: EngineMetrics::new(),
        })
    }

    /// Tag every event of this orchestrator with `label`
    pub fn with_run_label(mut self, label: impl Into<String>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.logger = StructuredLogger::new(label);
        }
        self
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.shared.settings
    }

    /// Quote every record, producing exactly one ledger entry per record in input order
    pub async fn run(&self, records: Vec<QuoteRecord>) -> Ledger {
        let settings = &self.shared.settings;
        self.shared.logger.log_batch_started(
            records.len(),
            &settings.region,
            settings.billing_term.as_str(),
            settings.concurrency,
        );

        let mut ledger = Ledger::with_capacity(records.len());
        let results = if settings.concurrency <= 1 {
            self.run_sequential(records).await
        } else {
            self.run_concurrent(records).await
        };

        for (index, result) in results.into_iter().enumerate() {
            self.metrics.record_quote(result.status);
            self.shared.logger.log_quote_recorded(index, &result);
            ledger.append(result);
        }
        ledger.close();

        self.shared.logger.log_batch_finished(&ledger.summary());
        ledger
    }

    async fn run_sequential(&self, records: Vec<QuoteRecord>) -> Vec<QuotationResult> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let shared = Arc::clone(&self.shared);
            let fallback = record.clone();
            let handle = tokio::spawn(async move { quote_record(&shared, &record).await });
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(error = %e, source_ref = %fallback.source_ref, "Quotation task aborted");
                    results.push(panicked(&fallback));
                }
            }
        }
        results
    }

    async fn run_concurrent(&self, records: Vec<QuoteRecord>) -> Vec<QuotationResult> {
        let semaphore = Arc::new(Semaphore::new(self.shared.settings.concurrency));
        let mut tasks = JoinSet::new();

        for (index, record) in records.iter().cloned().enumerate() {
            let shared = Arc::clone(&self.shared);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, quote_record(&shared, &record).await)
            });
        }

        let mut slots: Vec<Option<QuotationResult>> = vec![None; records.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "Quotation task aborted"),
            }
        }

        // Slots left empty belong to tasks that panicked
        slots
            .into_iter()
            .zip(records.iter())
            .map(|(slot, record)| slot.unwrap_or_else(|| panicked(record)))
            .collect()
    }
}

fn panicked(record: &QuoteRecord) -> QuotationResult {
    QuotationResult::failed(
        record,
        None,
        &EngineError::Internal("quotation task panicked".to_string()),
    )
}

async fn quote_record(shared: &Shared, record: &QuoteRecord) -> QuotationResult {
    if let ProductKind::NonTarget { keyword } = shared.classifier.classify(&record.product_label) {
        debug!(
            source_ref = %record.source_ref,
            product = %record.product_label,
            keyword = %keyword,
            "Skipping non-target product"
        );
        return QuotationResult::skipped(
            record,
            format!("skipped non-target product ({})", keyword),
        );
    }

    let term = shared.settings.billing_term;
    let choice = match shared.source.resolve(&record.requirement, term).await {
        Ok(choice) => choice,
        Err(e) => return QuotationResult::failed(record, None, &e),
    };

    let detail = match &choice.origin {
        SkuOrigin::Remote { strategy } => strategy.clone(),
        SkuOrigin::Catalog { tier } => match tier {
            MatchTier::Exact => "exact".to_string(),
            MatchTier::Nearest { distance } => format!("nearest (distance {})", distance),
            MatchTier::ClassDefault => "class_default".to_string(),
        },
    };
    shared
        .logger
        .log_sku_resolved(&record.source_ref, shared.source.name(), &choice.sku, &detail);

    let family_label = instance_family_label(&choice.sku);
    let settings = &shared.settings;
    match shared
        .pricing
        .price_for(
            &choice.sku,
            &record.requirement,
            &settings.region,
            settings.billing_term,
        )
        .await
    {
        Ok(quote) => QuotationResult::success(
            record,
            choice.sku,
            family_label,
            quote.monthly_amount,
            quote.annual_amount,
        ),
        Err(e) => QuotationResult::failed(record, Some((choice.sku, family_label)), &e),
    }
}
