//! Batch quotation command

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use engine_lib::{
    BatchOrchestrator, BatchSettings, BillingTerm, CatalogMatcher, EngineMetrics, Ledger,
    LedgerSummary, PricingResolver, ProductClassifier, QuoteRecord, RemoteResolver, SkuSource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::Tabled;
use tracing::info;

use crate::client::{HttpPricingPort, HttpRecommendationPort};
use crate::config::QuoterConfig;
use crate::output::{
    color_status, format_currency, format_optional_currency, print_error, print_info, print_json,
    print_success, print_table, print_warning, truncate, OutputFormat,
};

/// Flags of `skuq quote`; unset values fall back to the configuration
#[derive(Debug, Clone, Default)]
pub struct QuoteOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub region: Option<String>,
    pub term: Option<BillingTerm>,
    pub concurrency: Option<usize>,
    pub catalog_only: bool,
    pub metrics: bool,
}

/// Row for the ledger table
#[derive(Tabled)]
struct QuoteRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Ref")]
    source_ref: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Request")]
    request: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Serialize)]
struct QuoteReport<'a> {
    ledger: &'a Ledger,
    summary: &'a LedgerSummary,
}

/// Read a JSON array of records, naming the first invalid one
pub fn load_records(path: &Path) -> Result<Vec<QuoteRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("Input {} is not a JSON array", path.display()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value).with_context(|| format!("Record {} is invalid", index))
        })
        .collect()
}

/// Pick the SKU source: the remote resolver when configured, else the catalog.
/// Also returns a one-line description of the choice.
fn build_source(
    config: &QuoterConfig,
    region: &str,
    catalog_only: bool,
) -> Result<(Arc<dyn SkuSource>, String)> {
    match (&config.recommend_endpoint, catalog_only) {
        (Some(endpoint), false) => {
            let port = HttpRecommendationPort::new(endpoint, region, config.call_timeout())?;
            let resolver = RemoteResolver::new(Arc::new(port), config.strategies())?
                .with_call_timeout(config.call_timeout());
            info!(
                endpoint = %endpoint,
                strategies = resolver.strategies().len(),
                "Using remote recommendation"
            );
            let source: Arc<dyn SkuSource> = Arc::new(resolver);
            Ok((source, format!("Recommending through {}", endpoint)))
        }
        _ => {
            let catalog = config.catalog()?;
            let description = format!(
                "Matching against the local catalog ({} shapes)",
                catalog.len()
            );
            let source: Arc<dyn SkuSource> = Arc::new(CatalogMatcher::new(Arc::new(catalog)));
            Ok((source, description))
        }
    }
}

/// Quote a batch of records
pub async fn run_quote(
    config: &QuoterConfig,
    options: QuoteOptions,
    format: OutputFormat,
) -> Result<()> {
    let records = load_records(&options.input)?;

    let region = options.region.unwrap_or_else(|| config.region.clone());
    let term = options.term.unwrap_or(config.billing_term);
    let concurrency = options.concurrency.unwrap_or(config.concurrency);

    let pricing_endpoint = config.pricing_endpoint.as_deref().context(
        "pricing_endpoint is not configured (set SKUQ_PRICING_ENDPOINT or add it to the config file)",
    )?;

    let table_output = matches!(format, OutputFormat::Table);
    let (source, description) = build_source(config, &region, options.catalog_only)?;
    if table_output {
        print_info(&description);
    }
    let pricing_port = HttpPricingPort::new(pricing_endpoint, config.call_timeout())?;
    let pricing = PricingResolver::new(Arc::new(pricing_port))
        .with_system_disk_gb(config.system_disk_gb)
        .with_call_timeout(config.call_timeout());

    let orchestrator = BatchOrchestrator::new(
        source,
        Arc::new(pricing),
        ProductClassifier::new(config.product_filter()),
        BatchSettings::new(region, term).with_concurrency(concurrency),
    )?
    .with_run_label(format!("quote-{}", Utc::now().format("%Y%m%dT%H%M%SZ")));

    let ledger = orchestrator.run(records).await;
    let summary = ledger.summary();

    if let Some(path) = &options.output {
        let json = serde_json::to_string_pretty(&ledger).context("Failed to serialize ledger")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write ledger {}", path.display()))?;
        if table_output {
            print_success(&format!("Ledger written to {}", path.display()));
        }
    }

    match format {
        OutputFormat::Json => print_json(&QuoteReport {
            ledger: &ledger,
            summary: &summary,
        })?,
        OutputFormat::Table => print_ledger(&ledger, &summary),
    }

    if options.metrics {
        println!("{}", EngineMetrics::new().render());
    }

    Ok(())
}

fn print_ledger(ledger: &Ledger, summary: &LedgerSummary) {
    let rows: Vec<QuoteRow> = ledger
        .iter()
        .enumerate()
        .map(|(index, entry)| QuoteRow {
            index: index + 1,
            source_ref: entry.source_ref.clone(),
            product: entry.product_label.clone(),
            request: format!(
                "{}C/{}G",
                entry.requirement.cpu_cores, entry.requirement.memory_gb
            ),
            sku: entry.sku.clone().unwrap_or_else(|| "-".to_string()),
            family: entry
                .instance_family_label
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            monthly: format_optional_currency(entry.monthly_price),
            status: color_status(entry.status.as_str()),
            note: entry
                .error
                .as_deref()
                .map(|e| truncate(e, 48))
                .unwrap_or_default(),
        })
        .collect();
    print_table(&rows);

    println!();
    println!("{}", "Summary".bold());
    println!("{}", "=".repeat(50));
    println!("Records:                {}", summary.total);
    println!("Succeeded:              {}", summary.succeeded.to_string().green());
    println!("Skipped:                {}", summary.skipped.to_string().yellow());
    println!("Failed:                 {}", summary.failed.to_string().red());
    println!("Monthly total:          {}", format_currency(summary.total_monthly));
    println!("Annual estimate:        {}", format_currency(summary.annual_estimate));
    println!(
        "Average per instance:   {}",
        format_optional_currency(summary.average_monthly)
    );

    if summary.skipped > 0 {
        print_warning(&format!("{} non-compute records were skipped", summary.skipped));
    }
    if summary.failed > 0 {
        print_error(&format!("{} records could not be quoted", summary.failed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"source_ref": "row-1", "requirement": {{"cpu_cores": 16, "memory_gb": 64}}}},
                {{"source_ref": "row-2", "requirement": {{"cpu_cores": 4, "memory_gb": 8, "workload_class": "compute"}}, "product_label": "Redis"}}
            ]"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_label, "ECS");
        assert_eq!(records[1].product_label, "Redis");
    }

    #[test]
    fn test_invalid_record_is_named() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"source_ref": "ok", "requirement": {{"cpu_cores": 2, "memory_gb": 4}}}},
                {{"source_ref": "bad", "requirement": {{"cpu_cores": 0, "memory_gb": 4}}}}]"#
        )
        .unwrap();

        let err = load_records(file.path()).unwrap_err();
        assert!(err.to_string().contains("Record 1"));
    }

    #[tokio::test]
    async fn test_quote_requires_pricing_endpoint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();

        let options = QuoteOptions {
            input: file.path().to_path_buf(),
            ..QuoteOptions::default()
        };
        let err = run_quote(&QuoterConfig::default(), options, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pricing_endpoint"));
    }
}
