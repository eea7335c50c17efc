//! Catalog-related CLI commands

use anyhow::Result;
use colored::Colorize;
use engine_lib::catalog::{CatalogEntry, CatalogMatcher, MatchTier};
use engine_lib::sku::instance_family_label;
use engine_lib::{ResourceRequirement, WorkloadClass};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;

use crate::config::QuoterConfig;
use crate::output::{print_info, print_json, print_table, OutputFormat};

/// Row for the catalog table
#[derive(Tabled, Serialize)]
struct CatalogRow {
    #[tabled(rename = "Class")]
    workload_class: String,
    #[tabled(rename = "vCPU")]
    cpu_cores: u32,
    #[tabled(rename = "Memory (GB)")]
    memory_gb: u32,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Family")]
    family: String,
}

impl From<&CatalogEntry> for CatalogRow {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            workload_class: entry.workload_class.to_string(),
            cpu_cores: entry.cpu_cores,
            memory_gb: entry.memory_gb,
            sku: entry.sku.clone(),
            family: instance_family_label(&entry.sku),
        }
    }
}

#[derive(Serialize)]
struct MatchReport {
    workload_class: WorkloadClass,
    cpu_cores: u32,
    memory_gb: f64,
    sku: String,
    family: String,
    #[serde(flatten)]
    tier: MatchTier,
}

/// List the active catalog grouped by workload class
pub fn list_catalog(config: &QuoterConfig, format: OutputFormat) -> Result<()> {
    let catalog = config.catalog()?;

    let mut entries: Vec<&CatalogEntry> = catalog.entries().iter().collect();
    entries.sort_by_key(|e| (e.workload_class, e.cpu_cores, e.memory_gb));
    let rows: Vec<CatalogRow> = entries.into_iter().map(CatalogRow::from).collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            print_table(&rows);
            println!("\nDefault SKU: {}", catalog.default_sku().cyan());
        }
    }

    Ok(())
}

/// Match one requirement against the catalog without any network call
pub fn match_requirement(
    config: &QuoterConfig,
    cpu_cores: u32,
    memory_gb: f64,
    class: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let workload_class = match class {
        Some(label) => label.parse::<WorkloadClass>()?,
        None => WorkloadClass::General,
    };
    let requirement = ResourceRequirement::new(cpu_cores, memory_gb, 0.0, workload_class, "cli")?;

    let matcher = CatalogMatcher::new(Arc::new(config.catalog()?));
    let matched = matcher.match_sku(&requirement);

    let report = MatchReport {
        workload_class,
        cpu_cores,
        memory_gb,
        family: instance_family_label(&matched.sku),
        sku: matched.sku,
        tier: matched.tier,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Catalog Match".bold());
            println!("{}", "=".repeat(50));
            println!("Requirement:            {}C/{}G {}", cpu_cores, memory_gb, workload_class);
            println!("SKU:                    {}", report.sku.green());
            println!("Family:                 {}", report.family);
            match report.tier {
                MatchTier::Exact => println!("Tier:                   exact"),
                MatchTier::Nearest { distance } => {
                    println!("Tier:                   nearest (distance {})", distance);
                }
                MatchTier::ClassDefault => {
                    println!("Tier:                   class default");
                    print_info("No catalog shapes for this class; using the default SKU");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_from_builtin_catalog() {
        let catalog = QuoterConfig::default().catalog().unwrap();
        let rows: Vec<CatalogRow> = catalog.entries().iter().map(CatalogRow::from).collect();
        let row = rows.iter().find(|r| r.sku == "ecs.g6.4xlarge").unwrap();
        assert_eq!(row.workload_class, "general");
        assert_eq!(row.family, "General Purpose (Gen 6)");
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let result = match_requirement(
            &QuoterConfig::default(),
            4,
            16.0,
            Some("quantum"),
            OutputFormat::Json,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_cpu_is_rejected() {
        let result = match_requirement(&QuoterConfig::default(), 0, 16.0, None, OutputFormat::Json);
        assert!(result.is_err());
    }
}
