//! SKU classification command

use anyhow::Result;
use engine_lib::pricing::DiskCategoryTable;
use engine_lib::sku::{instance_family_label, SkuCode};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_json, print_table, print_warning, OutputFormat};

/// Row for the classification table
#[derive(Debug, Tabled, Serialize)]
struct ClassificationRow {
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Generation")]
    generation: String,
    #[tabled(rename = "Disk")]
    disk_category: String,
    #[tabled(rename = "PL")]
    performance_level: String,
}

fn classify(sku: &str, table: &DiskCategoryTable) -> ClassificationRow {
    let generation = SkuCode::parse(sku).and_then(|code| code.generation());
    let category = table.category_for_generation(generation);

    ClassificationRow {
        sku: sku.to_string(),
        family: instance_family_label(sku),
        generation: generation
            .map(|g| g.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        disk_category: category.token().to_string(),
        performance_level: category.performance_level().unwrap_or("-").to_string(),
    }
}

/// Show generation, disk category and family label for each SKU
pub fn classify_skus(skus: &[String], format: OutputFormat) -> Result<()> {
    let table = DiskCategoryTable::default();
    let rows: Vec<ClassificationRow> = skus.iter().map(|sku| classify(sku, &table)).collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            print_table(&rows);
            let unparsed = skus.iter().filter(|s| SkuCode::parse(s.as_str()).is_none()).count();
            if unparsed > 0 {
                print_warning(&format!(
                    "{} SKU codes were not recognized; older disk categories assumed",
                    unparsed
                ));
            }
        }
    }

    Ok(())
}
