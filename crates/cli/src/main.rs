//! SKU quotation CLI
//!
//! A command-line tool for turning resource requirements into priced
//! compute SKUs, inspecting the instance catalog and classifying SKU codes.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{catalog, classify, quote};
use engine_lib::BillingTerm;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// SKU quotation CLI
#[derive(Parser)]
#[command(name = "skuq")]
#[command(author, version, about = "Batch quotation of cloud compute SKUs", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.config/skuq/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and price a batch of requirement records
    Quote {
        /// JSON array of quote records
        #[arg(long, short)]
        input: PathBuf,

        /// Write the full ledger as JSON to this path
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Region to price in (overrides configuration)
        #[arg(long)]
        region: Option<String>,

        /// Billing term: monthly or annual
        #[arg(long)]
        term: Option<BillingTerm>,

        /// Records quoted in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Use the local catalog even when a recommendation service is configured
        #[arg(long)]
        catalog_only: bool,

        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },

    /// Match a requirement against the local catalog
    Match {
        /// vCPU count
        #[arg(long)]
        cpu: u32,

        /// Memory in GB
        #[arg(long)]
        memory: f64,

        /// Workload class (general, compute, memory_intensive)
        #[arg(long)]
        class: Option<String>,
    },

    /// Show generation, disk category and family of SKU codes
    Classify {
        /// SKU codes, e.g. ecs.g8y.4xlarge
        #[arg(required = true)]
        skus: Vec<String>,
    },

    /// List the active instance catalog
    Catalog,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::QuoterConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Quote {
            input,
            output,
            region,
            term,
            concurrency,
            catalog_only,
            metrics,
        } => {
            let options = quote::QuoteOptions {
                input,
                output,
                region,
                term,
                concurrency,
                catalog_only,
                metrics,
            };
            quote::run_quote(&config, options, cli.format).await?;
        }
        Commands::Match { cpu, memory, class } => {
            catalog::match_requirement(&config, cpu, memory, class.as_deref(), cli.format)?;
        }
        Commands::Classify { skus } => {
            classify::classify_skus(&skus, cli.format)?;
        }
        Commands::Catalog => {
            catalog::list_catalog(&config, cli.format)?;
        }
    }

    Ok(())
}
