//! Configuration management for the CLI

use anyhow::{bail, Context, Result};
use engine_lib::batch::ProductFilter;
use engine_lib::catalog::InstanceCatalog;
use engine_lib::pricing::DEFAULT_SYSTEM_DISK_GB;
use engine_lib::recommend::{default_strategies, RecommendationStrategy};
use engine_lib::BillingTerm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment variables read into [`QuoterConfig`]
pub const ENV_PREFIX: &str = "SKUQ";

/// Quoter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoterConfig {
    /// Region every price is quoted in
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub billing_term: BillingTerm,

    /// Recommendation service base URL; catalog matching is used when absent
    #[serde(default)]
    pub recommend_endpoint: Option<String>,

    /// Pricing service base URL
    #[serde(default)]
    pub pricing_endpoint: Option<String>,

    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// JSON catalog replacing the built-in one
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_system_disk")]
    pub system_disk_gb: u32,

    #[serde(default)]
    pub strategies: Option<Vec<RecommendationStrategy>>,

    #[serde(default)]
    pub product_filter: Option<ProductFilter>,
}

fn default_region() -> String {
    "cn-beijing".to_string()
}

fn default_call_timeout() -> u64 {
    30
}

fn default_concurrency() -> usize {
    1
}

fn default_system_disk() -> u32 {
    DEFAULT_SYSTEM_DISK_GB
}

impl Default for QuoterConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            billing_term: BillingTerm::default(),
            recommend_endpoint: None,
            pricing_endpoint: None,
            call_timeout_secs: default_call_timeout(),
            concurrency: default_concurrency(),
            catalog_path: None,
            system_disk_gb: default_system_disk(),
            strategies: None,
            product_filter: None,
        }
    }
}

impl QuoterConfig {
    /// Load from the config file (explicit or default location) and `SKUQ_` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`QuoterConfig::load`], reading variables from `env` instead of the process
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                builder = builder.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder =
                        builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(env))
            .build()
            .context("Failed to read configuration")?;

        let loaded: QuoterConfig = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            bail!("region must not be empty");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.call_timeout_secs == 0 {
            bail!("call_timeout_secs must be at least 1");
        }
        if matches!(&self.strategies, Some(list) if list.is_empty()) {
            bail!("strategies must not be empty when set");
        }
        Ok(())
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("skuq").join("config.toml"))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn strategies(&self) -> Vec<RecommendationStrategy> {
        self.strategies.clone().unwrap_or_else(default_strategies)
    }

    pub fn product_filter(&self) -> ProductFilter {
        self.product_filter.clone().unwrap_or_default()
    }

    /// Catalog from `catalog_path`, or the built-in table
    pub fn catalog(&self) -> Result<InstanceCatalog> {
        match &self.catalog_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read catalog {}", path.display()))?;
                InstanceCatalog::from_json(&content)
                    .with_context(|| format!("Invalid catalog {}", path.display()))
            }
            None => Ok(InstanceCatalog::builtin()),
        }
    }
}
