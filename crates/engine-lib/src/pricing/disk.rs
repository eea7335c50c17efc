//! Disk category selection by instance generation

use crate::error::{EngineError, Result};
use crate::sku::{Generation, SkuCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// System disk size used when none is configured
pub const DEFAULT_SYSTEM_DISK_GB: u32 = 40;

/// Cloud disk storage class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskCategory {
    CloudEssd,
    CloudEfficiency,
    CloudSsd,
}

impl DiskCategory {
    /// Wire token expected by the pricing service
    pub fn token(&self) -> &'static str {
        match self {
            DiskCategory::CloudEssd => "cloud_essd",
            DiskCategory::CloudEfficiency => "cloud_efficiency",
            DiskCategory::CloudSsd => "cloud_ssd",
        }
    }

    /// Performance level to send alongside the category, if any
    pub fn performance_level(&self) -> Option<&'static str> {
        match self {
            DiskCategory::CloudEssd => Some("PL0"),
            _ => None,
        }
    }
}

impl fmt::Display for DiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One generation band: SKUs at or above `min_generation` use `category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationBand {
    pub min_generation: u8,
    pub category: DiskCategory,
}

/// Static generation -> disk category table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskCategoryTable {
    bands: Vec<GenerationBand>,
    unknown: DiskCategory,
}

impl DiskCategoryTable {
    /// Bands may be given in any order; the highest matching band wins
    pub fn new(mut bands: Vec<GenerationBand>, unknown: DiskCategory) -> Result<Self> {
        bands.sort_by(|a, b| b.min_generation.cmp(&a.min_generation));
        if bands
            .windows(2)
            .any(|pair| pair[0].min_generation == pair[1].min_generation)
        {
            return Err(EngineError::InvalidConfig(
                "disk category table has overlapping generation bands".to_string(),
            ));
        }
        Ok(Self { bands, unknown })
    }

    pub fn category_for_generation(&self, generation: Option<Generation>) -> DiskCategory {
        let Some(Generation(gen)) = generation else {
            return self.unknown;
        };
        self.bands
            .iter()
            .find(|band| gen >= band.min_generation)
            .map(|band| band.category)
            .unwrap_or(self.unknown)
    }

    pub fn category_for(&self, sku: &str) -> DiskCategory {
        let generation = SkuCode::parse(sku).and_then(|code| code.generation());
        self.category_for_generation(generation)
    }
}

impl Default for DiskCategoryTable {
    /// Seventh generation and newer take ESSD; older and unknown take efficiency disks
    fn default() -> Self {
        Self {
            bands: vec![
                GenerationBand {
                    min_generation: 7,
                    category: DiskCategory::CloudEssd,
                },
                GenerationBand {
                    min_generation: 0,
                    category: DiskCategory::CloudEfficiency,
                },
            ],
            unknown: DiskCategory::CloudEfficiency,
        }
    }
}

/// Disk sizes attached to a price query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSizes {
    pub system_gb: u32,
    pub data_gb: Option<u32>,
}

impl DiskSizes {
    /// Data disk sized from requested storage; zero storage means no data disk
    pub fn for_storage(system_gb: u32, storage_gb: f64) -> Self {
        let data_gb = if storage_gb > 0.0 {
            Some(storage_gb.ceil().min(u32::MAX as f64) as u32)
        } else {
            None
        };
        Self { system_gb, data_gb }
    }
}

impl Default for DiskSizes {
    fn default() -> Self {
        Self {
            system_gb: DEFAULT_SYSTEM_DISK_GB,
            data_gb: None,
        }
    }
}
