//! Static instance catalog
//!
//! This module provides the read-only table of known instance shapes and
//! the deterministic matcher built on top of it. The catalog is constructed
//! once at startup and shared through an `Arc`; nothing here touches the
//! network.

mod matcher;


pub use matcher::{CatalogMatch, CatalogMatcher, MatchTier};

use crate::error::{EngineError, Result};
use crate::models::WorkloadClass;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default SKU returned when a class has no catalog entries
pub const DEFAULT_GENERAL_SKU: &str = "ecs.g6.large";

/// One known instance shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub workload_class: WorkloadClass,
    pub cpu_cores: u32,
    pub memory_gb: u32,
    pub sku: String,
}

impl CatalogEntry {
    pub fn new(workload_class: WorkloadClass, cpu_cores: u32, memory_gb: u32, sku: &str) -> Self {
        Self {
            workload_class,
            cpu_cores,
            memory_gb,
            sku: sku.to_string(),
        }
    }

    fn key(&self) -> CatalogKey {
        (self.workload_class, self.cpu_cores, self.memory_gb)
    }
}

type CatalogKey = (WorkloadClass, u32, u32);

/// Serialized form of a catalog, as loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default = "default_sku")]
    pub default_sku: String,
    pub entries: Vec<CatalogEntry>,
}

fn default_sku() -> String {
    DEFAULT_GENERAL_SKU.to_string()
}

/// Read-only table of `(workload_class, cpu, memory) -> sku`
#[derive(Debug, Clone)]
pub struct InstanceCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<CatalogKey, usize>,
    default_sku: String,
}

impl InstanceCatalog {
    pub fn new(entries: Vec<CatalogEntry>, default_sku: impl Into<String>) -> Result<Self> {
        let default_sku = default_sku.into();
        if default_sku.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "catalog default SKU must not be empty".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.cpu_cores == 0 || entry.memory_gb == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "catalog entry {} has a zero dimension",
                    entry.sku
                )));
            }
            if index.insert(entry.key(), position).is_some() {
                return Err(EngineError::InvalidConfig(format!(
                    "duplicate catalog key {} {}C {}G",
                    entry.workload_class, entry.cpu_cores, entry.memory_gb
                )));
            }
        }

        Ok(Self {
            entries,
            index,
            default_sku,
        })
    }

    pub fn from_document(document: CatalogDocument) -> Result<Self> {
        Self::new(document.entries, document.default_sku)
    }

    /// Parse a JSON catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("catalog document: {}", e)))?;
        Self::from_document(document)
    }

    /// Stock table of sixth-generation shapes
    pub fn builtin() -> Self {
        use WorkloadClass::*;

        let entries = vec![
            CatalogEntry::new(MemoryIntensive, 16, 64, "ecs.r6.4xlarge"),
            CatalogEntry::new(MemoryIntensive, 8, 64, "ecs.r6.2xlarge"),
            CatalogEntry::new(MemoryIntensive, 32, 128, "ecs.r6.8xlarge"),
            CatalogEntry::new(MemoryIntensive, 4, 32, "ecs.r6.xlarge"),
            CatalogEntry::new(Compute, 16, 32, "ecs.c6.4xlarge"),
            CatalogEntry::new(Compute, 8, 16, "ecs.c6.2xlarge"),
            CatalogEntry::new(Compute, 32, 64, "ecs.c6.8xlarge"),
            CatalogEntry::new(Compute, 4, 8, "ecs.c6.xlarge"),
            CatalogEntry::new(General, 16, 64, "ecs.g6.4xlarge"),
            CatalogEntry::new(General, 8, 32, "ecs.g6.2xlarge"),
            CatalogEntry::new(General, 32, 128, "ecs.g6.8xlarge"),
            CatalogEntry::new(General, 4, 16, "ecs.g6.xlarge"),
        ];

        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            index.insert(entry.key(), position);
        }

        Self {
            entries,
            index,
            default_sku: DEFAULT_GENERAL_SKU.to_string(),
        }
    }

    pub fn lookup(&self, class: WorkloadClass, cpu_cores: u32, memory_gb: u32) -> Option<&CatalogEntry> {
        self.index
            .get(&(class, cpu_cores, memory_gb))
            .map(|&position| &self.entries[position])
    }

    pub fn entries_for(&self, class: WorkloadClass) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(move |e| e.workload_class == class)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn default_sku(&self) -> &str {
        &self.default_sku
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InstanceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
