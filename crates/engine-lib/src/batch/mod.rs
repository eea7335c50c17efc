//! Batch quotation
//!
//! This module provides:
//! - Product classification that skips non-compute records
//! - The orchestrator that resolves and prices each record into a ledger
//!
//! One failing record never aborts the batch; it becomes a `Failed`
//! entry and processing moves on.

mod filter;
mod orchestrator;


pub use filter::{ProductClassifier, ProductFilter, ProductKind, DEFAULT_FILTER_VERSION};
pub use orchestrator::{BatchOrchestrator, BatchSettings};
