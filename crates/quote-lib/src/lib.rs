//! Cloud quote optimization core
//!
//! This crate provides:
//! - Floating cost intervals and the quote aggregate
//! - Workload profiles weighting CO2 emissions
//! - The lookup engine selecting the best catalog offer for a resource
//! - The budget leveler sharing a prepaid budget between resources
//! - Observability (metrics and structured events)

pub mod catalog;
pub mod cost;
pub mod error;
pub mod leveler;
pub mod lookup;
pub mod models;
pub mod observability;
pub mod store;
pub mod workload;

#[cfg(test)]
mod testing;

pub use catalog::{CatalogRepository, InMemoryCatalog};
pub use cost::{FloatingCost, QuoteTotal};
pub use error::{QuoteError, Result};
pub use leveler::{BudgetLeveler, LevelingOutcome};
pub use lookup::{LookupConfig, LookupContext, LookupEngine, LookupResult, WorkerPool};
pub use models::*;
pub use observability::{EngineMetrics, QuoteLogger};
pub use store::{QuoteLedger, QuoteStore};
pub use workload::Workload;
