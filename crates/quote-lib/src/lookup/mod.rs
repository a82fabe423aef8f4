//! Lookup engine
//!
//! Matches a resource request against the catalog and selects the best
//! offer:
//! - `context`: resolution of usage, budget, optimizer and location
//! - `capability`: per-kind OS/engine matching and custom-axis coefficients
//! - `pricing`: custom cost, CO2 and scoring of candidates
//! - `engine`: two-phase widening search and price validation
//! - `batch`: lookups of many resources over a worker pool

mod batch;
pub mod capability;
mod context;
mod engine;
pub mod pricing;


pub use batch::{lookup_all, LookupJob, WorkerPool};
pub use capability::{Capabilities, KindCapability};
pub use context::{effective_budget, LookupContext};
pub use engine::{LookupEngine, LookupResult};
pub use pricing::{ScoredPrice, Shape};

use serde::{Deserialize, Serialize};

/// Search bounds of the two lookup passes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Months added to the usage duration to cap narrow-pass terms
    pub narrow_period_margin: f64,
    /// Narrow-pass upper bound, as a multiple of the requested cpu/ram/gpu
    pub narrow_amplification: f64,
    pub wide_period_ceiling: f64,
    pub wide_amplification: f64,
    /// Rounding step of the utilization baseline
    pub baseline_step: f64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            narrow_period_margin: 12.0,
            narrow_amplification: 10.0,
            wide_period_ceiling: 10_000.0,
            wide_amplification: 10_000.0,
            baseline_step: 5.0,
        }
    }
}
