//! Provider catalog access
//!
//! The lookup engine only consumes typed query results. Any store able to
//! answer [`CatalogRepository`] queries can back it; [`InMemoryCatalog`]
//! serves tests and the command line driver.

mod memory;

pub use memory::InMemoryCatalog;

use crate::error::Result;
use crate::models::{Os, Rate, ResourceKind};
use serde::{Deserialize, Serialize};

/// Priced region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Purchasable type, fixed-shape or custom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogType {
    pub code: String,
    #[serde(default)]
    pub kind: ResourceKind,
    /// For custom types, the largest shape that can be requested
    pub cpu: f64,
    /// MB
    pub ram: f64,
    #[serde(default)]
    pub gpu: f64,
    #[serde(default)]
    pub constant: Option<bool>,
    /// Sustained CPU baseline of burstable types, in percent
    #[serde(default)]
    pub baseline: Option<f64>,
    #[serde(default)]
    pub physical: bool,
    #[serde(default)]
    pub processor: Option<String>,
    #[serde(default)]
    pub auto_scale: bool,
    #[serde(default)]
    pub edge: bool,
    #[serde(default)]
    pub custom: bool,
    #[serde(default = "default_rate")]
    pub cpu_rate: Rate,
    #[serde(default = "default_rate")]
    pub ram_rate: Rate,
    #[serde(default = "default_rate")]
    pub gpu_rate: Rate,
    #[serde(default = "default_rate")]
    pub network_rate: Rate,
    #[serde(default = "default_rate")]
    pub storage_rate: Rate,
}

fn default_rate() -> Rate {
    Rate::Medium
}

/// Billing plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTerm {
    pub code: String,
    /// Committed months, 0 for on-demand
    pub period: f64,
    #[serde(default)]
    pub ephemeral: bool,
    /// Requires a one-time payment
    #[serde(default)]
    pub initial_cost: bool,
    #[serde(default)]
    pub reservation: bool,
    #[serde(default)]
    pub convertible_os: bool,
    #[serde(default)]
    pub convertible_engine: bool,
    #[serde(default)]
    pub convertible_type: bool,
    #[serde(default)]
    pub convertible_family: bool,
    #[serde(default)]
    pub convertible_location: bool,
}

impl CatalogTerm {
    pub fn is_on_demand(&self) -> bool {
        self.period <= 0.0
    }
}

/// Per-unit pricing of one elastic axis of a custom type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAxis {
    #[serde(default)]
    pub minimum: f64,
    #[serde(default = "default_increment")]
    pub increment: f64,
    pub unit_cost: f64,
    /// CO2 per billable unit
    #[serde(default)]
    pub co2: f64,
    #[serde(default)]
    pub co2_curve: Option<String>,
}

fn default_increment() -> f64 {
    1.0
}

/// Per-axis pricing of a custom type; an absent axis is not billed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomPricing {
    #[serde(default)]
    pub cpu: Option<CustomAxis>,
    #[serde(default)]
    pub gpu: Option<CustomAxis>,
    /// Billed per GB
    #[serde(default)]
    pub ram: Option<CustomAxis>,
}

/// One (type, term, location) offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPrice {
    pub code: String,
    #[serde(rename = "type")]
    pub type_code: String,
    pub term: String,
    pub location: String,
    #[serde(default)]
    pub os: Option<Os>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    /// Recurring monthly cost; base fee for custom types
    pub cost: f64,
    #[serde(default)]
    pub initial_cost: f64,
    /// Monthly CO2 at full utilization
    #[serde(default)]
    pub co2: f64,
    /// Comma-separated CO2 samples by utilization
    #[serde(default)]
    pub co2_curve: Option<String>,
    #[serde(default)]
    pub custom: Option<CustomPricing>,
}

/// Constraints on candidate types
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeQuery {
    pub kind: ResourceKind,
    pub location: String,
    pub cpu: f64,
    pub ram: f64,
    pub gpu: f64,
    pub cpu_max: f64,
    pub ram_max: f64,
    pub gpu_max: f64,
    pub baseline: f64,
    pub constant: Option<bool>,
    pub physical: Option<bool>,
    pub type_code: Option<String>,
    pub processor: Option<String>,
    pub auto_scale: bool,
    pub cpu_rate: Option<Rate>,
    pub ram_rate: Option<Rate>,
    pub gpu_rate: Option<Rate>,
    pub network_rate: Option<Rate>,
    pub storage_rate: Option<Rate>,
    pub edge: bool,
    pub co2_required: bool,
}

/// Constraints on candidate terms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TermQuery {
    pub location: String,
    pub convertible_os: bool,
    pub convertible_engine: bool,
    pub convertible_type: bool,
    pub convertible_family: bool,
    pub convertible_location: bool,
    pub reservation: bool,
    pub max_period: f64,
    pub ephemeral: bool,
    /// Only this term, when the request pins one
    pub term_code: Option<String>,
    /// Terms requiring a one-time payment are allowed
    pub initial_cost: bool,
}

/// Offers for the cross product of matched types and terms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceQuery {
    pub kind: ResourceKind,
    pub location: String,
    pub types: Vec<String>,
    pub terms: Vec<String>,
}

/// Scoring row: a price with the type and term it was matched through
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCandidate {
    pub price: CatalogPrice,
    pub catalog_type: CatalogType,
    pub term: CatalogTerm,
}

/// Read-only queries the lookup engine issues against a provider catalog
pub trait CatalogRepository: Send + Sync {
    fn find_location(&self, name: &str) -> Result<Option<Location>>;

    fn find_type(&self, kind: ResourceKind, code: &str) -> Result<Option<CatalogType>>;

    fn find_term(&self, code: &str) -> Result<Option<CatalogTerm>>;

    fn find_price(&self, code: &str) -> Result<Option<PriceCandidate>>;

    /// Fixed-shape types matching the query
    fn find_valid_types(&self, query: &TypeQuery) -> Result<Vec<String>>;

    /// Custom types able to host the requested shape
    fn find_dynamic_types(&self, query: &TypeQuery) -> Result<Vec<String>>;

    fn find_valid_terms(&self, query: &TermQuery) -> Result<Vec<String>>;

    fn find_prices(&self, query: &PriceQuery) -> Result<Vec<PriceCandidate>>;

    fn has_dynamic_types(&self, kind: ResourceKind, location: &str) -> Result<bool>;

    fn has_co2_data(&self, location: &str) -> Result<bool>;
}
