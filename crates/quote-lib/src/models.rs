//! Core data models for quote evaluation

use crate::cost::FloatingCost;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of quoted resource sharing the lookup engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Instance,
    Database,
    Container,
    Function,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instance",
            ResourceKind::Database => "database",
            ResourceKind::Container => "container",
            ResourceKind::Function => "function",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performance class of a type axis, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rate {
    Worst,
    Low,
    Medium,
    Good,
    Best,
}

/// Operating system of VM-like resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Windows,
    Suse,
    Rhel,
    Centos,
    Debian,
    Ubuntu,
}

/// Selection metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptimizerMode {
    #[default]
    Cost,
    Co2,
}

/// Requested resource shape and preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRequest {
    /// Identifying key reported on failures
    pub name: String,
    pub kind: ResourceKind,
    pub cpu: f64,
    /// Memory in MB
    pub ram: f64,
    pub gpu: f64,
    pub constant: Option<bool>,
    pub physical: Option<bool>,
    pub processor: Option<String>,
    pub auto_scale: bool,
    pub cpu_rate: Option<Rate>,
    pub ram_rate: Option<Rate>,
    pub gpu_rate: Option<Rate>,
    pub network_rate: Option<Rate>,
    pub storage_rate: Option<Rate>,
    pub os: Option<Os>,
    pub engine: Option<String>,
    pub edition: Option<String>,
    /// Explicit catalog type code
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    /// Explicit catalog term code
    pub term: Option<String>,
    pub ephemeral: bool,
    pub location: Option<String>,
    pub usage: Option<String>,
    pub budget: Option<String>,
    pub optimizer: Option<String>,
    pub workload: Option<String>,
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ResourceKind::Instance,
            cpu: 0.0,
            ram: 0.0,
            gpu: 0.0,
            constant: None,
            physical: None,
            processor: None,
            auto_scale: false,
            cpu_rate: None,
            ram_rate: None,
            gpu_rate: None,
            network_rate: None,
            storage_rate: None,
            os: None,
            engine: None,
            edition: None,
            type_code: None,
            term: None,
            ephemeral: false,
            location: None,
            usage: None,
            budget: None,
            optimizer: None,
            workload: None,
            min_quantity: 1,
            max_quantity: None,
        }
    }
}

impl ResourceRequest {
    pub fn new(name: impl Into<String>, kind: ResourceKind, cpu: f64, ram: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            cpu,
            ram,
            ..Default::default()
        }
    }

    /// Quantities must form a valid range
    pub fn check_quantities(&self) -> crate::error::Result<()> {
        match self.max_quantity {
            Some(max) if max < self.min_quantity => {
                Err(crate::error::QuoteError::ConstraintViolation(format!(
                    "{} '{}': max quantity {} is lower than min quantity {}",
                    self.kind, self.name, max, self.min_quantity
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Utilization profile scaling recurring cost of sub-monthly terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub name: String,
    /// Percent of time the resource runs, 0..=100
    pub rate: f64,
    /// Months
    pub duration: u32,
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub convertible_os: bool,
    #[serde(default)]
    pub convertible_engine: bool,
    #[serde(default)]
    pub convertible_family: bool,
    #[serde(default)]
    pub convertible_type: bool,
    #[serde(default)]
    pub convertible_location: bool,
    #[serde(default)]
    pub reservation: bool,
}

impl Usage {
    /// Always on, one month
    pub const DEFAULT: Usage = Usage {
        name: String::new(),
        rate: 100.0,
        duration: 1,
        start: 0,
        convertible_os: false,
        convertible_engine: false,
        convertible_family: false,
        convertible_type: false,
        convertible_location: false,
        reservation: false,
    };
}

/// Prepaid one-time-cost ceiling shared by resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub name: String,
    pub initial_cost: f64,
    /// Recomputed by every leveling pass
    #[serde(default)]
    pub remaining_budget: Option<f64>,
}

impl Budget {
    /// Zero-cost sentinel for resources without a budget
    pub const DEFAULT: Budget = Budget {
        name: String::new(),
        initial_cost: 0.0,
        remaining_budget: None,
    };

    /// One-time cost still available to a single lookup
    pub fn available_initial_cost(&self) -> f64 {
        self.remaining_budget.unwrap_or(self.initial_cost)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimizer {
    pub name: String,
    pub mode: OptimizerMode,
}

impl Optimizer {
    pub const DEFAULT: Optimizer = Optimizer {
        name: String::new(),
        mode: OptimizerMode::Cost,
    };
}

/// Quote-wide settings resources inherit from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSettings {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub optimizer: Option<String>,
    /// Percent applied to requested RAM
    #[serde(default = "default_ram_adjusted_rate")]
    pub ram_adjusted_rate: u32,
    #[serde(default)]
    pub usages: Vec<Usage>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub optimizers: Vec<Optimizer>,
}

fn default_ram_adjusted_rate() -> u32 {
    100
}

impl QuoteSettings {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            usage: None,
            budget: None,
            optimizer: None,
            ram_adjusted_rate: default_ram_adjusted_rate(),
            usages: Vec::new(),
            budgets: Vec::new(),
            optimizers: Vec::new(),
        }
    }

    pub fn find_usage(&self, name: &str) -> Option<&Usage> {
        self.usages.iter().find(|u| u.name == name)
    }

    pub fn find_budget(&self, name: &str) -> Option<&Budget> {
        self.budgets.iter().find(|b| b.name == name)
    }

    pub fn find_budget_mut(&mut self, name: &str) -> Option<&mut Budget> {
        self.budgets.iter_mut().find(|b| b.name == name)
    }

    pub fn find_optimizer(&self, name: &str) -> Option<&Optimizer> {
        self.optimizers.iter().find(|o| o.name == name)
    }
}

/// Stored identifier of a quoted resource
pub type ResourceId = u64;

/// A quoted resource with its last persisted price and cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResource {
    pub id: ResourceId,
    pub request: ResourceRequest,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub cost: FloatingCost,
}

/// Serialized quote: settings plus resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(flatten)]
    pub settings: QuoteSettings,
    #[serde(default)]
    pub resources: Vec<QuoteResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_available_prefers_remaining() {
        let mut budget = Budget {
            name: "b".into(),
            initial_cost: 1000.0,
            remaining_budget: None,
        };
        assert_eq!(budget.available_initial_cost(), 1000.0);
        budget.remaining_budget = Some(250.0);
        assert_eq!(budget.available_initial_cost(), 250.0);
        assert_eq!(Budget::DEFAULT.available_initial_cost(), 0.0);
    }

    #[test]
    fn test_rate_ordering() {
        assert!(Rate::Best > Rate::Good);
        assert!(Rate::Low > Rate::Worst);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: ResourceRequest =
            serde_json::from_str(r#"{"name":"web","cpu":2,"ram":4096,"type":"t.large"}"#)
                .unwrap();
        assert_eq!(req.kind, ResourceKind::Instance);
        assert_eq!(req.type_code.as_deref(), Some("t.large"));
        assert!(req.max_quantity.is_none());
        assert_eq!(req.min_quantity, 1);
    }

    #[test]
    fn test_check_quantities() {
        let mut req = ResourceRequest::new("web", ResourceKind::Instance, 1.0, 2000.0);
        req.min_quantity = 3;
        req.max_quantity = Some(2);
        assert_eq!(req.check_quantities().unwrap_err().code(), "constraint-violation");
        req.max_quantity = Some(3);
        assert!(req.check_quantities().is_ok());
    }

    #[test]
    fn test_quote_roundtrip_keeps_settings_flat() {
        let json = r#"{"name":"q","location":"eu-west-1","budgets":[{"name":"b","initial_cost":10}],"resources":[]}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.settings.ram_adjusted_rate, 100);
        assert_eq!(quote.settings.find_budget("b").unwrap().initial_cost, 10.0);
    }
}
