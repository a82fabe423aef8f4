//! Per-kind behaviour injected into the lookup engine

use crate::catalog::{CatalogPrice, CustomAxis, CustomPricing};
use crate::models::{Os, ResourceKind, ResourceRequest};
use std::collections::HashMap;
use std::sync::Arc;

/// Elastic axis of a custom type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Cpu,
    Gpu,
    Ram,
}

impl Axis {
    /// Requested units per billable unit (RAM is requested in MB, billed in GB)
    pub fn weight(&self) -> f64 {
        match self {
            Axis::Ram => 1024.0,
            Axis::Cpu | Axis::Gpu => 1.0,
        }
    }
}

/// Pricing or emission coefficient of one axis
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCoefficient {
    pub axis: Axis,
    pub minimum: f64,
    pub increment: f64,
    /// Cost or CO2 per billable unit
    pub per_unit: f64,
    pub curve: Option<String>,
}

impl AxisCoefficient {
    fn cost(axis: Axis, pricing: &CustomAxis) -> Self {
        Self {
            axis,
            minimum: pricing.minimum,
            increment: pricing.increment,
            per_unit: pricing.unit_cost,
            curve: None,
        }
    }

    fn co2(axis: Axis, pricing: &CustomAxis) -> Self {
        Self {
            axis,
            minimum: pricing.minimum,
            increment: pricing.increment,
            per_unit: pricing.co2,
            curve: pricing.co2_curve.clone(),
        }
    }
}

/// What differs between resource kinds sharing one lookup algorithm
pub trait KindCapability: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// The price serves the requested OS or database engine
    fn matches_os_or_engine(&self, price: &CatalogPrice, request: &ResourceRequest) -> bool;

    /// Axes of a custom type billed per unit
    fn custom_cost_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient>;

    /// Axes of a custom type emitting CO2 per unit
    fn co2_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient>;

    /// OS convertibility of the usage applies to this kind
    fn honors_os_convertibility(&self) -> bool {
        false
    }

    /// Engine convertibility of the usage applies to this kind
    fn honors_engine_convertibility(&self) -> bool {
        false
    }
}

fn collect(
    custom: &CustomPricing,
    axes: &[Axis],
    build: fn(Axis, &CustomAxis) -> AxisCoefficient,
) -> Vec<AxisCoefficient> {
    axes.iter()
        .filter_map(|axis| {
            let pricing = match axis {
                Axis::Cpu => custom.cpu.as_ref(),
                Axis::Gpu => custom.gpu.as_ref(),
                Axis::Ram => custom.ram.as_ref(),
            };
            pricing.map(|p| build(*axis, p))
        })
        .collect()
}

const ALL_AXES: &[Axis] = &[Axis::Cpu, Axis::Gpu, Axis::Ram];
const CPU_RAM: &[Axis] = &[Axis::Cpu, Axis::Ram];

/// Instances and containers: matched on OS
pub struct VmCapability {
    kind: ResourceKind,
}

impl VmCapability {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }
}

impl KindCapability for VmCapability {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn matches_os_or_engine(&self, price: &CatalogPrice, request: &ResourceRequest) -> bool {
        let requested = request.os.unwrap_or(Os::Linux);
        price.os.map_or(true, |os| os == requested)
    }

    fn custom_cost_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient> {
        collect(custom, ALL_AXES, AxisCoefficient::cost)
    }

    fn co2_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient> {
        collect(custom, ALL_AXES, AxisCoefficient::co2)
    }

    fn honors_os_convertibility(&self) -> bool {
        true
    }
}

/// Databases: matched on engine and edition
pub struct DatabaseCapability;

impl KindCapability for DatabaseCapability {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Database
    }

    fn matches_os_or_engine(&self, price: &CatalogPrice, request: &ResourceRequest) -> bool {
        let engine_ok = match (&request.engine, &price.engine) {
            (Some(wanted), Some(offered)) => wanted.eq_ignore_ascii_case(offered),
            (Some(_), None) => false,
            (None, _) => true,
        };
        let edition_ok = match (&request.edition, &price.edition) {
            (Some(wanted), Some(offered)) => wanted.eq_ignore_ascii_case(offered),
            (Some(_), None) => false,
            (None, _) => true,
        };
        engine_ok && edition_ok
    }

    fn custom_cost_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient> {
        collect(custom, CPU_RAM, AxisCoefficient::cost)
    }

    fn co2_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient> {
        collect(custom, CPU_RAM, AxisCoefficient::co2)
    }

    fn honors_engine_convertibility(&self) -> bool {
        true
    }
}

/// Functions: OS agnostic, billed on CPU and RAM
pub struct FunctionCapability;

impl KindCapability for FunctionCapability {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Function
    }

    fn matches_os_or_engine(&self, _price: &CatalogPrice, _request: &ResourceRequest) -> bool {
        true
    }

    fn custom_cost_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient> {
        collect(custom, CPU_RAM, AxisCoefficient::cost)
    }

    fn co2_coefficients(&self, custom: &CustomPricing) -> Vec<AxisCoefficient> {
        collect(custom, CPU_RAM, AxisCoefficient::co2)
    }
}

/// Capability registry keyed by resource kind
#[derive(Clone)]
pub struct Capabilities {
    by_kind: HashMap<ResourceKind, Arc<dyn KindCapability>>,
}

impl Capabilities {
    /// One capability per built-in kind
    pub fn standard() -> Self {
        Self::empty()
            .with(Arc::new(VmCapability::new(ResourceKind::Instance)))
            .with(Arc::new(VmCapability::new(ResourceKind::Container)))
            .with(Arc::new(DatabaseCapability))
            .with(Arc::new(FunctionCapability))
    }

    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }

    /// Register or replace the capability of its kind
    pub fn with(mut self, capability: Arc<dyn KindCapability>) -> Self {
        self.by_kind.insert(capability.kind(), capability);
        self
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn KindCapability>> {
        self.by_kind.get(&kind)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_vm_defaults_to_linux() {
        let vm = VmCapability::new(ResourceKind::Instance);
        let linux = testing::price("p", "t", "od", "l", 1.0);
        let windows = CatalogPrice {
            os: Some(Os::Windows),
            ..linux.clone()
        };
        let req = testing::request("web", 1.0, 1.0);
        assert!(vm.matches_os_or_engine(&linux, &req));
        assert!(!vm.matches_os_or_engine(&windows, &req));

        let win_req = ResourceRequest {
            os: Some(Os::Windows),
            ..req
        };
        assert!(vm.matches_os_or_engine(&windows, &win_req));
    }

    #[test]
    fn test_database_engine_case_insensitive() {
        let db = DatabaseCapability;
        let price = CatalogPrice {
            engine: Some("MYSQL".into()),
            ..testing::price("p", "t", "od", "l", 1.0)
        };
        let mut req = ResourceRequest::new("db", ResourceKind::Database, 1.0, 1.0);
        req.engine = Some("mysql".into());
        assert!(db.matches_os_or_engine(&price, &req));
        req.engine = Some("oracle".into());
        assert!(!db.matches_os_or_engine(&price, &req));
        req.engine = Some("mysql".into());
        req.edition = Some("enterprise".into());
        assert!(!db.matches_os_or_engine(&price, &req));
    }

    #[test]
    fn test_function_bills_cpu_and_ram_only() {
        let custom = CustomPricing {
            cpu: Some(testing::axis(1.0, 0.0, 1.0)),
            gpu: Some(testing::axis(9.0, 0.0, 1.0)),
            ram: Some(testing::axis(2.0, 0.0, 1.0)),
        };
        let axes: Vec<Axis> = FunctionCapability
            .custom_cost_coefficients(&custom)
            .iter()
            .map(|c| c.axis)
            .collect();
        assert_eq!(axes, vec![Axis::Cpu, Axis::Ram]);
        assert_eq!(
            VmCapability::new(ResourceKind::Instance)
                .custom_cost_coefficients(&custom)
                .len(),
            3
        );
    }

    #[test]
    fn test_registry_covers_all_kinds() {
        let caps = Capabilities::standard();
        for kind in [
            ResourceKind::Instance,
            ResourceKind::Database,
            ResourceKind::Container,
            ResourceKind::Function,
        ] {
            assert_eq!(caps.get(kind).unwrap().kind(), kind);
        }
    }
}
