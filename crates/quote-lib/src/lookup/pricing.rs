//! Cost and CO2 of a catalog candidate for a requested shape

use super::capability::{Axis, AxisCoefficient, KindCapability};
use crate::catalog::{CatalogPrice, PriceCandidate};
use crate::cost::FloatingCost;
use crate::workload::Workload;
use serde::Serialize;

/// Requested amounts of the elastic axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub cpu: f64,
    /// MB, already adjusted by the quote RAM rate
    pub ram: f64,
    pub gpu: f64,
}

impl Shape {
    fn requested(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Cpu => self.cpu,
            Axis::Gpu => self.gpu,
            Axis::Ram => self.ram,
        }
    }
}

/// Scored catalog offer, per unit of quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPrice {
    pub price: CatalogPrice,
    /// Committed months of the term, 0 for on-demand
    pub term_period: f64,
    /// Recurring monthly cost after the usage rate
    pub unit_cost: f64,
    pub unit_initial: f64,
    /// Ranking cost: recurring plus the initial cost spread over the term
    pub total_cost: f64,
    pub co2: f64,
}

impl ScoredPrice {
    pub fn floating_cost(&self, min_qty: u32, max_qty: Option<u32>) -> FloatingCost {
        FloatingCost::from_range(self.unit_cost, self.unit_initial, self.co2, min_qty, max_qty)
            .round()
    }

    pub fn is_committed(&self) -> bool {
        self.term_period > 0.0
    }
}

/// Units billed for `requested` on one axis:
/// `ceil(max(ceil(requested / weight), minimum) / increment) * increment`
pub fn billable_quantity(requested: f64, weight: f64, minimum: f64, increment: f64) -> f64 {
    let units = (requested.max(0.0) / weight).ceil().max(minimum);
    if increment > 0.0 {
        (units / increment).ceil() * increment
    } else {
        units
    }
}

fn billable(coefficient: &AxisCoefficient, shape: &Shape) -> f64 {
    billable_quantity(
        shape.requested(coefficient.axis),
        coefficient.axis.weight(),
        coefficient.minimum,
        coefficient.increment,
    )
}

/// Monthly cost of the elastic axes of a custom type
pub fn custom_cost(coefficients: &[AxisCoefficient], shape: &Shape) -> f64 {
    coefficients
        .iter()
        .map(|c| billable(c, shape) * c.per_unit)
        .sum()
}

/// Monthly CO2 of a price: flat value weighted by the workload, plus the
/// per-unit emissions of custom axes
pub fn co2(
    price: &CatalogPrice,
    capability: &dyn KindCapability,
    shape: &Shape,
    workload: &Workload,
) -> f64 {
    let base = workload.interpolate(price.co2, price.co2_curve.as_deref());
    let axes: f64 = price
        .custom
        .as_ref()
        .map(|custom| {
            capability
                .co2_coefficients(custom)
                .iter()
                .map(|c| workload.interpolate(c.per_unit, c.curve.as_deref()) * billable(c, shape))
                .sum()
        })
        .unwrap_or(0.0);
    base + axes
}

/// Score a candidate. On-demand terms are charged for the usage `rate`
/// (0..=1) only; committed terms are charged in full.
pub fn score(
    candidate: PriceCandidate,
    capability: &dyn KindCapability,
    shape: &Shape,
    rate: f64,
    workload: &Workload,
) -> ScoredPrice {
    let PriceCandidate { price, term, .. } = candidate;

    let elastic = price
        .custom
        .as_ref()
        .map(|custom| custom_cost(&capability.custom_cost_coefficients(custom), shape))
        .unwrap_or(0.0);
    let recurring = price.cost + elastic;
    let unit_cost = if term.is_on_demand() {
        recurring * rate
    } else {
        recurring
    };
    let amortized = if term.is_on_demand() {
        price.initial_cost
    } else {
        price.initial_cost / term.period
    };
    let co2 = co2(&price, capability, shape, workload);

    ScoredPrice {
        unit_initial: price.initial_cost,
        term_period: term.period.max(0.0),
        unit_cost,
        total_cost: unit_cost + amortized,
        co2,
        price,
    }
}
