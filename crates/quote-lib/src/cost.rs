//! Floating cost model
//!
//! A cost is tracked as a `[min, max]` interval while the final quantity of
//! a resource is not fixed. `unbound` marks a resource without an explicit
//! maximum quantity.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// Decimal places kept by [`round`]
pub const COST_PRECISION: f64 = 1000.0;

/// Round a cost to 3 decimals, half-up
pub fn round(value: f64) -> f64 {
    (value * COST_PRECISION).round() / COST_PRECISION
}

/// Interval cost with CO2 bounds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloatingCost {
    pub min: f64,
    pub max: f64,
    pub initial: f64,
    pub max_initial: f64,
    pub unbound: bool,
    pub min_co2: f64,
    pub max_co2: f64,
}

impl FloatingCost {
    /// A fixed, bounded cost
    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            ..Default::default()
        }
    }

    /// Cost of `min_qty..=max_qty` units, unbound when no maximum is given
    pub fn from_range(
        recurring: f64,
        initial: f64,
        co2: f64,
        min_qty: u32,
        max_qty: Option<u32>,
    ) -> Self {
        let unbound = max_qty.is_none();
        let min_qty = min_qty as f64;
        let max_qty = max_qty.map(|q| q as f64).unwrap_or(min_qty);
        Self {
            min: recurring * min_qty,
            max: recurring * max_qty,
            initial: initial * min_qty,
            max_initial: initial * max_qty,
            unbound,
            min_co2: co2 * min_qty,
            max_co2: co2 * max_qty,
        }
    }

    /// Every numeric field passed through [`round`]
    pub fn round(&self) -> Self {
        Self {
            min: round(self.min),
            max: round(self.max),
            initial: round(self.initial),
            max_initial: round(self.max_initial),
            unbound: self.unbound,
            min_co2: round(self.min_co2),
            max_co2: round(self.max_co2),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.min == 0.0 && self.max == 0.0 && self.initial == 0.0 && self.max_initial == 0.0
    }
}

impl Add for FloatingCost {
    type Output = FloatingCost;

    fn add(self, other: FloatingCost) -> FloatingCost {
        FloatingCost {
            min: self.min + other.min,
            max: self.max + other.max,
            initial: self.initial + other.initial,
            max_initial: self.max_initial + other.max_initial,
            unbound: self.unbound || other.unbound,
            min_co2: self.min_co2 + other.min_co2,
            max_co2: self.max_co2 + other.max_co2,
        }
    }
}

impl AddAssign for FloatingCost {
    fn add_assign(&mut self, other: FloatingCost) {
        *self = *self + other;
    }
}

/// Component-wise difference. The result is a delta: its `unbound` flag is
/// meaningless and always false.
impl Sub for FloatingCost {
    type Output = FloatingCost;

    fn sub(self, other: FloatingCost) -> FloatingCost {
        FloatingCost {
            min: self.min - other.min,
            max: self.max - other.max,
            initial: self.initial - other.initial,
            max_initial: self.max_initial - other.max_initial,
            unbound: false,
            min_co2: self.min_co2 - other.min_co2,
            max_co2: self.max_co2 - other.max_co2,
        }
    }
}

/// Aggregate cost of a quote.
///
/// Unboundness cannot be recovered from deltas, so the aggregate counts its
/// unbound parts instead.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteTotal {
    pub cost: FloatingCost,
    pub unbound_count: u32,
}

impl QuoteTotal {
    /// Apply `new - old` for one resource
    pub fn apply_delta(&mut self, old: &FloatingCost, new: &FloatingCost) {
        let delta = *new - *old;
        self.cost = (self.cost + delta).round();

        match (old.unbound, new.unbound) {
            (false, true) => self.unbound_count += 1,
            (true, false) => self.unbound_count = self.unbound_count.saturating_sub(1),
            _ => {}
        }
        self.cost.unbound = self.unbound_count > 0;
    }

    pub fn is_unbound(&self) -> bool {
        self.unbound_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(min: f64, max: f64, unbound: bool) -> FloatingCost {
        FloatingCost {
            min,
            max,
            initial: min / 2.0,
            max_initial: max / 2.0,
            unbound,
            min_co2: 1.0,
            max_co2: 2.0,
        }
    }

    #[test]
    fn test_fixed() {
        let cost = FloatingCost::fixed(12.5);
        assert_eq!(cost.min, 12.5);
        assert_eq!(cost.max, 12.5);
        assert!(!cost.unbound);
    }

    #[test]
    fn test_from_range_bounded() {
        let cost = FloatingCost::from_range(10.0, 100.0, 2.0, 2, Some(5));
        assert_eq!(cost.min, 20.0);
        assert_eq!(cost.max, 50.0);
        assert_eq!(cost.initial, 200.0);
        assert_eq!(cost.max_initial, 500.0);
        assert_eq!(cost.min_co2, 4.0);
        assert_eq!(cost.max_co2, 10.0);
        assert!(!cost.unbound);
    }

    #[test]
    fn test_from_range_without_max_is_unbound() {
        let cost = FloatingCost::from_range(10.0, 0.0, 0.0, 3, None);
        assert_eq!(cost.min, 30.0);
        assert_eq!(cost.max, 30.0);
        assert!(cost.unbound);
    }

    #[test]
    fn test_add_is_component_wise() {
        let a = sample(1.0, 2.0, false);
        let b = sample(10.0, 30.0, true);
        let sum = a + b;
        assert_eq!(sum.min, a.min + b.min);
        assert_eq!(sum.max, a.max + b.max);
        assert_eq!(sum.initial, a.initial + b.initial);
        assert_eq!(sum.max_co2, a.max_co2 + b.max_co2);
        assert!(sum.unbound);
        assert!(!(a + a).unbound);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round(2.0625), 2.063);
        assert_eq!(round(0.0625), 0.063);
        assert_eq!(round(2.1234), 2.123);
        assert_eq!(round(0.0), 0.0);
    }

    #[test]
    fn test_round_is_stable() {
        for x in [0.1234567, 1.0005, 2982.4449, 5139.2, 1.0 / 3.0, 168.0, 99999.9995] {
            assert_eq!(round(round(x)), round(x), "unstable for {}", x);
        }
    }

    #[test]
    fn test_total_tracks_unbound_parts() {
        let mut total = QuoteTotal::default();
        let unbound = sample(10.0, 10.0, true);
        let bounded = sample(5.0, 8.0, false);

        total.apply_delta(&FloatingCost::default(), &unbound);
        total.apply_delta(&FloatingCost::default(), &bounded);
        assert!(total.is_unbound());
        assert_eq!(total.cost.min, 15.0);
        assert_eq!(total.cost.max, 18.0);

        // The unbound resource gets a maximum
        let now_bounded = sample(10.0, 20.0, false);
        total.apply_delta(&unbound, &now_bounded);
        assert!(!total.is_unbound());
        assert!(!total.cost.unbound);
        assert_eq!(total.cost.max, 28.0);
    }
}
