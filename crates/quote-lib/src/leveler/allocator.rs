//! Greedy allocation of a prepaid budget
//!
//! Items are taken by decreasing savings per unit of initial cost while they
//! still fit. This is a heuristic: it never exceeds the capacity, but it may
//! miss the best subset.

use crate::models::ResourceId;

/// A resource that may be upgraded to its committed price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelingItem {
    pub id: ResourceId,
    /// Initial cost of the committed price
    pub size: f64,
    /// Monthly savings of the committed price over the no-commitment one
    pub savings: f64,
}

impl LevelingItem {
    fn density(&self) -> f64 {
        if self.size <= 0.0 {
            f64::INFINITY
        } else {
            self.savings / self.size
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    /// Upgraded resources, in selection order
    pub selected: Vec<ResourceId>,
    pub used: f64,
    pub remaining: f64,
}

impl Allocation {
    pub fn contains(&self, id: ResourceId) -> bool {
        self.selected.contains(&id)
    }
}

const EPSILON: f64 = 1e-9;

pub fn allocate(items: &[LevelingItem], capacity: f64) -> Allocation {
    let capacity = capacity.max(0.0);
    let mut candidates: Vec<&LevelingItem> = items
        .iter()
        .filter(|item| item.savings > 0.0 && item.size <= capacity + EPSILON)
        .collect();
    candidates.sort_by(|a, b| {
        b.density()
            .total_cmp(&a.density())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut allocation = Allocation::default();
    for item in candidates {
        let size = item.size.max(0.0);
        if allocation.used + size <= capacity + EPSILON {
            allocation.used += size;
            allocation.selected.push(item.id);
        }
    }
    allocation.remaining = (capacity - allocation.used).max(0.0);
    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ResourceId, size: f64, savings: f64) -> LevelingItem {
        LevelingItem { id, size, savings }
    }

    #[test]
    fn test_everything_fits() {
        let items = [item(1, 1500.0, 150.0), item(2, 1500.0, 150.0)];
        let allocation = allocate(&items, 6325.0);
        assert_eq!(allocation.selected, vec![1, 2]);
        assert_eq!(allocation.used, 3000.0);
        assert_eq!(allocation.remaining, 3325.0);
    }

    #[test]
    fn test_densest_first() {
        // 2 saves more per unit of initial cost than 1
        let items = [item(1, 1000.0, 100.0), item(2, 500.0, 80.0), item(3, 600.0, 30.0)];
        let allocation = allocate(&items, 1200.0);
        assert_eq!(allocation.selected, vec![2, 3]);
        assert!(!allocation.contains(1));
    }

    #[test]
    fn test_nothing_fits() {
        let items = [item(1, 1500.0, 150.0)];
        let allocation = allocate(&items, 1228.0);
        assert!(allocation.selected.is_empty());
        assert_eq!(allocation.remaining, 1228.0);
    }

    #[test]
    fn test_no_savings_no_upgrade() {
        let items = [item(1, 10.0, 0.0), item(2, 10.0, -5.0), item(3, 0.0, 1.0)];
        let allocation = allocate(&items, 100.0);
        assert_eq!(allocation.selected, vec![3]);
        assert_eq!(allocation.used, 0.0);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let items: Vec<LevelingItem> = (0..40)
            .map(|i| item(i, 37.0 + (i * 13 % 29) as f64, 1.0 + (i * 7 % 11) as f64))
            .collect();
        for capacity in [0.0, 50.0, 333.0, 1000.0, 5000.0] {
            let allocation = allocate(&items, capacity);
            let used: f64 = items
                .iter()
                .filter(|i| allocation.contains(i.id))
                .map(|i| i.size)
                .sum();
            assert!(used <= capacity, "{} > {}", used, capacity);
            assert_eq!(used, allocation.used);
        }
    }
}
