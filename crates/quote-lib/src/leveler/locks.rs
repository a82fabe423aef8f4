//! One writer per budget group

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Key of the group of resources without a budget
const DEFAULT_GROUP: &str = "";

#[derive(Default)]
pub struct BudgetLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BudgetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a budget group
    pub async fn acquire(&self, budget: Option<&str>) -> OwnedMutexGuard<()> {
        let key = budget.unwrap_or(DEFAULT_GROUP).to_string();
        // Clone the mutex out so the map shard is not held while waiting
        let lock = self.locks.entry(key).or_default().clone();
        lock.lock_owned().await
    }

    pub fn forget(&self, budget: &str) {
        self.locks.remove(budget);
    }
}
