//! Quote persistence collaborator
//!
//! The leveler reads resources and writes back their resolved price and
//! cost through [`QuoteStore`]. Every cost write also moves the quote
//! aggregate by `new - old`, atomically per resource.

use crate::cost::{FloatingCost, QuoteTotal};
use crate::error::{EntityKind, QuoteError, Result};
use crate::lookup::effective_budget;
use crate::models::{Quote, QuoteResource, QuoteSettings, ResourceId, ResourceRequest};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn settings(&self) -> Result<QuoteSettings>;

    /// Resources whose effective budget is `budget`; `None` is the default group
    async fn members(&self, budget: Option<&str>) -> Result<Vec<QuoteResource>>;

    async fn resource(&self, id: ResourceId) -> Result<QuoteResource>;

    /// Store the resolved price and cost of a resource and apply the cost
    /// delta to the quote total. Returns the previous cost.
    async fn persist(&self, id: ResourceId, price: &str, cost: FloatingCost)
        -> Result<FloatingCost>;

    async fn set_remaining_budget(&self, budget: &str, remaining: f64) -> Result<()>;

    /// Change the cap of a budget, clearing its stale remainder
    async fn set_budget_cost(&self, budget: &str, initial_cost: f64) -> Result<()>;

    async fn assign_budget(&self, id: ResourceId, budget: Option<String>) -> Result<()>;

    async fn update_request(&self, id: ResourceId, request: ResourceRequest) -> Result<()>;

    /// Remove a budget and move its resources to the default budget.
    /// Returns the moved resources.
    async fn delete_budget(&self, budget: &str) -> Result<Vec<ResourceId>>;

    async fn total(&self) -> Result<QuoteTotal>;
}

/// In-memory quote store
pub struct QuoteLedger {
    settings: RwLock<QuoteSettings>,
    resources: DashMap<ResourceId, QuoteResource>,
    total: Mutex<QuoteTotal>,
}

impl QuoteLedger {
    pub fn from_quote(quote: Quote) -> Self {
        let mut total = QuoteTotal::default();
        let resources = DashMap::new();
        for resource in quote.resources {
            total.apply_delta(&FloatingCost::default(), &resource.cost);
            resources.insert(resource.id, resource);
        }
        Self {
            settings: RwLock::new(quote.settings),
            resources,
            total: Mutex::new(total),
        }
    }

    /// Current state of the whole quote, resources ordered by id
    pub async fn snapshot(&self) -> Quote {
        let mut resources: Vec<QuoteResource> =
            self.resources.iter().map(|r| r.value().clone()).collect();
        resources.sort_by_key(|r| r.id);
        Quote {
            settings: self.settings.read().await.clone(),
            resources,
        }
    }

    fn missing(id: ResourceId) -> QuoteError {
        QuoteError::not_found(EntityKind::Resource, id.to_string())
    }
}

#[async_trait]
impl QuoteStore for QuoteLedger {
    async fn settings(&self) -> Result<QuoteSettings> {
        Ok(self.settings.read().await.clone())
    }

    async fn members(&self, budget: Option<&str>) -> Result<Vec<QuoteResource>> {
        let settings = self.settings.read().await;
        let mut members: Vec<QuoteResource> = self
            .resources
            .iter()
            .filter(|r| effective_budget(&settings, &r.request) == budget)
            .map(|r| r.value().clone())
            .collect();
        members.sort_by_key(|r| r.id);
        Ok(members)
    }

    async fn resource(&self, id: ResourceId) -> Result<QuoteResource> {
        self.resources
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Self::missing(id))
    }

    async fn persist(
        &self,
        id: ResourceId,
        price: &str,
        cost: FloatingCost,
    ) -> Result<FloatingCost> {
        // The entry guard serializes writers of this resource only
        let mut entry = self.resources.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        let old = entry.cost;
        {
            let mut total = self
                .total
                .lock()
                .map_err(|e| QuoteError::Store(format!("quote total lock poisoned: {}", e)))?;
            total.apply_delta(&old, &cost);
        }
        entry.price = Some(price.to_string());
        entry.cost = cost;
        debug!(resource = id, price = %price, min = cost.min, max = cost.max, "Persisted resource cost");
        Ok(old)
    }

    async fn set_remaining_budget(&self, budget: &str, remaining: f64) -> Result<()> {
        let mut settings = self.settings.write().await;
        let entry = settings
            .find_budget_mut(budget)
            .ok_or_else(|| QuoteError::not_found(EntityKind::Budget, budget))?;
        entry.remaining_budget = Some(remaining);
        Ok(())
    }

    async fn set_budget_cost(&self, budget: &str, initial_cost: f64) -> Result<()> {
        let mut settings = self.settings.write().await;
        let entry = settings
            .find_budget_mut(budget)
            .ok_or_else(|| QuoteError::not_found(EntityKind::Budget, budget))?;
        entry.initial_cost = initial_cost;
        entry.remaining_budget = None;
        Ok(())
    }

    async fn assign_budget(&self, id: ResourceId, budget: Option<String>) -> Result<()> {
        if let Some(name) = budget.as_deref() {
            if self.settings.read().await.find_budget(name).is_none() {
                return Err(QuoteError::not_found(EntityKind::Budget, name));
            }
        }
        let mut entry = self.resources.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        entry.request.budget = budget;
        Ok(())
    }

    async fn update_request(&self, id: ResourceId, request: ResourceRequest) -> Result<()> {
        let mut entry = self.resources.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        entry.request = request;
        Ok(())
    }

    async fn delete_budget(&self, budget: &str) -> Result<Vec<ResourceId>> {
        let mut settings = self.settings.write().await;
        let before = settings.budgets.len();
        settings.budgets.retain(|b| b.name != budget);
        if settings.budgets.len() == before {
            return Err(QuoteError::not_found(EntityKind::Budget, budget));
        }
        if settings.budget.as_deref() == Some(budget) {
            settings.budget = None;
        }

        let mut moved = Vec::new();
        for mut entry in self.resources.iter_mut() {
            if entry.request.budget.as_deref() == Some(budget) {
                entry.request.budget = None;
                moved.push(entry.id);
            }
        }
        moved.sort_unstable();
        Ok(moved)
    }

    async fn total(&self) -> Result<QuoteTotal> {
        self.total
            .lock()
            .map(|t| *t)
            .map_err(|e| QuoteError::Store(format!("quote total lock poisoned: {}", e)))
    }
}
