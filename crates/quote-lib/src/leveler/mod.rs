//! Budget leveler
//!
//! Resources sharing a prepaid budget compete for its one-time cost. Each
//! pass looks every member up twice, with and without the budget, then
//! upgrades the members with the best savings per unit of initial cost to
//! their committed price while the budget allows it.

mod allocator;
mod locks;

#[cfg(test)]
mod tests;

pub use allocator::{allocate, Allocation, LevelingItem};
pub use locks::BudgetLocks;

use crate::catalog::CatalogRepository;
use crate::cost::FloatingCost;
use crate::error::{EntityKind, QuoteError, Result};
use crate::lookup::{
    effective_budget, lookup_all, LookupContext, LookupEngine, LookupJob, LookupResult, WorkerPool,
};
use crate::models::{QuoteResource, ResourceId, ResourceRequest};
use crate::observability::{EngineMetrics, QuoteLogger};
use crate::store::QuoteStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Price kept for one resource by a leveling pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub resource: ResourceId,
    pub name: String,
    pub price: String,
    pub cost: FloatingCost,
    /// Upgraded to its committed price
    pub committed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelingOutcome {
    /// `None` for the resources without a budget
    pub budget: Option<String>,
    pub capacity: f64,
    pub remaining_budget: f64,
    pub assignments: Vec<Assignment>,
    pub leveled_at: DateTime<Utc>,
}

impl LevelingOutcome {
    pub fn committed_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.committed).count()
    }
}

/// The two alternatives of one member
struct Alternatives {
    resource: QuoteResource,
    committed: LookupResult,
    fallback: LookupResult,
}

impl Alternatives {
    fn item(&self) -> Option<LevelingItem> {
        if self.committed.price_code() == self.fallback.price_code() {
            return None;
        }
        Some(LevelingItem {
            id: self.resource.id,
            size: self.committed.cost.initial,
            savings: self.fallback.cost.min - self.committed.cost.min,
        })
    }
}

/// Re-levels budget groups after the changes that affect them.
///
/// Passes on one budget are serialized; passes on different budgets run
/// concurrently.
#[derive(Clone)]
pub struct BudgetLeveler {
    engine: Arc<LookupEngine>,
    catalog: Arc<dyn CatalogRepository>,
    store: Arc<dyn QuoteStore>,
    locks: Arc<BudgetLocks>,
    pool: WorkerPool,
    metrics: EngineMetrics,
    logger: QuoteLogger,
}

impl BudgetLeveler {
    pub fn new(
        engine: Arc<LookupEngine>,
        catalog: Arc<dyn CatalogRepository>,
        store: Arc<dyn QuoteStore>,
    ) -> Self {
        Self {
            engine,
            catalog,
            store,
            locks: Arc::new(BudgetLocks::new()),
            pool: WorkerPool::default(),
            metrics: EngineMetrics::new(),
            logger: QuoteLogger::new(""),
        }
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_logger(mut self, logger: QuoteLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Level one budget group, `None` being the resources without a budget.
    ///
    /// Members are persisted in id order. A failing member stops the pass;
    /// members persisted before it keep their new price and the remaining
    /// budget reflects them.
    pub async fn level(&self, budget: Option<&str>) -> Result<LevelingOutcome> {
        let _guard = self.locks.acquire(budget).await;
        let started = Instant::now();

        let settings = self.store.settings().await?;
        let capacity = match budget {
            Some(name) => {
                settings
                    .find_budget(name)
                    .ok_or_else(|| QuoteError::not_found(EntityKind::Budget, name))?
                    .initial_cost
            }
            None => 0.0,
        };
        let members = self.store.members(budget).await?;
        debug!(budget = ?budget, capacity, members = members.len(), "Leveling budget");

        let mut jobs = Vec::with_capacity(members.len() * 2);
        let mut contexts = Vec::with_capacity(members.len());
        for member in &members {
            contexts.push(LookupContext::resolve(&settings, &member.request));
        }
        // A member whose context fails gets no jobs; its error surfaces in
        // member order below
        for (member, ctx) in members.iter().zip(&contexts) {
            if let Ok(ctx) = ctx {
                jobs.push(LookupJob {
                    context: ctx.clone().with_available_initial_cost(capacity),
                    request: member.request.clone(),
                });
                jobs.push(LookupJob {
                    context: ctx.clone().with_available_initial_cost(0.0),
                    request: member.request.clone(),
                });
            }
        }
        let mut results =
            lookup_all(self.engine.clone(), self.catalog.clone(), jobs, self.pool).await.into_iter();

        let mut alternatives = Vec::with_capacity(members.len());
        let mut failure = None;
        for (member, ctx) in members.into_iter().zip(contexts) {
            let outcome = ctx.and_then(|_| {
                let committed = results.next().unwrap_or_else(|| Err(missing_result()));
                let fallback = results.next().unwrap_or_else(|| Err(missing_result()));
                Ok((committed?, fallback?))
            });
            match outcome {
                Ok((committed, fallback)) => alternatives.push(Alternatives {
                    resource: member,
                    committed,
                    fallback,
                }),
                Err(e) => {
                    failure = Some((member.request.name.clone(), e));
                    break;
                }
            }
        }

        let items: Vec<LevelingItem> = alternatives.iter().filter_map(Alternatives::item).collect();
        let allocation = allocate(&items, capacity);

        let mut assignments = Vec::with_capacity(alternatives.len());
        for alt in alternatives {
            let committed = allocation.contains(alt.resource.id);
            let chosen = if committed { alt.committed } else { alt.fallback };
            self.store
                .persist(alt.resource.id, chosen.price_code(), chosen.cost)
                .await?;
            assignments.push(Assignment {
                resource: alt.resource.id,
                name: alt.resource.request.name,
                price: chosen.price_code().to_string(),
                cost: chosen.cost,
                committed,
            });
        }

        let remaining = allocation.remaining;
        if let Some(name) = budget {
            self.store.set_remaining_budget(name, remaining).await?;
        }

        if let Some((name, e)) = failure {
            warn!(budget = ?budget, resource = %name, error = %e, "Leveling pass aborted");
            return Err(e);
        }

        let outcome = LevelingOutcome {
            budget: budget.map(String::from),
            capacity,
            remaining_budget: remaining,
            assignments,
            leveled_at: Utc::now(),
        };
        let committed = outcome.committed_count();
        let demoted = items
            .iter()
            .filter(|item| item.savings > 0.0 && !allocation.contains(item.id))
            .count();
        let label = budget.unwrap_or("default");
        if demoted > 0 && capacity > 0.0 {
            self.logger.log_overcommitted(label, capacity, demoted);
        }
        self.logger
            .log_leveled(label, capacity, remaining, committed, outcome.assignments.len());
        self.metrics
            .observe_leveling(started.elapsed().as_secs_f64(), committed);
        Ok(outcome)
    }

    /// The cap of a budget changed
    pub async fn on_budget_cost_changed(
        &self,
        budget: &str,
        initial_cost: f64,
    ) -> Result<LevelingOutcome> {
        self.store.set_budget_cost(budget, initial_cost).await?;
        self.level(Some(budget)).await
    }

    /// A resource moved to another budget, or to none.
    /// Levels the group it left, then the group it joined.
    pub async fn on_membership_changed(
        &self,
        id: ResourceId,
        budget: Option<String>,
    ) -> Result<Vec<LevelingOutcome>> {
        let before = self.group_of(id).await?;
        self.store.assign_budget(id, budget).await?;
        let after = self.group_of(id).await?;

        let mut outcomes = vec![self.level(before.as_deref()).await?];
        if after != before {
            outcomes.push(self.level(after.as_deref()).await?);
        }
        Ok(outcomes)
    }

    /// The requested shape of a resource changed.
    ///
    /// A request the catalog cannot serve is rejected before it is stored.
    pub async fn on_resource_changed(
        &self,
        id: ResourceId,
        request: ResourceRequest,
    ) -> Result<LevelingOutcome> {
        let before = self.group_of(id).await?;
        self.check_request(&request).await?;
        self.store.update_request(id, request).await?;
        let after = self.group_of(id).await?;
        if after != before {
            self.level(before.as_deref()).await?;
        }
        self.level(after.as_deref()).await
    }

    /// A budget was deleted: its members fall back to the quote's default
    /// group, which is leveled exactly once.
    pub async fn on_budget_deleted(&self, budget: &str) -> Result<LevelingOutcome> {
        let moved = self.store.delete_budget(budget).await?;
        self.locks.forget(budget);
        debug!(budget = %budget, moved = moved.len(), "Budget deleted");
        let default_group = self.store.settings().await?.budget;
        self.level(default_group.as_deref()).await
    }

    /// Level every budget group of the quote, concurrently across budgets.
    /// Outcomes are ordered by budget name, the default group first.
    pub async fn refresh_all(&self) -> Result<Vec<LevelingOutcome>> {
        let settings = self.store.settings().await?;
        let mut groups: Vec<Option<String>> = vec![None];
        groups.extend(settings.budgets.iter().map(|b| Some(b.name.clone())));

        let mut tasks = JoinSet::new();
        for group in groups {
            let leveler = self.clone();
            tasks.spawn(async move { leveler.level(group.as_deref()).await });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| QuoteError::Task(e.to_string()))??;
            outcomes.push(outcome);
        }
        outcomes.sort_by(|a, b| a.budget.cmp(&b.budget));
        Ok(outcomes)
    }

    /// Both alternatives a pass computes, with and without the budget,
    /// must exist for `request`
    async fn check_request(&self, request: &ResourceRequest) -> Result<()> {
        request.check_quantities()?;
        let settings = self.store.settings().await?;
        let ctx = LookupContext::resolve(&settings, request)?;
        let capacity = ctx.budget.initial_cost;
        let jobs = vec![
            LookupJob {
                context: ctx.clone().with_available_initial_cost(capacity),
                request: request.clone(),
            },
            LookupJob {
                context: ctx.with_available_initial_cost(0.0),
                request: request.clone(),
            },
        ];
        let results = lookup_all(
            self.engine.clone(),
            self.catalog.clone(),
            jobs,
            WorkerPool::SEQUENTIAL,
        )
        .await;
        for result in results {
            result?;
        }
        Ok(())
    }

    async fn group_of(&self, id: ResourceId) -> Result<Option<String>> {
        let settings = self.store.settings().await?;
        let resource = self.store.resource(id).await?;
        Ok(effective_budget(&settings, &resource.request).map(String::from))
    }
}

fn missing_result() -> QuoteError {
    QuoteError::Task("batch lookup returned fewer results than jobs".into())
}
