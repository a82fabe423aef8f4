//! Batch lookups across a bounded worker pool

use super::context::LookupContext;
use super::engine::{LookupEngine, LookupResult};
use crate::catalog::CatalogRepository;
use crate::error::{QuoteError, Result};
use crate::models::ResourceRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Number of lookups allowed to run at once; 1 runs them in order on the
/// calling task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPool {
    pub workers: usize,
}

impl WorkerPool {
    pub const SEQUENTIAL: WorkerPool = WorkerPool { workers: 1 };

    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn is_sequential(&self) -> bool {
        self.workers <= 1
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::SEQUENTIAL
    }
}

/// One resource to look up
#[derive(Debug, Clone)]
pub struct LookupJob {
    pub context: LookupContext,
    pub request: ResourceRequest,
}

/// Look up every job, returning results in job order.
///
/// A failing job does not stop the others.
pub async fn lookup_all(
    engine: Arc<LookupEngine>,
    catalog: Arc<dyn CatalogRepository>,
    jobs: Vec<LookupJob>,
    pool: WorkerPool,
) -> Vec<Result<LookupResult>> {
    if pool.is_sequential() {
        return jobs
            .iter()
            .map(|job| engine.lookup(catalog.as_ref(), &job.context, &job.request))
            .collect();
    }

    debug!(jobs = jobs.len(), workers = pool.workers, "Running batch lookup");
    let count = jobs.len();
    let semaphore = Arc::new(Semaphore::new(pool.workers));
    let mut tasks = JoinSet::new();

    for (index, job) in jobs.into_iter().enumerate() {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                return vec![Err(QuoteError::Task(e.to_string())); count];
            }
        };
        let engine = engine.clone();
        let catalog = catalog.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            (
                index,
                engine.lookup(catalog.as_ref(), &job.context, &job.request),
            )
        });
    }

    let mut results: Vec<Option<Result<LookupResult>>> = vec![None; count];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => debug!(error = %e, "Lookup task failed"),
        }
    }

    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(QuoteError::Task("lookup task did not complete".into()))))
        .collect()
}
