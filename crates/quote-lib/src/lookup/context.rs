//! Resolution of the named references of a request
//!
//! A resource inherits the quote's usage, budget, optimizer and location
//! when it names none; without a quote-level value the immutable defaults
//! apply.

use crate::error::{EntityKind, QuoteError, Result};
use crate::models::{Budget, Optimizer, QuoteSettings, ResourceRequest, Usage};
use crate::workload::Workload;

/// Everything a single lookup needs besides the request itself
#[derive(Debug, Clone, PartialEq)]
pub struct LookupContext {
    pub location: String,
    pub usage: Usage,
    pub budget: Budget,
    pub optimizer: Optimizer,
    pub workload: Workload,
    /// Percent applied to the requested RAM
    pub ram_adjusted_rate: u32,
    /// One-time cost the selected term may consume
    pub available_initial_cost: f64,
}

impl LookupContext {
    pub fn resolve(settings: &QuoteSettings, request: &ResourceRequest) -> Result<Self> {
        let usage = match request.usage.as_ref().or(settings.usage.as_ref()) {
            Some(name) => settings
                .find_usage(name)
                .cloned()
                .ok_or_else(|| QuoteError::not_found(EntityKind::Usage, name.as_str()))?,
            None => Usage::DEFAULT,
        };

        let budget = match effective_budget(settings, request) {
            Some(name) => settings
                .find_budget(name)
                .cloned()
                .ok_or_else(|| QuoteError::not_found(EntityKind::Budget, name))?,
            None => Budget::DEFAULT,
        };

        let optimizer = match request.optimizer.as_ref().or(settings.optimizer.as_ref()) {
            Some(name) => settings
                .find_optimizer(name)
                .cloned()
                .ok_or_else(|| QuoteError::not_found(EntityKind::Optimizer, name.as_str()))?,
            None => Optimizer::DEFAULT,
        };

        let location = request
            .location
            .clone()
            .unwrap_or_else(|| settings.location.clone());

        let workload = Workload::parse(request.workload.as_deref())?;
        let available_initial_cost = budget.available_initial_cost();

        Ok(Self {
            location,
            usage,
            budget,
            optimizer,
            workload,
            ram_adjusted_rate: settings.ram_adjusted_rate,
            available_initial_cost,
        })
    }

    /// Same context with another one-time cost allowance
    pub fn with_available_initial_cost(mut self, available: f64) -> Self {
        self.available_initial_cost = available.max(0.0);
        self
    }

    /// Usage rate as a fraction
    pub fn rate(&self) -> f64 {
        (self.usage.rate / 100.0).clamp(0.0, 1.0)
    }

    /// Requested RAM after the quote adjustment
    pub fn adjusted_ram(&self, ram: f64) -> f64 {
        ram * self.ram_adjusted_rate as f64 / 100.0
    }
}

/// Budget group a request belongs to: its own budget, else the quote's
pub fn effective_budget<'a>(
    settings: &'a QuoteSettings,
    request: &'a ResourceRequest,
) -> Option<&'a str> {
    request
        .budget
        .as_deref()
        .or(settings.budget.as_deref())
}
