use super::capability::{Capabilities, KindCapability};
use super::context::LookupContext;
use super::pricing::{score, ScoredPrice, Shape};
use super::LookupConfig;
use crate::catalog::{CatalogRepository, PriceQuery, TermQuery, TypeQuery};
use crate::cost::FloatingCost;
use crate::error::{EntityKind, QuoteError, Result};
use crate::models::{OptimizerMode, ResourceRequest};
use crate::observability::{EngineMetrics, QuoteLogger};
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::debug;

/// Best offer for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub selection: ScoredPrice,
    /// Cost over the requested quantity range
    pub cost: FloatingCost,
    /// The narrow pass found nothing
    pub widened: bool,
    /// Selected among custom-shape types
    pub dynamic: bool,
    /// Metric actually used, after a possible CO2 downgrade
    pub optimizer: OptimizerMode,
}

impl LookupResult {
    pub fn price_code(&self) -> &str {
        &self.selection.price.code
    }
}

/// Search bounds of one pass
#[derive(Debug, Clone, Copy)]
struct Pass {
    max_period: f64,
    amplification: f64,
}

/// Inputs shared by every pass of one lookup
struct Search<'a> {
    catalog: &'a dyn CatalogRepository,
    capability: &'a dyn KindCapability,
    ctx: &'a LookupContext,
    request: &'a ResourceRequest,
    shape: Shape,
    baseline: f64,
    mode: OptimizerMode,
}

/// Finds the best catalog offer for resource requests.
///
/// Stateless between calls: the same catalog and request always select the
/// same price.
pub struct LookupEngine {
    config: LookupConfig,
    capabilities: Capabilities,
    metrics: EngineMetrics,
    logger: QuoteLogger,
}

impl LookupEngine {
    pub fn new(config: LookupConfig) -> Self {
        Self {
            config,
            capabilities: Capabilities::standard(),
            metrics: EngineMetrics::new(),
            logger: QuoteLogger::new(""),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_logger(mut self, logger: QuoteLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    fn capability(&self, request: &ResourceRequest) -> Result<&dyn KindCapability> {
        self.capabilities
            .get(request.kind)
            .map(|c| c.as_ref())
            .ok_or_else(|| {
                QuoteError::ConstraintViolation(format!(
                    "no lookup capability registered for {}",
                    request.kind
                ))
            })
    }

    fn shape(&self, ctx: &LookupContext, request: &ResourceRequest) -> Shape {
        Shape {
            cpu: request.cpu.max(0.0),
            ram: ctx.adjusted_ram(request.ram.max(0.0)),
            gpu: request.gpu.max(0.0),
        }
    }

    /// Find the best offer for `request`.
    ///
    /// Runs a narrow pass, then a wide one only when the narrow pass found
    /// nothing. Custom-shape types are searched the same way when the
    /// location has any and no GPU is requested; they replace the fixed-shape
    /// result only when strictly better.
    pub fn lookup(
        &self,
        catalog: &dyn CatalogRepository,
        ctx: &LookupContext,
        request: &ResourceRequest,
    ) -> Result<LookupResult> {
        let started = Instant::now();
        request.check_quantities()?;
        let capability = self.capability(request)?;

        catalog
            .find_location(&ctx.location)?
            .ok_or_else(|| QuoteError::not_found(EntityKind::Location, ctx.location.as_str()))?;

        let mut mode = ctx.optimizer.mode;
        if mode == OptimizerMode::Co2 && !catalog.has_co2_data(&ctx.location)? {
            self.logger
                .log_optimizer_downgrade(&request.name, &ctx.location);
            mode = OptimizerMode::Cost;
        }

        if let Some(code) = request.type_code.as_deref() {
            catalog
                .find_type(request.kind, code)?
                .ok_or_else(|| QuoteError::not_found(EntityKind::Type, code))?;
        }
        if let Some(code) = request.term.as_deref() {
            catalog
                .find_term(code)?
                .ok_or_else(|| QuoteError::not_found(EntityKind::Term, code))?;
        }

        let search = Search {
            catalog,
            capability,
            ctx,
            request,
            shape: self.shape(ctx, request),
            baseline: ctx.workload.rounded_baseline(self.config.baseline_step),
            mode,
        };

        let mut best = self.two_phase(&search, false)?;
        let mut dynamic = false;
        if search.shape.gpu == 0.0 && catalog.has_dynamic_types(request.kind, &ctx.location)? {
            if let Some(custom) = self.two_phase(&search, true)? {
                let better = match &best {
                    Some(fixed) => metric(&custom.0, mode) < metric(&fixed.0, mode),
                    None => true,
                };
                if better {
                    debug!(
                        resource = %request.name,
                        price = %custom.0.price.code,
                        "Custom-shape offer beats fixed-shape offers"
                    );
                    best = Some(custom);
                    dynamic = true;
                }
            }
        }

        let Some((selection, widened)) = best else {
            self.metrics.inc_no_match();
            self.logger
                .log_no_match(request.kind, &request.name, &ctx.location);
            return Err(QuoteError::no_match(request.kind, request.name.as_str()));
        };

        if widened {
            self.logger.log_widened(request.kind, &request.name);
        }
        let cost = selection.floating_cost(request.min_quantity, request.max_quantity);
        self.metrics
            .observe_lookup(started.elapsed().as_secs_f64(), widened);
        self.logger.log_lookup(
            request.kind,
            &request.name,
            &selection.price.code,
            selection.total_cost,
            selection.co2,
            mode,
        );

        Ok(LookupResult {
            selection,
            cost,
            widened,
            dynamic,
            optimizer: mode,
        })
    }

    /// Price a caller-pinned catalog offer for `request` without searching.
    pub fn validate_price(
        &self,
        catalog: &dyn CatalogRepository,
        ctx: &LookupContext,
        request: &ResourceRequest,
        price_code: &str,
    ) -> Result<LookupResult> {
        request.check_quantities()?;
        let capability = self.capability(request)?;
        let candidate = catalog
            .find_price(price_code)?
            .ok_or_else(|| QuoteError::not_found(EntityKind::Price, price_code))?;

        if candidate.catalog_type.kind != request.kind {
            return Err(QuoteError::ConstraintViolation(format!(
                "price '{}' is for a {}, not a {}",
                price_code, candidate.catalog_type.kind, request.kind
            )));
        }
        if !capability.matches_os_or_engine(&candidate.price, request) {
            return Err(QuoteError::ConstraintViolation(format!(
                "price '{}' does not serve the OS or engine of {} '{}'",
                price_code, request.kind, request.name
            )));
        }

        let selection = score(
            candidate,
            capability,
            &self.shape(ctx, request),
            ctx.rate(),
            &ctx.workload,
        );
        let cost = selection.floating_cost(request.min_quantity, request.max_quantity);
        Ok(LookupResult {
            selection,
            cost,
            widened: false,
            dynamic: false,
            optimizer: ctx.optimizer.mode,
        })
    }

    fn two_phase(&self, search: &Search<'_>, dynamic: bool) -> Result<Option<(ScoredPrice, bool)>> {
        let duration = search.ctx.usage.duration as f64;
        let narrow = Pass {
            max_period: (duration * search.ctx.rate()).ceil() + self.config.narrow_period_margin,
            amplification: self.config.narrow_amplification,
        };
        if let Some(found) = self.pass(search, narrow, dynamic)? {
            return Ok(Some((found, false)));
        }

        let wide = Pass {
            max_period: self.config.wide_period_ceiling,
            amplification: self.config.wide_amplification,
        };
        Ok(self.pass(search, wide, dynamic)?.map(|found| (found, true)))
    }

    fn pass(&self, search: &Search<'_>, pass: Pass, dynamic: bool) -> Result<Option<ScoredPrice>> {
        let request = search.request;
        let ctx = search.ctx;
        let shape = search.shape;

        let type_query = TypeQuery {
            kind: request.kind,
            location: ctx.location.clone(),
            cpu: shape.cpu,
            ram: shape.ram,
            gpu: shape.gpu,
            cpu_max: shape.cpu.max(1.0) * pass.amplification,
            ram_max: shape.ram.max(1.0) * pass.amplification,
            gpu_max: shape.gpu * pass.amplification,
            baseline: search.baseline,
            constant: request.constant,
            physical: request.physical,
            type_code: request.type_code.clone(),
            processor: request.processor.clone(),
            auto_scale: request.auto_scale,
            cpu_rate: request.cpu_rate,
            ram_rate: request.ram_rate,
            gpu_rate: request.gpu_rate,
            network_rate: request.network_rate,
            storage_rate: request.storage_rate,
            edge: false,
            co2_required: search.mode == OptimizerMode::Co2,
        };
        let types = if dynamic {
            search.catalog.find_dynamic_types(&type_query)?
        } else {
            search.catalog.find_valid_types(&type_query)?
        };
        if types.is_empty() {
            debug!(resource = %request.name, dynamic, max_period = pass.max_period, "No candidate type");
            return Ok(None);
        }

        let usage = &ctx.usage;
        let term_query = TermQuery {
            location: ctx.location.clone(),
            convertible_os: usage.convertible_os && search.capability.honors_os_convertibility(),
            convertible_engine: usage.convertible_engine
                && search.capability.honors_engine_convertibility(),
            convertible_type: usage.convertible_type,
            convertible_family: usage.convertible_family,
            convertible_location: usage.convertible_location,
            reservation: usage.reservation,
            max_period: pass.max_period,
            ephemeral: request.ephemeral,
            term_code: request.term.clone(),
            initial_cost: ctx.available_initial_cost > 0.0,
        };
        let terms = search.catalog.find_valid_terms(&term_query)?;
        if terms.is_empty() {
            debug!(resource = %request.name, dynamic, max_period = pass.max_period, "No candidate term");
            return Ok(None);
        }

        let candidates = search.catalog.find_prices(&PriceQuery {
            kind: request.kind,
            location: ctx.location.clone(),
            types,
            terms,
        })?;
        debug!(
            resource = %request.name,
            dynamic,
            candidates = candidates.len(),
            "Scoring candidates"
        );

        let rate = ctx.rate();
        Ok(candidates
            .into_iter()
            .filter(|c| search.capability.matches_os_or_engine(&c.price, request))
            .map(|c| score(c, search.capability, &shape, rate, &ctx.workload))
            .min_by(|a, b| compare(a, b, search.mode)))
    }
}

fn metric(scored: &ScoredPrice, mode: OptimizerMode) -> f64 {
    match mode {
        OptimizerMode::Cost => scored.total_cost,
        OptimizerMode::Co2 => scored.co2,
    }
}

/// Order by the optimizer metric; cost breaks CO2 ties and the price code
/// breaks the rest.
fn compare(a: &ScoredPrice, b: &ScoredPrice, mode: OptimizerMode) -> Ordering {
    let by_metric = match mode {
        OptimizerMode::Cost => a.total_cost.total_cmp(&b.total_cost),
        OptimizerMode::Co2 => a
            .co2
            .total_cmp(&b.co2)
            .then_with(|| a.total_cost.total_cmp(&b.total_cost)),
    };
    by_metric.then_with(|| a.price.code.cmp(&b.price.code))
}
