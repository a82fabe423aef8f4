//! In-memory catalog
//!
//! Answers repository queries by scanning plain vectors. Loaded from JSON
//! by the command line driver; built in code by tests.

use super::{
    CatalogPrice, CatalogRepository, CatalogTerm, CatalogType, Location, PriceCandidate,
    PriceQuery, TermQuery, TypeQuery,
};
use crate::error::{QuoteError, Result};
use crate::models::{Rate, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub types: Vec<CatalogType>,
    #[serde(default)]
    pub terms: Vec<CatalogTerm>,
    #[serde(default)]
    pub prices: Vec<CatalogPrice>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QuoteError::Catalog(format!("invalid catalog: {}", e)))
    }

    pub fn with_location(mut self, name: &str) -> Self {
        self.locations.push(Location {
            name: name.to_string(),
            description: None,
        });
        self
    }

    pub fn with_type(mut self, catalog_type: CatalogType) -> Self {
        self.types.push(catalog_type);
        self
    }

    pub fn with_term(mut self, term: CatalogTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn with_price(mut self, price: CatalogPrice) -> Self {
        self.prices.push(price);
        self
    }

    fn type_by_code(&self, code: &str) -> Option<&CatalogType> {
        self.types.iter().find(|t| t.code == code)
    }

    fn term_by_code(&self, code: &str) -> Option<&CatalogTerm> {
        self.terms.iter().find(|t| t.code == code)
    }

    fn priced_in(&self, type_code: &str, location: &str) -> bool {
        self.prices
            .iter()
            .any(|p| p.type_code == type_code && p.location == location)
    }

    fn has_co2_for(&self, type_code: &str, location: &str) -> bool {
        self.prices
            .iter()
            .any(|p| p.type_code == type_code && p.location == location && p.co2 > 0.0)
    }

    /// Filters shared by fixed and custom types
    fn matches_common(&self, t: &CatalogType, q: &TypeQuery) -> bool {
        t.kind == q.kind
            && t.edge == q.edge
            && (!q.auto_scale || t.auto_scale)
            && q.constant.map_or(true, |c| t.constant == Some(c))
            && q.physical.map_or(true, |p| t.physical == p)
            && q.type_code.as_deref().map_or(true, |code| t.code == code)
            && q.processor.as_deref().map_or(true, |p| {
                t.processor
                    .as_deref()
                    .map_or(false, |tp| tp.to_lowercase().contains(&p.to_lowercase()))
            })
            && t.baseline.map_or(true, |b| b >= q.baseline)
            && rate_ok(t.cpu_rate, q.cpu_rate)
            && rate_ok(t.ram_rate, q.ram_rate)
            && rate_ok(t.gpu_rate, q.gpu_rate)
            && rate_ok(t.network_rate, q.network_rate)
            && rate_ok(t.storage_rate, q.storage_rate)
            && self.priced_in(&t.code, &q.location)
            && (!q.co2_required || self.has_co2_for(&t.code, &q.location))
    }

    fn candidate(&self, price: &CatalogPrice) -> Option<PriceCandidate> {
        Some(PriceCandidate {
            price: price.clone(),
            catalog_type: self.type_by_code(&price.type_code)?.clone(),
            term: self.term_by_code(&price.term)?.clone(),
        })
    }
}

fn rate_ok(actual: Rate, required: Option<Rate>) -> bool {
    required.map_or(true, |r| actual >= r)
}

fn within(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

impl CatalogRepository for InMemoryCatalog {
    fn find_location(&self, name: &str) -> Result<Option<Location>> {
        Ok(self.locations.iter().find(|l| l.name == name).cloned())
    }

    fn find_type(&self, kind: ResourceKind, code: &str) -> Result<Option<CatalogType>> {
        Ok(self
            .types
            .iter()
            .find(|t| t.kind == kind && t.code == code)
            .cloned())
    }

    fn find_term(&self, code: &str) -> Result<Option<CatalogTerm>> {
        Ok(self.term_by_code(code).cloned())
    }

    fn find_price(&self, code: &str) -> Result<Option<PriceCandidate>> {
        Ok(self
            .prices
            .iter()
            .find(|p| p.code == code)
            .and_then(|p| self.candidate(p)))
    }

    fn find_valid_types(&self, q: &TypeQuery) -> Result<Vec<String>> {
        Ok(self
            .types
            .iter()
            .filter(|t| !t.custom)
            .filter(|t| {
                within(t.cpu, q.cpu, q.cpu_max)
                    && within(t.ram, q.ram, q.ram_max)
                    && within(t.gpu, q.gpu, q.gpu_max)
            })
            .filter(|t| self.matches_common(t, q))
            .map(|t| t.code.clone())
            .collect())
    }

    fn find_dynamic_types(&self, q: &TypeQuery) -> Result<Vec<String>> {
        Ok(self
            .types
            .iter()
            .filter(|t| t.custom)
            .filter(|t| q.cpu <= t.cpu && q.ram <= t.ram && q.gpu <= t.gpu)
            .filter(|t| self.matches_common(t, q))
            .map(|t| t.code.clone())
            .collect())
    }

    fn find_valid_terms(&self, q: &TermQuery) -> Result<Vec<String>> {
        Ok(self
            .terms
            .iter()
            .filter(|t| {
                (!q.convertible_os || t.convertible_os)
                    && (!q.convertible_engine || t.convertible_engine)
                    && (!q.convertible_type || t.convertible_type)
                    && (!q.convertible_family || t.convertible_family)
                    && (!q.convertible_location || t.convertible_location)
                    && (!q.reservation || t.reservation)
                    && t.period <= q.max_period
                    && (q.ephemeral || !t.ephemeral)
                    && (q.initial_cost || !t.initial_cost)
                    && q.term_code.as_deref().map_or(true, |code| t.code == code)
            })
            .filter(|t| {
                self.prices
                    .iter()
                    .any(|p| p.term == t.code && p.location == q.location)
            })
            .map(|t| t.code.clone())
            .collect())
    }

    fn find_prices(&self, q: &PriceQuery) -> Result<Vec<PriceCandidate>> {
        let types: HashSet<&str> = q.types.iter().map(String::as_str).collect();
        let terms: HashSet<&str> = q.terms.iter().map(String::as_str).collect();
        Ok(self
            .prices
            .iter()
            .filter(|p| {
                p.location == q.location
                    && types.contains(p.type_code.as_str())
                    && terms.contains(p.term.as_str())
            })
            .filter_map(|p| self.candidate(p))
            .filter(|c| c.catalog_type.kind == q.kind)
            .collect())
    }

    fn has_dynamic_types(&self, kind: ResourceKind, location: &str) -> Result<bool> {
        Ok(self
            .types
            .iter()
            .any(|t| t.custom && t.kind == kind && self.priced_in(&t.code, location)))
    }

    fn has_co2_data(&self, location: &str) -> Result<bool> {
        Ok(self
            .prices
            .iter()
            .any(|p| p.location == location && p.co2 > 0.0))
    }
}
