//! Lookup commands

use anyhow::{bail, Result};
use colored::Colorize;
use quote_lib::lookup::{lookup_all, LookupJob};
use quote_lib::{
    CatalogRepository, LookupContext, LookupResult, Quote, QuoteError, ResourceKind, WorkerPool,
};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;

use crate::config::Settings;
use crate::output::{
    format_co2, format_cost_range, format_currency, print_info, print_json, print_table,
    print_warning, OutputFormat,
};

/// Row for the lookup table
#[derive(Tabled)]
struct LookupRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "CO2")]
    co2: String,
    #[tabled(rename = "Note")]
    note: String,
}

/// Outcome of one resource, as printed in JSON
#[derive(Serialize)]
struct LookupEntry {
    resource: String,
    kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<LookupResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl LookupEntry {
    fn new(resource: String, kind: ResourceKind, outcome: quote_lib::Result<LookupResult>) -> Self {
        match outcome {
            Ok(result) => Self {
                resource,
                kind,
                result: Some(result),
                error: None,
                message: None,
            },
            Err(e) => Self {
                resource,
                kind,
                result: None,
                error: Some(e.code()),
                message: Some(e.to_string()),
            },
        }
    }

    fn row(&self, currency: &str) -> LookupRow {
        match &self.result {
            Some(result) => {
                let mut notes = Vec::new();
                if result.widened {
                    notes.push("widened");
                }
                if result.dynamic {
                    notes.push("custom");
                }
                LookupRow {
                    resource: self.resource.clone(),
                    kind: self.kind.to_string(),
                    price: result.price_code().to_string(),
                    term: result.selection.price.term.clone(),
                    monthly: format_currency(result.selection.total_cost, currency),
                    cost: format_cost_range(&result.cost, currency),
                    co2: format_co2(result.selection.co2),
                    note: notes.join(", "),
                }
            }
            None => LookupRow {
                resource: self.resource.clone(),
                kind: self.kind.to_string(),
                price: "-".to_string(),
                term: "-".to_string(),
                monthly: "-".to_string(),
                cost: "-".to_string(),
                co2: "-".to_string(),
                note: self.error.clone().unwrap_or_default().red().to_string(),
            },
        }
    }
}

fn render(entries: &[LookupEntry], settings: &Settings, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(entries)?,
        OutputFormat::Table => {
            let rows: Vec<LookupRow> = entries.iter().map(|e| e.row(&settings.currency)).collect();
            print_table(&rows);
            let failed = entries.iter().filter(|e| e.error.is_some()).count();
            if failed > 0 {
                print_warning(&format!("{} resource(s) without a matching offer", failed));
            }
        }
    }
    Ok(())
}

/// Find the best offer for every resource of a quote, or only `resource`
pub async fn lookup_resources(
    catalog: Arc<dyn CatalogRepository>,
    quote: Quote,
    resource: Option<String>,
    pool: WorkerPool,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let engine = super::engine(&quote);
    let selected: Vec<_> = quote
        .resources
        .iter()
        .filter(|r| resource.as_deref().map_or(true, |name| r.request.name == name))
        .collect();
    if let (true, Some(name)) = (selected.is_empty(), resource.as_deref()) {
        bail!("No resource named '{}' in quote '{}'", name, quote.settings.name);
    }

    let prepared: Vec<(String, ResourceKind, quote_lib::Result<LookupJob>)> = selected
        .iter()
        .map(|r| {
            let job = LookupContext::resolve(&quote.settings, &r.request).map(|context| LookupJob {
                context,
                request: r.request.clone(),
            });
            (r.request.name.clone(), r.request.kind, job)
        })
        .collect();
    let jobs: Vec<LookupJob> = prepared
        .iter()
        .filter_map(|(_, _, job)| job.as_ref().ok().cloned())
        .collect();

    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "Looking up {} resource(s) of quote '{}'",
            prepared.len(),
            quote.settings.name
        ));
    }
    let mut results = lookup_all(engine, catalog, jobs, pool).await.into_iter();

    let entries: Vec<LookupEntry> = prepared
        .into_iter()
        .map(|(name, kind, job)| {
            let outcome = job.and_then(|_| {
                results
                    .next()
                    .unwrap_or_else(|| Err(QuoteError::Task("missing lookup result".into())))
            });
            LookupEntry::new(name, kind, outcome)
        })
        .collect();

    render(&entries, settings, format)
}

/// Price a pinned catalog offer for one resource
pub fn validate_price(
    catalog: Arc<dyn CatalogRepository>,
    quote: Quote,
    resource: &str,
    price: &str,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let Some(target) = quote.resources.iter().find(|r| r.request.name == resource) else {
        bail!("No resource named '{}' in quote '{}'", resource, quote.settings.name);
    };
    let engine = super::engine(&quote);
    let outcome = LookupContext::resolve(&quote.settings, &target.request).and_then(|ctx| {
        engine.validate_price(catalog.as_ref(), &ctx, &target.request, price)
    });

    let entry = LookupEntry::new(resource.to_string(), target.request.kind, outcome);
    render(std::slice::from_ref(&entry), settings, format)
}
