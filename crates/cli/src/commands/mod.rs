//! Command implementations and their shared input handling

pub mod level;
pub mod lookup;
pub mod workload;

use anyhow::{bail, Context, Result};
use quote_lib::{
    CatalogRepository, InMemoryCatalog, LookupConfig, LookupEngine, Quote, QuoteLogger,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load a catalog from a JSON file
pub fn load_catalog(path: Option<&Path>) -> Result<Arc<dyn CatalogRepository>> {
    let Some(path) = path else {
        bail!("No catalog given, use --catalog or QOPT_CATALOG");
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let catalog = InMemoryCatalog::from_json(&content)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;
    debug!(
        path = %path.display(),
        locations = catalog.locations.len(),
        types = catalog.types.len(),
        prices = catalog.prices.len(),
        "Catalog loaded"
    );
    Ok(Arc::new(catalog))
}

/// Load a quote from a JSON file
pub fn load_quote(path: &Path) -> Result<Quote> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read quote {}", path.display()))?;
    let quote: Quote = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse quote {}", path.display()))?;
    debug!(
        quote = %quote.settings.name,
        resources = quote.resources.len(),
        budgets = quote.settings.budgets.len(),
        "Quote loaded"
    );
    Ok(quote)
}

/// Write a quote back as JSON
pub fn write_quote(path: &Path, quote: &Quote) -> Result<()> {
    let content = serde_json::to_string_pretty(quote).context("Failed to serialize quote")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write quote {}", path.display()))
}

/// Lookup engine logging on behalf of `quote`
pub fn engine(quote: &Quote) -> Arc<LookupEngine> {
    Arc::new(
        LookupEngine::new(LookupConfig::default())
            .with_logger(QuoteLogger::new(quote.settings.name.as_str())),
    )
}
