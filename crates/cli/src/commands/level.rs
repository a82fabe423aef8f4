//! Budget leveling commands

use anyhow::Result;
use colored::Colorize;
use quote_lib::{
    BudgetLeveler, CatalogRepository, LevelingOutcome, Quote, QuoteLedger, QuoteLogger,
    QuoteStore, QuoteTotal, WorkerPool,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

use crate::config::Settings;
use crate::output::{
    color_committed, format_cost_range, format_currency, print_json, print_success, print_table,
    OutputFormat,
};

/// Row for the assignments table
#[derive(Tabled)]
struct AssignmentRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Committed")]
    committed: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Initial")]
    initial: String,
}

/// Row for the budget groups table
#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Budget")]
    budget: String,
    #[tabled(rename = "Resources")]
    resources: usize,
    #[tabled(rename = "Committed")]
    committed: usize,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Remaining")]
    remaining: String,
}

#[derive(Serialize)]
struct RefreshReport<'a> {
    outcomes: &'a [LevelingOutcome],
    total: QuoteTotal,
}

fn budget_label(outcome: &LevelingOutcome) -> String {
    outcome
        .budget
        .clone()
        .unwrap_or_else(|| "(default)".to_string())
}

fn leveler(
    catalog: Arc<dyn CatalogRepository>,
    ledger: Arc<QuoteLedger>,
    quote: &Quote,
    pool: WorkerPool,
) -> BudgetLeveler {
    BudgetLeveler::new(super::engine(quote), catalog, ledger)
        .with_pool(pool)
        .with_logger(QuoteLogger::new(quote.settings.name.as_str()))
}

async fn save(ledger: &QuoteLedger, output: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    if let Some(path) = output {
        super::write_quote(&path, &ledger.snapshot().await)?;
        if matches!(format, OutputFormat::Table) {
            print_success(&format!("Quote written to {}", path.display()));
        }
    }
    Ok(())
}

/// Level one budget group, optionally after changing its cap
#[allow(clippy::too_many_arguments)]
pub async fn level_budget(
    catalog: Arc<dyn CatalogRepository>,
    quote: Quote,
    budget: Option<String>,
    cap: Option<f64>,
    output: Option<PathBuf>,
    pool: WorkerPool,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let ledger = Arc::new(QuoteLedger::from_quote(quote.clone()));
    let leveler = leveler(catalog, ledger.clone(), &quote, pool);

    let outcome = match (budget.as_deref(), cap) {
        (Some(name), Some(cap)) => leveler.on_budget_cost_changed(name, cap).await?,
        (name, _) => leveler.level(name).await?,
    };

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => {
            let currency = settings.currency.as_str();
            println!("{} {}", "Budget:".bold(), budget_label(&outcome).cyan());
            let rows: Vec<AssignmentRow> = outcome
                .assignments
                .iter()
                .map(|a| AssignmentRow {
                    resource: a.name.clone(),
                    price: a.price.clone(),
                    committed: color_committed(a.committed),
                    cost: format_cost_range(&a.cost, currency),
                    initial: format_currency(a.cost.initial, currency),
                })
                .collect();
            print_table(&rows);
            println!(
                "Capacity: {}   Remaining: {}   Committed: {}/{}",
                format_currency(outcome.capacity, currency),
                format_currency(outcome.remaining_budget, currency).green(),
                outcome.committed_count(),
                outcome.assignments.len()
            );
            println!(
                "Leveled at: {}",
                outcome
                    .leveled_at
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            );
        }
    }

    save(&ledger, output, format).await
}

/// Level every budget group of a quote
pub async fn refresh_quote(
    catalog: Arc<dyn CatalogRepository>,
    quote: Quote,
    output: Option<PathBuf>,
    pool: WorkerPool,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let ledger = Arc::new(QuoteLedger::from_quote(quote.clone()));
    let leveler = leveler(catalog, ledger.clone(), &quote, pool);

    let outcomes = leveler.refresh_all().await?;
    let total = ledger.total().await?;

    match format {
        OutputFormat::Json => print_json(&RefreshReport {
            outcomes: &outcomes,
            total,
        })?,
        OutputFormat::Table => {
            let currency = settings.currency.as_str();
            let rows: Vec<GroupRow> = outcomes
                .iter()
                .map(|o| GroupRow {
                    budget: budget_label(o),
                    resources: o.assignments.len(),
                    committed: o.committed_count(),
                    capacity: format_currency(o.capacity, currency),
                    remaining: format_currency(o.remaining_budget, currency),
                })
                .collect();
            print_table(&rows);
            println!(
                "{} {}",
                "Quote total:".bold(),
                format_cost_range(&total.cost, currency).green().bold()
            );
            println!("Initial: {}", format_currency(total.cost.initial, currency));
        }
    }

    save(&ledger, output, format).await
}
