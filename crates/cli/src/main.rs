//! Cloud quote optimizer CLI
//!
//! Loads a catalog and a quote from JSON files, finds the best catalog
//! offer for each resource, and levels prepaid budgets.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{level, lookup, workload};
use quote_lib::WorkerPool;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cloud quote optimizer CLI
#[derive(Parser)]
#[command(name = "qopt")]
#[command(author, version, about = "CLI for the cloud quote optimizer", long_about = None)]
pub struct Cli {
    /// Catalog file (JSON)
    #[arg(long, global = true, env = "QOPT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/qopt/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the best catalog offer for the resources of a quote
    Lookup {
        /// Quote file (JSON)
        quote: PathBuf,

        /// Only this resource
        #[arg(long, short)]
        resource: Option<String>,

        /// Price this catalog offer instead of searching
        #[arg(long, requires = "resource")]
        price: Option<String>,
    },

    /// Level one budget group of a quote
    Level {
        /// Quote file (JSON)
        quote: PathBuf,

        /// Budget to level (resources without budget if not specified)
        #[arg(long, short)]
        budget: Option<String>,

        /// New one-time cost cap of the budget
        #[arg(long, requires = "budget")]
        cap: Option<f64>,

        /// Write the updated quote to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Level every budget group of a quote
    Refresh {
        /// Quote file (JSON)
        quote: PathBuf,

        /// Write the updated quote to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Inspect a workload profile
    Workload {
        /// Profile, e.g. "30,80@10,20@90"
        #[arg(allow_hyphen_values = true)]
        profile: String,

        /// CO2 at full utilization to weight with the profile
        #[arg(long)]
        co2: Option<f64>,

        /// CO2 samples by utilization, comma-separated
        #[arg(long)]
        curve: Option<String>,
    },
}

fn init_tracing(json_logs: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text = (!json_logs).then(|| fmt::layer().with_writer(std::io::stderr));
    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::Settings::load(cli.config.as_deref())?;
    init_tracing(settings.json_logs, cli.verbose);

    let pool = WorkerPool::new(settings.workers);
    let catalog_path = cli.catalog.as_deref();

    match cli.command {
        Commands::Lookup {
            quote,
            resource,
            price,
        } => {
            let catalog = commands::load_catalog(catalog_path)?;
            let quote = commands::load_quote(&quote)?;
            match (resource, price) {
                (Some(resource), Some(price)) => {
                    lookup::validate_price(catalog, quote, &resource, &price, &settings, cli.format)?;
                }
                (resource, _) => {
                    lookup::lookup_resources(catalog, quote, resource, pool, &settings, cli.format)
                        .await?;
                }
            }
        }
        Commands::Level {
            quote,
            budget,
            cap,
            output,
        } => {
            let catalog = commands::load_catalog(catalog_path)?;
            let quote = commands::load_quote(&quote)?;
            level::level_budget(catalog, quote, budget, cap, output, pool, &settings, cli.format)
                .await?;
        }
        Commands::Refresh { quote, output } => {
            let catalog = commands::load_catalog(catalog_path)?;
            let quote = commands::load_quote(&quote)?;
            level::refresh_quote(catalog, quote, output, pool, &settings, cli.format).await?;
        }
        Commands::Workload {
            profile,
            co2,
            curve,
        } => {
            workload::show_workload(&profile, co2, curve.as_deref(), cli.format)?;
        }
    }

    Ok(())
}
