//! Workload profile inspection

use anyhow::Result;
use colored::Colorize;
use quote_lib::Workload;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct PeriodRow {
    #[tabled(rename = "Share of time")]
    duration: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
}

#[derive(Serialize)]
struct WorkloadReport {
    workload: Workload,
    #[serde(skip_serializing_if = "Option::is_none")]
    co2: Option<f64>,
}

/// Parse a workload and, given a flat CO2 value, weight it with the profile
pub fn show_workload(
    profile: &str,
    co2: Option<f64>,
    curve: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let workload = Workload::parse(Some(profile))?;
    let weighted = co2.map(|v100| workload.interpolate(v100, curve));

    match format {
        OutputFormat::Json => print_json(&WorkloadReport {
            workload,
            co2: weighted,
        })?,
        OutputFormat::Table => {
            println!("{} {}%", "Baseline:".bold(), workload.baseline);
            if workload.is_full() {
                println!("{}", "Full utilization".cyan());
            }
            let rows: Vec<PeriodRow> = workload
                .periods
                .iter()
                .map(|p| PeriodRow {
                    duration: format!("{}%", p.duration),
                    utilization: format!("{}%", p.utilization),
                })
                .collect();
            if !rows.is_empty() {
                print_table(&rows);
            }
            if let Some(value) = weighted {
                println!("{} {:.3}", "Weighted CO2:".bold(), value);
            }
        }
    }
    Ok(())
}
