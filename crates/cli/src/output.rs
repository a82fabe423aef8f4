//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use quote_lib::FloatingCost;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or nothing but a notice when empty
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format a floating cost as `min - max`, with `+` when unbound
pub fn format_cost_range(cost: &FloatingCost, currency: &str) -> String {
    let mut range = if cost.min == cost.max {
        format_currency(cost.min, currency)
    } else {
        format!(
            "{} - {}",
            format_currency(cost.min, currency),
            format_currency(cost.max, currency)
        )
    };
    if cost.unbound {
        range.push('+');
    }
    range
}

/// Format monthly CO2
pub fn format_co2(co2: f64) -> String {
    format!("{:.2} kg", co2)
}

/// Color a term commitment flag
pub fn color_committed(committed: bool) -> String {
    if committed {
        "yes".green().to_string()
    } else {
        "no".dimmed().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(168.0, "USD"), "$168.00");
        assert_eq!(format_currency(1.5, "EUR"), "€1.50");
        assert_eq!(format_currency(2.0, "CHF"), "2.00 CHF");
    }

    #[test]
    fn test_format_cost_range() {
        let fixed = FloatingCost::fixed(10.0);
        assert_eq!(format_cost_range(&fixed, "USD"), "$10.00");

        let open = FloatingCost {
            max: 20.0,
            unbound: true,
            ..fixed
        };
        assert_eq!(format_cost_range(&open, "USD"), "$10.00 - $20.00+");
    }
}
