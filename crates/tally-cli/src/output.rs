// crates/tally-cli/src/output.rs
//
// Output formatting utilities for the Tally CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table output where a command has one, JSON otherwise.
    Table,
    /// JSON output for machine consumption.
    Json,
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// One row of the balance table.
#[derive(Debug, Clone, Tabled)]
pub struct BalanceRow {
    #[tabled(rename = "Asset")]
    pub asset: String,
    #[tabled(rename = "Base units")]
    pub amount: u64,
    #[tabled(rename = "Tokens")]
    pub formatted: String,
}

/// Build balance rows from a `token/balance` result. Missing fields read as empty.
pub fn balance_rows(result: &serde_json::Value) -> Vec<BalanceRow> {
    result["balances"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| BalanceRow {
                    asset: entry["asset"].as_str().unwrap_or_default().to_string(),
                    amount: entry["amount"].as_u64().unwrap_or(0),
                    formatted: entry["formatted"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_rows_from_result() {
        let result = serde_json::json!({
            "account": "alice",
            "balances": [
                { "asset": "LP", "amount": 1500000000u64, "formatted": "1.500000000" },
                { "asset": "REWARD", "amount": 0, "formatted": "0.000000000" }
            ]
        });
        let rows = balance_rows(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].asset, "LP");
        assert_eq!(rows[0].amount, 1_500_000_000);
        let table = format_table(&rows);
        assert!(table.contains("REWARD"));
    }

    #[test]
    fn test_balance_rows_empty_on_unexpected_shape() {
        assert!(balance_rows(&serde_json::json!({ "oops": true })).is_empty());
    }
}
