//! Output formatting: JSON, table, plain.
//!
//! The bridge API is JSON-first, so `json` is the default and response
//! bodies are printed verbatim (serde_json keeps keys sorted). Tables apply
//! to list-shaped results only; other commands fall back to JSON.

use std::io::{self, Write};

use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;

/// Render a decoded response body in the chosen format.
pub fn render_value(format: &OutputFormat, value: &Value) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Table => pretty(value),
        OutputFormat::JsonCompact | OutputFormat::Plain => value.to_string(),
    }
}

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` row built by `to_row`
/// - `json` / `json-compact`: serializes the original data via serde
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".into())
        }
        OutputFormat::JsonCompact => serde_json::to_string(data).unwrap_or_else(|_| "[]".into()),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Print rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
