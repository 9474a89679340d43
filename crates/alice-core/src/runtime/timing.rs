//! Timing diagnostics reported by the agent

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const NAME_WIDTH: usize = 35;

/// Per-operation timing statistics, keyed by operation name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingData {
    #[serde(default)]
    pub count: HashMap<String, u64>,
    #[serde(default)]
    pub total: HashMap<String, f64>,
    #[serde(default)]
    pub avg: HashMap<String, f64>,
    #[serde(default)]
    pub min: HashMap<String, f64>,
    #[serde(default)]
    pub max: HashMap<String, f64>,
}

struct Row<'a> {
    name: &'a str,
    count: u64,
    total: f64,
    avg: f64,
    min: f64,
    max: f64,
}

/// Render timing data as a fixed-width table, slowest operations first
pub fn format_timing(timing: &TimingData) -> Vec<String> {
    let stat = |map: &HashMap<String, f64>, name: &str| map.get(name).copied().unwrap_or(0.0);

    let mut rows: Vec<Row<'_>> = timing
        .count
        .iter()
        .map(|(name, &count)| Row {
            name: truncate(name, NAME_WIDTH),
            count,
            total: stat(&timing.total, name),
            avg: stat(&timing.avg, name),
            min: stat(&timing.min, name),
            max: stat(&timing.max, name),
        })
        .collect();
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));

    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(format!(
        "{:<35} | {:>12} {:>12} {:>10} {:>10} {:>10}",
        "", "count", "total", "avg", "min", "max"
    ));
    lines.push("=".repeat(96));
    for row in rows {
        lines.push(format!(
            "{:<35} | {:>12} {:>12.3} {:>10.3} {:>10.3} {:>10.3}",
            row.name, row.count, row.total, row.avg, row.min, row.max
        ));
    }
    lines.push(String::new());
    lines
}

fn truncate(name: &str, width: usize) -> &str {
    match name.char_indices().nth(width) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}
