//! Wide-CSV price loading: `date,ASSET1,ASSET2,...` with `YYYY-MM-DD` dates.
//!
//! Columns containing any missing or non-positive cell are dropped whole, so
//! the loaded table is gap-free and every surviving column supports log
//! prices. Malformed rows are fatal.

use crate::error::EngineError;
use crate::models::PriceTable;
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use std::fs;
use std::path::Path;

pub fn load_prices(path: &Path) -> Result<PriceTable, EngineError> {
    let content = fs::read_to_string(path)?;
    let table = parse_prices(&content)?;
    info!(
        "loaded {} periods x {} assets from {}",
        table.len(),
        table.assets().len(),
        path.display()
    );
    Ok(table)
}

/// Parse CSV text into a [`PriceTable`]. Blank lines are ignored; an empty
/// cell or a literal `NaN` marks a missing price.
pub fn parse_prices(content: &str) -> Result<PriceTable, EngineError> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or_else(|| EngineError::Parse {
        line: 1,
        reason: "file is empty".to_string(),
    })?;
    let fields: Vec<&str> = header.split(',').map(str::trim).collect();
    if fields.len() < 2 {
        return Err(EngineError::Parse {
            line: 1,
            reason: "header needs a date column and at least one asset".to_string(),
        });
    }
    let asset_names: Vec<String> = fields[1..].iter().map(|s| s.to_string()).collect();

    let mut index: Vec<DateTime<Utc>> = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); asset_names.len()];
    for (line_idx, line) in lines {
        let line_no = line_idx + 1;
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != asset_names.len() + 1 {
            return Err(EngineError::Parse {
                line: line_no,
                reason: format!(
                    "expected {} columns, found {}",
                    asset_names.len() + 1,
                    cells.len()
                ),
            });
        }

        let date = NaiveDate::parse_from_str(cells[0], "%Y-%m-%d").map_err(|e| {
            EngineError::Parse {
                line: line_no,
                reason: format!("bad date {:?}: {}", cells[0], e),
            }
        })?;
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| EngineError::Parse {
                line: line_no,
                reason: format!("bad date {:?}", cells[0]),
            })?
            .and_utc();
        index.push(timestamp);

        for (col, cell) in columns.iter_mut().zip(cells[1..].iter()) {
            if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                col.push(f64::NAN);
                continue;
            }
            let value: f64 = cell.parse().map_err(|e| EngineError::Parse {
                line: line_no,
                reason: format!("bad price {:?}: {}", cell, e),
            })?;
            col.push(value);
        }
    }

    // Keep only gap-free positive columns, the rest are unusable for log
    // spreads anyway.
    let mut kept = Vec::new();
    for (name, values) in asset_names.into_iter().zip(columns) {
        if values.iter().all(|v| v.is_finite() && *v > 0.0) {
            kept.push((name, values));
        } else {
            warn!("dropping column {}: missing or non-positive prices", name);
        }
    }

    PriceTable::new(index, kept)
}
