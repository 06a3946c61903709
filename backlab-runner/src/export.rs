//! Report export — JSON, equity CSV, and trade tape CSV.
//!
//! JSON carries the full `BacktestReport` round trip (infinity metrics as
//! explicit `"inf"` sentinels). CSV artifacts target external analysis
//! tools: one flat file for the equity curve, one for the trade tape.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use backlab_core::{BacktestReport, EquityPoint, Trade};

/// Serialize a full report to pretty JSON.
pub fn export_report_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a report back from JSON.
pub fn import_report_json(json: &str) -> Result<BacktestReport> {
    serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")
}

/// Write the equity curve as CSV: date, equity, drawdown, benchmark.
pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;
    writeln!(file, "date,equity,drawdown,benchmark")?;
    for point in equity {
        writeln!(
            file,
            "{},{:.4},{:.6},{:.4}",
            point.date, point.equity, point.drawdown, point.benchmark
        )?;
    }
    Ok(())
}

/// Write the trade tape as CSV.
pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create trades CSV {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "shares",
        "pnl",
        "pnl_pct",
        "hold_days",
        "exit_reason",
    ])?;
    for trade in trades {
        wtr.write_record([
            trade.entry_date.to_string(),
            format!("{:.4}", trade.entry_price),
            trade.exit_date.to_string(),
            format!("{:.4}", trade.exit_price),
            format!("{}", trade.shares),
            format!("{:.4}", trade.pnl),
            format!("{:.6}", trade.pnl_pct),
            trade.hold_days.to_string(),
            trade.exit_reason.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
