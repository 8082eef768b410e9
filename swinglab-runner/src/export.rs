//! Artifact export: JSON manifests and CSV tables.
//!
//! A backtest writes `<output>/<run_id>/` with `manifest.json`,
//! `trades.csv`, `equity.csv`, `metrics.json` and `metrics.csv`. A labeling
//! pass writes `pivots.csv`, `labels.csv` and `summary.json`. Manifests carry
//! a `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use swinglab_core::domain::{Candle, EquityPoint, PivotPoint, Trade};
use swinglab_core::labeling::{Label, LabelSet};
use swinglab_core::metrics::Metrics;

use crate::runner::{BacktestOutcome, SCHEMA_VERSION};
use crate::sweep::SweepResults;
use crate::walk_forward::WalkForwardResult;

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn label_or_blank<T: Copy>(value: Option<T>, f: fn(T) -> &'static str) -> String {
    value.map_or_else(String::new, |v| f(v).to_string())
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(outcome: &BacktestOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("failed to serialize backtest outcome")
}

/// Rejects manifests written by a newer schema.
pub fn import_json(json: &str) -> Result<BacktestOutcome> {
    let outcome: BacktestOutcome =
        serde_json::from_str(json).context("failed to deserialize backtest outcome")?;
    if outcome.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            outcome.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(outcome)
}

// ─── CSV tables ─────────────────────────────────────────────────────

pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "exit_reason",
        "size",
        "gross_pnl",
        "commission",
        "net_pnl",
        "return_pct",
        "candles_held",
    ])?;
    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.side),
            &t.entry_index.to_string(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.exit_reason.as_str().to_string(),
            &format!("{:.6}", t.size),
            &format!("{:.6}", t.gross_pnl),
            &format!("{:.6}", t.commission),
            &format!("{:.6}", t.net_pnl),
            &format!("{:.6}", t.return_pct()),
            &t.candles_held().to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_equity_csv(equity: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "equity"])?;
    for (i, point) in equity.iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &point.timestamp.to_string(),
            &format!("{:.6}", point.capital),
        ])?;
    }
    finish(wtr)
}

/// Flat `key,value` rendering of the summary metrics.
pub fn export_metrics_csv(metrics: &Metrics) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["key", "value"])?;
    for (key, value) in metrics.to_flat_map() {
        wtr.write_record([&key, &value])?;
    }
    finish(wtr)
}

pub fn export_pivots_csv(pivots: &[PivotPoint], candles: &[Candle]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "kind", "price", "confirmed", "confirmed_at"])?;
    for p in pivots {
        let timestamp = candles
            .get(p.index)
            .map(|c| c.timestamp.to_string())
            .unwrap_or_default();
        wtr.write_record([
            &p.index.to_string(),
            &timestamp,
            &format!("{:?}", p.kind),
            &format!("{:.6}", p.price),
            &p.confirmed.to_string(),
            &p.confirmed_at.map(|i| i.to_string()).unwrap_or_default(),
        ])?;
    }
    finish(wtr)
}

/// One row per candle: the candle's own segment label and the shifted
/// training label. Blank means unknown.
pub fn export_labels_csv(set: &LabelSet, candles: &[Candle]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "close", "segment_label", "training_label"])?;
    for (i, c) in candles.iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &c.timestamp.to_string(),
            &format!("{:.6}", c.close),
            &label_or_blank(set.table.get(i), Label::as_str),
            &label_or_blank(set.table.shifted(i, set.shift), Label::as_str),
        ])?;
    }
    finish(wtr)
}

pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "index",
        "stop_loss_pct",
        "take_profit_pct",
        "confidence_threshold",
        "sharpe",
        "total_return",
        "max_drawdown",
        "trade_count",
        "profit_factor",
        "run_id",
    ])?;
    for p in &results.points {
        wtr.write_record([
            &p.index.to_string(),
            &p.stop_loss_pct.to_string(),
            &p.take_profit_pct.to_string(),
            &p.confidence_threshold.to_string(),
            &format!("{:.6}", p.metrics.sharpe),
            &format!("{:.6}", p.metrics.total_return),
            &format!("{:.6}", p.metrics.max_drawdown),
            &p.metrics.trade_count.to_string(),
            &p.metrics.profit_factor.to_string(),
            &p.run_id,
        ])?;
    }
    finish(wtr)
}

pub fn export_folds_csv(result: &WalkForwardResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "fold",
        "is_start",
        "is_end",
        "oos_start",
        "oos_end",
        "is_sharpe",
        "oos_sharpe",
        "is_trades",
        "oos_trades",
    ])?;
    for f in &result.folds {
        wtr.write_record([
            &f.fold_index.to_string(),
            &f.spec.is_start.to_string(),
            &f.spec.is_end.to_string(),
            &f.spec.oos_start.to_string(),
            &f.spec.oos_end.to_string(),
            &format!("{:.6}", f.is_sharpe),
            &format!("{:.6}", f.oos_sharpe),
            &f.is_trades.to_string(),
            &f.oos_trades.to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundles ───────────────────────────────────────────────

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))
}

/// Write the backtest bundle to `<output_dir>/<run_id>/` and return that path.
pub fn save_artifacts(outcome: &BacktestOutcome, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&outcome.fingerprint.run_id);
    create_dir(&run_dir)?;

    write_file(&run_dir, "manifest.json", &export_json(outcome)?)?;
    write_file(&run_dir, "trades.csv", &export_trades_csv(&outcome.result.trades)?)?;
    write_file(&run_dir, "equity.csv", &export_equity_csv(&outcome.result.equity_curve)?)?;
    let metrics_json = serde_json::to_string_pretty(&outcome.result.metrics)
        .context("failed to serialize metrics")?;
    write_file(&run_dir, "metrics.json", &metrics_json)?;
    write_file(&run_dir, "metrics.csv", &export_metrics_csv(&outcome.result.metrics)?)?;

    tracing::info!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<BacktestOutcome> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

/// Write the labeling bundle to `<output_dir>/<run_id>/`.
pub fn save_label_artifacts(
    set: &LabelSet,
    candles: &[Candle],
    run_id: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(run_id);
    create_dir(&run_dir)?;

    write_file(&run_dir, "pivots.csv", &export_pivots_csv(&set.pivots, candles)?)?;
    write_file(&run_dir, "labels.csv", &export_labels_csv(set, candles)?)?;
    let summary =
        serde_json::to_string_pretty(&set.summary).context("failed to serialize label summary")?;
    write_file(&run_dir, "summary.json", &summary)?;

    tracing::info!(dir = %run_dir.display(), "label artifacts written");
    Ok(run_dir)
}

pub fn save_sweep(results: &SweepResults, output_dir: &Path) -> Result<PathBuf> {
    create_dir(output_dir)?;
    write_file(output_dir, "sweep.csv", &export_sweep_csv(results)?)?;
    let json = serde_json::to_string_pretty(results).context("failed to serialize sweep")?;
    write_file(output_dir, "sweep.json", &json)?;
    Ok(output_dir.to_path_buf())
}

pub fn save_walk_forward(result: &WalkForwardResult, output_dir: &Path) -> Result<PathBuf> {
    create_dir(output_dir)?;
    write_file(output_dir, "folds.csv", &export_folds_csv(result)?)?;
    let json =
        serde_json::to_string_pretty(result).context("failed to serialize walk-forward result")?;
    write_file(output_dir, "walk_forward.json", &json)?;
    Ok(output_dir.to_path_buf())
}
