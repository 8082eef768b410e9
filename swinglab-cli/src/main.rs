//! SwingLab CLI: labeling, backtesting and validation commands.
//!
//! Commands:
//! - `label`: detect ZigZag pivots and write segment/training labels
//! - `backtest`: run one causal simulation and write its artifacts
//! - `walk-forward`: expanding-window IS/OOS validation
//! - `sweep`: grid search over stop loss, take profit and confidence

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use swinglab_core::domain::Candle;
use swinglab_runner::export::{save_artifacts, save_label_artifacts, save_sweep, save_walk_forward};
use swinglab_runner::fingerprint::label_run_id;
use swinglab_runner::{
    load_candles, load_signals, run_backtest_from_data, run_labeling, run_walk_forward,
    BacktestConfig, BacktestOutcome, ParamGrid, ParamSweep, SignalSpec, WalkForwardConfig,
};

#[derive(Parser)]
#[command(
    name = "swinglab",
    about = "SwingLab CLI: swing labeling and causal signal backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Candle CSV: timestamp,open,high,low,close,volume.
    #[arg(long)]
    candles: PathBuf,

    /// TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct SignalArgs {
    /// Precomputed signal CSV: timestamp,direction,confidence.
    #[arg(long, conflicts_with = "roc_period")]
    signals: Option<PathBuf>,

    /// Use the rate-of-change momentum source with this lookback.
    #[arg(long)]
    roc_period: Option<usize>,

    /// Minimum |ROC| in percent before the momentum source emits a direction.
    #[arg(long, default_value_t = 1.0)]
    roc_threshold: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect pivots and write pivots.csv, labels.csv and summary.json.
    Label {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory; a subdirectory named after the run id is created.
        #[arg(long, default_value = "results")]
        output: PathBuf,
    },
    /// Run one backtest and write its artifact bundle.
    Backtest {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        signals: SignalArgs,

        #[arg(long, default_value = "results")]
        output: PathBuf,
    },
    /// Expanding-window walk-forward validation.
    WalkForward {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        signals: SignalArgs,

        /// Number of folds.
        #[arg(long, default_value_t = 5)]
        folds: usize,

        /// Minimum in-sample candles for the first fold.
        #[arg(long, default_value_t = 252)]
        min_is: usize,

        /// Minimum out-of-sample candles per fold.
        #[arg(long, default_value_t = 63)]
        min_oos: usize,

        /// Directory for folds.csv and walk_forward.json.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Grid search over stop loss x take profit x confidence threshold.
    Sweep {
        #[command(flatten)]
        inputs: Inputs,

        #[command(flatten)]
        signals: SignalArgs,

        /// Stop-loss fractions, comma separated (e.g. 0.02,0.05).
        #[arg(long, value_delimiter = ',', required = true)]
        stop_loss: Vec<f64>,

        /// Take-profit fractions, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        take_profit: Vec<f64>,

        /// Confidence thresholds, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        confidence: Vec<f64>,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Directory for sweep.csv and sweep.json.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Label { inputs, output } => run_label_cmd(&inputs, &output),
        Commands::Backtest {
            inputs,
            signals,
            output,
        } => run_backtest_cmd(&inputs, &signals, &output),
        Commands::WalkForward {
            inputs,
            signals,
            folds,
            min_is,
            min_oos,
            output,
        } => {
            let wf = WalkForwardConfig {
                n_folds: folds,
                min_total_candles: min_is + min_oos * folds.max(1),
                min_is_candles: min_is,
                min_oos_candles: min_oos,
            };
            run_walk_forward_cmd(&inputs, &signals, &wf, output.as_deref())
        }
        Commands::Sweep {
            inputs,
            signals,
            stop_loss,
            take_profit,
            confidence,
            serial,
            output,
        } => {
            let grid = ParamGrid {
                stop_loss_pcts: stop_loss,
                take_profit_pcts: take_profit,
                confidence_thresholds: confidence,
            };
            run_sweep_cmd(&inputs, &signals, &grid, !serial, output.as_deref())
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("swinglab_core=info,swinglab_runner=info,swinglab=info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inputs(inputs: &Inputs) -> Result<(BacktestConfig, Vec<Candle>)> {
    let config = match &inputs.config {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    let candles = load_candles(&inputs.candles)
        .with_context(|| format!("failed to load candles from {}", inputs.candles.display()))?;
    Ok((config, candles))
}

fn signal_spec(args: &SignalArgs) -> Result<SignalSpec> {
    match (&args.signals, args.roc_period) {
        (Some(path), None) => {
            let signals = load_signals(path)
                .with_context(|| format!("failed to load signals from {}", path.display()))?;
            Ok(SignalSpec::Precomputed(signals))
        }
        (None, Some(period)) => Ok(SignalSpec::RocMomentum {
            period,
            threshold_pct: args.roc_threshold,
        }),
        (Some(_), Some(_)) => bail!("--signals and --roc-period are mutually exclusive"),
        (None, None) => bail!("one of --signals or --roc-period is required"),
    }
}

fn run_label_cmd(inputs: &Inputs, output: &Path) -> Result<()> {
    let (config, candles) = load_inputs(inputs)?;
    let set = run_labeling(&config, &candles)?;
    let run_id = label_run_id(&config, &candles).context("failed to fingerprint labeling run")?;
    let dir = save_label_artifacts(&set, &candles, &run_id, output)?;

    let s = &set.summary;
    println!("Candles:        {}", s.candles);
    println!("Pivots:         {}", set.pivots.len());
    println!("Segments:       {}", set.segments.len());
    println!(
        "Labels:         {} up / {} down / {} neutral / {} unknown",
        s.impulse_up, s.impulse_down, s.neutral, s.unknown
    );
    println!(
        "Samples:        {} (shift {}, {} dropped)",
        s.samples, set.shift, s.dropped
    );
    println!("Artifacts:      {}", dir.display());
    Ok(())
}

fn run_backtest_cmd(inputs: &Inputs, signals: &SignalArgs, output: &Path) -> Result<()> {
    let (config, candles) = load_inputs(inputs)?;
    let spec = signal_spec(signals)?;
    let outcome = run_backtest_from_data(&config, &candles, &spec)?;
    print_summary(&outcome);
    let dir = save_artifacts(&outcome, output)?;
    println!("Artifacts:      {}", dir.display());
    Ok(())
}

fn run_walk_forward_cmd(
    inputs: &Inputs,
    signals: &SignalArgs,
    wf: &WalkForwardConfig,
    output: Option<&Path>,
) -> Result<()> {
    let (config, candles) = load_inputs(inputs)?;
    let spec = signal_spec(signals)?;
    let result = run_walk_forward(&config, &candles, &spec, wf)?;

    println!(
        "{:>4}  {:>13}  {:>13}  {:>10}  {:>10}",
        "fold", "is_sharpe", "oos_sharpe", "is_trades", "oos_trades"
    );
    for f in &result.folds {
        println!(
            "{:>4}  {:>13.4}  {:>13.4}  {:>10}  {:>10}",
            f.fold_index, f.is_sharpe, f.oos_sharpe, f.is_trades, f.oos_trades
        );
    }
    println!("Mean IS Sharpe:  {:.4}", result.mean_is_sharpe);
    println!("Mean OOS Sharpe: {:.4}", result.mean_oos_sharpe);
    match result.degradation_ratio {
        Some(ratio) => println!(
            "Degradation:     {ratio:.4} ({:?})",
            result.degradation_flag
        ),
        None => println!("Degradation:     n/a ({:?})", result.degradation_flag),
    }

    if let Some(dir) = output {
        save_walk_forward(&result, dir)?;
        println!("Artifacts:       {}", dir.display());
    }
    Ok(())
}

fn run_sweep_cmd(
    inputs: &Inputs,
    signals: &SignalArgs,
    grid: &ParamGrid,
    parallel: bool,
    output: Option<&Path>,
) -> Result<()> {
    let (config, candles) = load_inputs(inputs)?;
    let spec = signal_spec(signals)?;
    let results = ParamSweep::new()
        .with_parallelism(parallel)
        .sweep(grid, &config, &candles, &spec)?;

    println!(
        "{:>6}  {:>6}  {:>6}  {:>9}  {:>9}  {:>6}",
        "sl", "tp", "conf", "sharpe", "return", "trades"
    );
    for p in results.sorted_by_sharpe() {
        println!(
            "{:>6.3}  {:>6.3}  {:>6.2}  {:>9.4}  {:>8.2}%  {:>6}",
            p.stop_loss_pct,
            p.take_profit_pct,
            p.confidence_threshold,
            p.metrics.sharpe,
            p.metrics.total_return * 100.0,
            p.metrics.trade_count
        );
    }

    if let Some(dir) = output {
        save_sweep(&results, dir)?;
        println!("Artifacts: {}", dir.display());
    }
    Ok(())
}

fn print_summary(outcome: &BacktestOutcome) {
    let m = &outcome.result.metrics;
    let opt_pct = |v: Option<f64>| {
        v.map_or_else(|| "undefined".to_string(), |v| format!("{:.1}%", v * 100.0))
    };

    println!("Run id:         {}", outcome.fingerprint.run_id);
    println!("Signal source:  {}", outcome.signal_source);
    println!("Candles:        {}", outcome.candles);
    println!("Final capital:  {:.2}", m.final_capital);
    println!("Total return:   {:.2}%", m.total_return * 100.0);
    println!("Sharpe:         {:.4}", m.sharpe);
    println!("Sortino:        {:.4}", m.sortino);
    println!("Max drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Trades:         {}", m.trade_count);
    println!("Win rate:       {}", opt_pct(m.win_rate));
    println!("Profit factor:  {}", m.profit_factor);
    println!("Commission:     {:.2}", m.total_commission);
    println!("Max loss run:   {}", m.max_consecutive_losses);
    let counters = &outcome.result.counters;
    tracing::debug!(
        queried = counters.signals_queried,
        actionable = counters.actionable_signals,
        skipped = counters.candles.saturating_sub(counters.signals_queried),
        "signal counters"
    );
}
