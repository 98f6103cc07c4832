use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use pairscan::data::load_prices;
use pairscan::performance::{aggregate_returns, cumulative_return};
use pairscan::{compute_returns, optimize, select_pairs, ParameterGrid, Pair, PriceTable};
use std::cmp::Ordering;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pairscan",
    about = "Pairs-trading backtester and parameter optimizer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover cointegrated pairs in a price CSV
    Discover {
        /// Wide CSV file: date,ASSET1,ASSET2,...
        data_file: PathBuf,

        /// Minimum log-return correlation (strict)
        #[arg(long, default_value_t = 0.6)]
        corr_threshold: f64,

        /// ADF p-value cutoff for the spread
        #[arg(long, default_value_t = 0.05)]
        coint_pvalue: f64,
    },
    /// Discover pairs, grid-search strategy parameters and report the best backtests
    Backtest {
        /// Wide CSV file: date,ASSET1,ASSET2,...
        data_file: PathBuf,

        /// Minimum log-return correlation (strict)
        #[arg(long, default_value_t = 0.6)]
        corr_threshold: f64,

        /// ADF p-value cutoff for the spread
        #[arg(long, default_value_t = 0.05)]
        coint_pvalue: f64,

        /// Rolling window lengths to search
        #[arg(long, value_delimiter = ',', default_values_t = [60, 120, 252])]
        windows: Vec<usize>,

        /// Entry z-score thresholds to search
        #[arg(long, value_delimiter = ',', default_values_t = [1.5, 2.0, 2.5])]
        entry_z: Vec<f64>,

        /// Exit z-score levels to search
        #[arg(long, value_delimiter = ',', default_values_t = [0.0])]
        exit_z: Vec<f64>,

        /// Stop z-score thresholds to search
        #[arg(long, value_delimiter = ',', default_values_t = [2.5, 3.0])]
        stop_z: Vec<f64>,

        /// Write the result table to this file as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Discover {
            data_file,
            corr_threshold,
            coint_pvalue,
        } => run_discover(&data_file, corr_threshold, coint_pvalue),
        Commands::Backtest {
            data_file,
            corr_threshold,
            coint_pvalue,
            windows,
            entry_z,
            exit_z,
            stop_z,
            output,
        } => {
            let grid = ParameterGrid {
                windows,
                entry_zs: entry_z,
                exit_zs: exit_z,
                stop_zs: stop_z,
            };
            run_backtest(&data_file, corr_threshold, coint_pvalue, grid, output)
        }
    }
}

fn load_and_select(
    data_file: &PathBuf,
    corr_threshold: f64,
    coint_pvalue: f64,
) -> Result<(PriceTable, Vec<Pair>)> {
    let prices = load_prices(data_file)
        .with_context(|| format!("loading prices from {}", data_file.display()))?;
    let pairs = select_pairs(&prices, corr_threshold, coint_pvalue);
    Ok((prices, pairs))
}

fn run_discover(data_file: &PathBuf, corr_threshold: f64, coint_pvalue: f64) -> Result<()> {
    let (_, pairs) = load_and_select(data_file, corr_threshold, coint_pvalue)?;
    if pairs.is_empty() {
        println!("No cointegrated pairs found.");
        return Ok(());
    }

    println!("{:<20} {:>12}", "Pair", "Hedge ratio");
    println!("{}", "-".repeat(33));
    for pair in &pairs {
        println!("{:<20} {:>12.4}", pair.name(), pair.hedge_ratio);
    }
    Ok(())
}

fn run_backtest(
    data_file: &PathBuf,
    corr_threshold: f64,
    coint_pvalue: f64,
    grid: ParameterGrid,
    output: Option<PathBuf>,
) -> Result<()> {
    let (prices, pairs) = load_and_select(data_file, corr_threshold, coint_pvalue)?;
    if pairs.is_empty() {
        println!("No cointegrated pairs found; nothing to backtest.");
        return Ok(());
    }

    let results = optimize(&prices, &pairs, &grid)?;

    // Re-run each winner once to build the portfolio series.
    let mut winning_series = Vec::with_capacity(results.len());
    for result in &results {
        let pair = pairs
            .iter()
            .find(|p| p.name() == result.pair)
            .context("optimizer returned an unknown pair")?;
        winning_series.push(compute_returns(&prices, pair, &result.params)?);
    }
    let portfolio = aggregate_returns(&winning_series);
    let portfolio_return = cumulative_return(&portfolio.values);

    let mut table = results.clone();
    table.sort_by(|a, b| {
        b.cum_return
            .partial_cmp(&a.cum_return)
            .unwrap_or(Ordering::Equal)
    });

    println!(
        "{:<20} {:>8} {:>9} {:>8} {:>8} {:>12} {:>9}",
        "Pair", "Window", "Entry z", "Exit z", "Stop z", "Cum return", "Sharpe"
    );
    println!("{}", "-".repeat(80));
    for row in &table {
        println!(
            "{:<20} {:>8} {:>9.2} {:>8.2} {:>8.2} {:>11.2}% {:>9.2}",
            row.pair,
            row.params.window,
            row.params.entry_z,
            row.params.exit_z,
            row.params.stop_z,
            row.cum_return * 100.0,
            row.sharpe
        );
    }
    println!();
    println!("Portfolio cumulative return: {:.2}%", portfolio_return * 100.0);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&table)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote results to {}", path.display());
    }
    Ok(())
}
