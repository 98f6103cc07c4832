//! Exhaustive per-pair grid search over strategy parameters.
//!
//! Combinations are evaluated by a worker pool, but scores are reduced in
//! enumeration order with a strict `>` comparison, so the winner is
//! bit-identical to a sequential scan: the first combination reaching the
//! maximum cumulative return wins ties.

use crate::error::EngineError;
use crate::models::{OptimizationResult, Pair, ParameterSet, PriceTable};
use crate::performance::{cumulative_return, sharpe_ratio};
use crate::signals::compute_returns;
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::thread;

/// Parameter grid searched for every pair. Enumeration order is
/// window ▸ entry_z ▸ exit_z ▸ stop_z, outermost first.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    pub windows: Vec<usize>,
    pub entry_zs: Vec<f64>,
    pub exit_zs: Vec<f64>,
    pub stop_zs: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            windows: vec![60, 120, 252],
            entry_zs: vec![1.5, 2.0, 2.5],
            exit_zs: vec![0.0],
            stop_zs: vec![2.5, 3.0],
        }
    }
}

impl ParameterGrid {
    /// Reject empty dimensions and values no [`ParameterSet`] would accept,
    /// before any evaluation starts.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.windows.is_empty()
            || self.entry_zs.is_empty()
            || self.exit_zs.is_empty()
            || self.stop_zs.is_empty()
        {
            return Err(EngineError::InvalidParameter(
                "parameter grid has an empty dimension".to_string(),
            ));
        }
        for combo in self.combinations() {
            combo.validate()?;
        }
        Ok(())
    }

    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut combos = Vec::with_capacity(
            self.windows.len() * self.entry_zs.len() * self.exit_zs.len() * self.stop_zs.len(),
        );
        for &window in &self.windows {
            for &entry_z in &self.entry_zs {
                for &exit_z in &self.exit_zs {
                    for &stop_z in &self.stop_zs {
                        combos.push(ParameterSet {
                            window,
                            entry_z,
                            exit_z,
                            stop_z,
                        });
                    }
                }
            }
        }
        combos
    }
}

/// Find the best parameter combination for every pair. Results come back in
/// the order of `pairs`; a pair with no scorable combination is dropped with
/// a warning.
pub fn optimize(
    prices: &PriceTable,
    pairs: &[Pair],
    grid: &ParameterGrid,
) -> Result<Vec<OptimizationResult>, EngineError> {
    grid.validate()?;
    let combos = grid.combinations();
    if pairs.is_empty() {
        return Ok(Vec::new());
    }

    let total = pairs.len() * combos.len();
    info!(
        "optimizing {} pairs x {} combinations ({} backtests)",
        pairs.len(),
        combos.len(),
        total
    );

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let workers = num_cpus::get().max(1).min(total);
    let (task_tx, task_rx) = bounded::<(usize, usize)>(total);
    let (result_tx, result_rx) = bounded::<(usize, usize, Option<(f64, f64)>)>(total);

    let mut scores: Vec<Vec<Option<(f64, f64)>>> = vec![vec![None; combos.len()]; pairs.len()];

    thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let combos = &combos;
            let progress = &progress;
            scope.spawn(move || {
                while let Ok((pair_idx, combo_idx)) = task_rx.recv() {
                    let outcome = evaluate(prices, &pairs[pair_idx], &combos[combo_idx]);
                    progress.inc(1);
                    if result_tx.send((pair_idx, combo_idx, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(task_rx);
        drop(result_tx);

        for pair_idx in 0..pairs.len() {
            for combo_idx in 0..combos.len() {
                // The channel holds every task; send cannot block here.
                let _ = task_tx.send((pair_idx, combo_idx));
            }
        }
        drop(task_tx);

        for (pair_idx, combo_idx, outcome) in result_rx.iter() {
            scores[pair_idx][combo_idx] = outcome;
        }
    });
    progress.finish_and_clear();

    let mut results = Vec::with_capacity(pairs.len());
    for (pair_idx, pair) in pairs.iter().enumerate() {
        let mut best_score = f64::NEG_INFINITY;
        let mut best: Option<(usize, f64)> = None;
        for (combo_idx, outcome) in scores[pair_idx].iter().enumerate() {
            if let Some((cum, sharpe)) = outcome {
                if *cum > best_score {
                    best_score = *cum;
                    best = Some((combo_idx, *sharpe));
                }
            }
        }
        match best {
            Some((combo_idx, sharpe)) => results.push(OptimizationResult {
                pair: pair.name(),
                params: combos[combo_idx],
                cum_return: best_score,
                sharpe,
            }),
            None => warn!("{}: no scorable parameter combination, dropped", pair.name()),
        }
    }
    Ok(results)
}

fn evaluate(prices: &PriceTable, pair: &Pair, params: &ParameterSet) -> Option<(f64, f64)> {
    let series = compute_returns(prices, pair, params).ok()?;
    if series.values.is_empty() {
        return None;
    }
    Some((
        cumulative_return(&series.values),
        sharpe_ratio(&series.values),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn two_asset_table(first: Vec<f64>, second: Vec<f64>) -> PriceTable {
        let index: Vec<_> = (0..first.len() as i64)
            .map(|i| Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(i))
            .collect();
        PriceTable::new(
            index,
            vec![("A".to_string(), first), ("B".to_string(), second)],
        )
        .unwrap()
    }

    fn pair() -> Pair {
        Pair {
            first: "A".to_string(),
            second: "B".to_string(),
            hedge_ratio: 1.0,
        }
    }

    #[test]
    fn combinations_follow_enumeration_order() {
        let grid = ParameterGrid {
            windows: vec![10, 20],
            entry_zs: vec![1.0, 2.0],
            exit_zs: vec![0.0],
            stop_zs: vec![3.0, 4.0],
        };
        let combos = grid.combinations();
        assert_eq!(combos.len(), 8);
        assert_eq!((combos[0].window, combos[0].stop_z), (10, 3.0));
        assert_eq!((combos[1].window, combos[1].stop_z), (10, 4.0));
        assert_eq!(combos[2].entry_z, 2.0);
        assert_eq!(combos[4].window, 20);
    }

    #[test]
    fn default_grid_matches_documented_values() {
        let grid = ParameterGrid::default();
        assert_eq!(grid.windows, vec![60, 120, 252]);
        assert_eq!(grid.combinations().len(), 18);
    }

    #[test]
    fn invalid_grid_fails_fast() {
        let empty = ParameterGrid {
            windows: vec![],
            ..ParameterGrid::default()
        };
        assert!(empty.validate().is_err());

        let zero_window = ParameterGrid {
            windows: vec![0],
            ..ParameterGrid::default()
        };
        let prices = two_asset_table(vec![1.0; 30], vec![1.0; 30]);
        assert!(optimize(&prices, &[pair()], &zero_window).is_err());
    }

    #[test]
    fn no_pairs_yields_no_results() {
        let prices = two_asset_table(vec![1.0; 30], vec![1.0; 30]);
        let results = optimize(&prices, &[], &ParameterGrid::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn tie_breaks_keep_first_combination() {
        // Identical legs: the spread is constant, nothing ever trades, so
        // every combination scores exactly 0 and the first one must win.
        let leg: Vec<f64> = (0..80).map(|i| 100.0 + (i % 5) as f64).collect();
        let prices = two_asset_table(leg.clone(), leg);
        let grid = ParameterGrid {
            windows: vec![10, 20],
            entry_zs: vec![1.5, 2.0],
            exit_zs: vec![0.0],
            stop_zs: vec![2.5, 3.0],
        };

        let results = optimize(&prices, &[pair()], &grid).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].cum_return, 0.0);
        assert_eq!(results[0].params, grid.combinations()[0]);
    }

    #[test]
    fn single_combination_matches_direct_backtest() {
        let first: Vec<f64> = (0..120)
            .map(|i| 100.0 * (1.0 + 0.02 * (i as f64 * 0.8).sin()))
            .collect();
        let second: Vec<f64> = (0..120)
            .map(|i| 50.0 * (1.0 + 0.02 * (i as f64 * 0.8 + 1.0).sin()))
            .collect();
        let prices = two_asset_table(first, second);
        let params = ParameterSet {
            window: 15,
            entry_z: 1.5,
            exit_z: 0.0,
            stop_z: 3.0,
        };
        let grid = ParameterGrid {
            windows: vec![params.window],
            entry_zs: vec![params.entry_z],
            exit_zs: vec![params.exit_z],
            stop_zs: vec![params.stop_z],
        };

        let results = optimize(&prices, &[pair()], &grid).unwrap();
        assert_eq!(results.len(), 1);

        let series = compute_returns(&prices, &pair(), &params).unwrap();
        assert_eq!(results[0].cum_return, cumulative_return(&series.values));
        assert_eq!(results[0].sharpe, sharpe_ratio(&series.values));
        assert_eq!(results[0].params, params);
    }
}
