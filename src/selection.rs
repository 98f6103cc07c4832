//! Candidate pair discovery: correlation pre-filter on log returns, hedge
//! ratio by OLS, cointegration check by ADF on the hedged log-spread.

use crate::models::{Pair, PriceTable};
use crate::stats::{adf_test, diff, ols_slope_intercept, pearson_correlation};
use log::{debug, info};
use rayon::prelude::*;

/// Scan every unordered asset pair of `prices` and keep those whose
/// log-return correlation strictly exceeds `corr_threshold` and whose hedged
/// log-spread is stationary at the `coint_pvalue` level.
///
/// Candidates are evaluated in parallel but returned in scan order: (0,1),
/// (0,2), ..., so the result is independent of thread scheduling. Pairs that
/// cannot be evaluated (no common periods, degenerate series) are skipped.
pub fn select_pairs(prices: &PriceTable, corr_threshold: f64, coint_pvalue: f64) -> Vec<Pair> {
    let assets = prices.assets();
    let mut candidates = Vec::new();
    for i in 0..assets.len() {
        for j in (i + 1)..assets.len() {
            candidates.push((assets[i].clone(), assets[j].clone()));
        }
    }
    info!(
        "scanning {} candidate pairs across {} assets",
        candidates.len(),
        assets.len()
    );

    let mut selected: Vec<(usize, Pair)> = candidates
        .par_iter()
        .enumerate()
        .filter_map(|(rank, (a, b))| {
            evaluate_candidate(prices, a, b, corr_threshold, coint_pvalue).map(|p| (rank, p))
        })
        .collect();
    selected.sort_by_key(|(rank, _)| *rank);

    let pairs: Vec<Pair> = selected.into_iter().map(|(_, p)| p).collect();
    info!("selected {} cointegrated pairs", pairs.len());
    pairs
}

fn evaluate_candidate(
    prices: &PriceTable,
    a: &str,
    b: &str,
    corr_threshold: f64,
    coint_pvalue: f64,
) -> Option<Pair> {
    let aligned = prices.align_pair(a, b)?;
    let log_a: Vec<f64> = aligned.first.iter().map(|p| p.ln()).collect();
    let log_b: Vec<f64> = aligned.second.iter().map(|p| p.ln()).collect();

    let returns_a = diff(&log_a);
    let returns_b = diff(&log_b);
    let correlation = pearson_correlation(&returns_a, &returns_b)?;
    if correlation <= corr_threshold {
        debug!("{}/{}: correlation {:.3} below threshold", a, b, correlation);
        return None;
    }

    let (hedge_ratio, _) = ols_slope_intercept(&log_a, &log_b)?;
    let spread: Vec<f64> = log_a
        .iter()
        .zip(log_b.iter())
        .map(|(la, lb)| la - hedge_ratio * lb)
        .collect();

    let adf = adf_test(&spread, None)?;
    if adf.p_value < coint_pvalue {
        info!(
            "{}/{}: corr {:.3}, beta {:.3}, ADF {:.3} (p={:.4}, lags={})",
            a, b, correlation, hedge_ratio, adf.statistic, adf.p_value, adf.lags
        );
        Some(Pair {
            first: a.to_string(),
            second: b.to_string(),
            hedge_ratio,
        })
    } else {
        debug!(
            "{}/{}: spread not stationary (ADF p={:.4})",
            a, b, adf.p_value
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceTable;
    use chrono::{Duration, TimeZone, Utc};
    use rand::distributions::Distribution;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use statrs::distribution::Normal;

    fn table(columns: Vec<(String, Vec<f64>)>) -> PriceTable {
        let n = columns[0].1.len();
        let index: Vec<_> = (0..n as i64)
            .map(|i| Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(i))
            .collect();
        PriceTable::new(index, columns).unwrap()
    }

    fn normal_draws(seed: u64, n: usize, std_dev: f64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, std_dev).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    /// Shared geometric random-walk log level for cointegrated fixtures.
    fn base_log_walk(seed: u64, n: usize) -> Vec<f64> {
        let mut level = 100.0f64.ln();
        normal_draws(seed, n, 0.02)
            .into_iter()
            .map(|step| {
                level += step;
                level
            })
            .collect()
    }

    #[test]
    fn uncorrelated_assets_are_rejected() {
        // Opposite deterministic oscillations: strongly negative correlation.
        let a: Vec<f64> = (0..100)
            .map(|i| 100.0 * (1.0 + 0.01 * (i as f64 * 0.7).sin()))
            .collect();
        let b: Vec<f64> = (0..100)
            .map(|i| 50.0 * (1.0 - 0.01 * (i as f64 * 0.7).sin()))
            .collect();
        let prices = table(vec![("A".to_string(), a), ("B".to_string(), b)]);
        assert!(select_pairs(&prices, 0.6, 0.05).is_empty());
    }

    #[test]
    fn tied_assets_with_stationary_spread_are_selected() {
        // B is a geometric random walk, A tracks it with small iid noise so
        // the log spread is stationary by construction. A noiseless
        // deterministic fixture is no good here: the ADF lag regression can
        // fit an exact recurrence to machine precision, and the resulting
        // t-statistic is meaningless.
        let log_b = base_log_walk(17, 260);
        let noise = normal_draws(18, 260, 0.005);
        let a: Vec<f64> = log_b
            .iter()
            .zip(noise.iter())
            .map(|(lb, e)| (lb + e).exp())
            .collect();
        let b: Vec<f64> = log_b.iter().map(|v| v.exp()).collect();
        let prices = table(vec![("A".to_string(), a), ("B".to_string(), b)]);

        let pairs = select_pairs(&prices, 0.6, 0.05);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].first, "A");
        assert_eq!(pairs[0].second, "B");
        assert!(
            (pairs[0].hedge_ratio - 1.0).abs() < 0.15,
            "hedge ratio was {}",
            pairs[0].hedge_ratio
        );
    }

    #[test]
    fn scan_order_is_column_order() {
        let base = base_log_walk(23, 260);
        let mk = |seed: u64| -> Vec<f64> {
            base.iter()
                .zip(normal_draws(seed, 260, 0.005))
                .map(|(lb, e)| (lb + e).exp())
                .collect()
        };
        let prices = table(vec![
            ("X".to_string(), mk(31)),
            ("Y".to_string(), mk(32)),
            ("Z".to_string(), mk(33)),
        ]);

        let pairs = select_pairs(&prices, 0.6, 0.05);
        assert!(!pairs.is_empty());
        let names: Vec<String> = pairs.iter().map(|p| p.name()).collect();
        let mut expected_order = Vec::new();
        for candidate in ["X_Y", "X_Z", "Y_Z"] {
            if names.contains(&candidate.to_string()) {
                expected_order.push(candidate.to_string());
            }
        }
        assert_eq!(names, expected_order);
    }
}
