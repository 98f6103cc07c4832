//! Performance metrics over per-period return series.

use crate::models::ReturnSeries;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

/// Compound return over the whole series: ∏(1 + r) − 1.
pub fn cumulative_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Annualized Sharpe-like ratio: mean over (sample std + 1e-9), scaled by
/// √252. The epsilon keeps all-zero series at 0 instead of NaN. No
/// risk-free rate is subtracted.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.mean();
    let std_dev = returns.std_dev();
    mean / (std_dev + 1e-9) * TRADING_PERIODS_PER_YEAR.sqrt()
}

/// Cumulative-return path: element t is the compound return through t.
pub fn cumulative_return_series(returns: &[f64]) -> Vec<f64> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r;
            acc - 1.0
        })
        .collect()
}

/// Portfolio return series: the per-period sum across pairs, aligned on the
/// union of their time indexes. A pair missing a period contributes zero for
/// that period.
pub fn aggregate_returns(series: &[ReturnSeries]) -> ReturnSeries {
    let mut totals: BTreeMap<chrono::DateTime<chrono::Utc>, f64> = BTreeMap::new();
    for s in series {
        for (ts, value) in s.index.iter().zip(s.values.iter()) {
            *totals.entry(*ts).or_insert(0.0) += value;
        }
    }

    let (index, values) = totals.into_iter().unzip();
    ReturnSeries {
        name: "portfolio".to_string(),
        index,
        values,
    }
}
