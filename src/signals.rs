//! Signal generation for a single pair: hedged log-spread, rolling z-score,
//! threshold state machine and realized per-period returns.

use crate::error::EngineError;
use crate::models::{Pair, ParameterSet, PriceTable, ReturnSeries};
use crate::stats::rolling_mean_std;

/// Compute the realized per-period return series for `pair` under `params`.
///
/// The spread is log(first) − hedge_ratio·log(second) on the periods where
/// both assets have valid prices. Its rolling z-score drives a three-state
/// machine (flat, long spread, short spread); positions take effect one
/// period after the decision, so a return never uses information from its
/// own period. Output length equals the aligned input length; periods before
/// the window fills contribute zero.
pub fn compute_returns(
    prices: &PriceTable,
    pair: &Pair,
    params: &ParameterSet,
) -> Result<ReturnSeries, EngineError> {
    params.validate()?;

    let Some(aligned) = prices.align_pair(&pair.first, &pair.second) else {
        return Ok(ReturnSeries {
            name: pair.name(),
            index: Vec::new(),
            values: Vec::new(),
        });
    };

    let n = aligned.first.len();
    let log_first: Vec<f64> = aligned.first.iter().map(|p| p.ln()).collect();
    let log_second: Vec<f64> = aligned.second.iter().map(|p| p.ln()).collect();
    let spread: Vec<f64> = log_first
        .iter()
        .zip(log_second.iter())
        .map(|(a, b)| a - pair.hedge_ratio * b)
        .collect();

    let zscores = rolling_zscore(&spread, params.window);
    let positions = position_series(&zscores, params);

    // Decisions at t are executed at t+1. Per-asset returns are simple
    // percentage changes of the raw prices.
    let mut values = vec![0.0; n];
    for t in 1..n {
        let held = positions[t - 1];
        if held == 0 {
            continue;
        }
        let r_first = aligned.first[t] / aligned.first[t - 1] - 1.0;
        let r_second = aligned.second[t] / aligned.second[t - 1] - 1.0;
        let ret = held as f64 * (r_first - pair.hedge_ratio * r_second);
        if ret.is_finite() {
            values[t] = ret;
        }
    }

    Ok(ReturnSeries {
        name: pair.name(),
        index: aligned.index,
        values,
    })
}

/// Rolling z-score of `spread` over a trailing `window`. Undefined values
/// (unfilled window, zero or non-finite rolling std) are NaN so that no
/// threshold comparison can trigger on them.
pub(crate) fn rolling_zscore(spread: &[f64], window: usize) -> Vec<f64> {
    let (means, stds) = rolling_mean_std(spread, window);
    spread
        .iter()
        .zip(means.iter().zip(stds.iter()))
        .map(|(&s, (&m, &sd))| {
            if sd.is_finite() && sd > 0.0 {
                (s - m) / sd
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Step the threshold state machine over the z-score series, returning the
/// decided position for every period: +1 long spread, −1 short spread, 0
/// flat. The walk starts at index `window`; everything before is flat.
///
/// NaN z-scores fail every comparison, so they neither open nor close a
/// position.
pub(crate) fn position_series(zscores: &[f64], params: &ParameterSet) -> Vec<i32> {
    let n = zscores.len();
    let mut positions = vec![0i32; n];
    if params.window >= n {
        return positions;
    }

    let mut in_trade = false;
    let mut trade_side = 0i32;
    for t in params.window..n {
        let z = zscores[t];
        if !in_trade {
            if z > params.entry_z {
                in_trade = true;
                trade_side = -1;
                positions[t] = -1;
            } else if z < -params.entry_z {
                in_trade = true;
                trade_side = 1;
                positions[t] = 1;
            }
        } else {
            let take_profit = (trade_side == 1 && z >= params.exit_z)
                || (trade_side == -1 && z <= params.exit_z);
            let stop_out = (trade_side == 1 && z < -params.stop_z)
                || (trade_side == -1 && z > params.stop_z);
            if take_profit || stop_out {
                in_trade = false;
                trade_side = 0;
                positions[t] = 0;
            } else {
                positions[t] = trade_side;
            }
        }
    }
    positions
}
