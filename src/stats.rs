//! Statistical primitives for pair selection and signal generation:
//! Pearson correlation, ordinary least squares, trailing rolling moments,
//! and an augmented Dickey-Fuller stationarity test with MacKinnon (1994)
//! approximate p-values.

use statrs::function::erf::erf;

/// MacKinnon regression-surface coefficients for the constant-only case.
/// Evaluated as a polynomial in the test statistic; the standard normal CDF
/// of the result approximates the p-value.
const TAU_MAX_C: f64 = 2.74;
const TAU_MIN_C: f64 = -18.83;
const TAU_STAR_C: f64 = -1.61;
const TAU_C_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_C_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// Pearson correlation coefficient between two equal-length series.
/// Returns None when the series are too short, mismatched, degenerate
/// (zero variance), or the result is not finite.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }

    let correlation = covariance / (var_a.sqrt() * var_b.sqrt());
    correlation.is_finite().then_some(correlation)
}

/// Simple OLS of y on x with an intercept. Returns (slope, intercept),
/// or None when x has no variance.
pub fn ols_slope_intercept(y: &[f64], x: &[f64]) -> Option<(f64, f64)> {
    if y.len() != x.len() || y.len() < 2 {
        return None;
    }

    let n = y.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x) * (xi - mean_x);
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    (slope.is_finite() && intercept.is_finite()).then_some((slope, intercept))
}

/// First differences of a series.
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Trailing rolling mean and sample standard deviation over `window`
/// periods. Indices before the first complete window are NaN. A window of 1
/// has an undefined standard deviation (NaN throughout).
pub fn rolling_mean_std(values: &[f64], window: usize) -> (Vec<f64>, Vec<f64>) {
    let n = values.len();
    let mut means = vec![f64::NAN; n];
    let mut stds = vec![f64::NAN; n];
    if window == 0 || window > n {
        return (means, stds);
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        sum_sq += v * v;
        if i >= window {
            let dropped = values[i - window];
            sum -= dropped;
            sum_sq -= dropped * dropped;
        }
        if i + 1 >= window {
            let w = window as f64;
            let mean = sum / w;
            means[i] = mean;
            if window > 1 {
                let variance = ((sum_sq - sum * sum / w) / (w - 1.0)).max(0.0);
                stds[i] = variance.sqrt();
            }
        }
    }

    (means, stds)
}

/// Result of an augmented Dickey-Fuller test with a constant term.
#[derive(Debug, Clone, Copy)]
pub struct AdfResult {
    /// t-statistic of the lagged-level coefficient (more negative means
    /// stronger evidence of stationarity).
    pub statistic: f64,
    /// MacKinnon approximate p-value for the null of a unit root.
    pub p_value: f64,
    /// Number of lagged-difference terms selected.
    pub lags: usize,
}

struct AdfFit {
    ssr: f64,
    nobs: usize,
    t_level: f64,
}

/// Augmented Dickey-Fuller unit-root test on `series`.
///
/// Regresses Δy[t] on a constant, y[t−1] and `lags` lagged differences. The
/// lag order is selected by AIC over 0..=maxlag on a common sample, with
/// maxlag defaulting to Schwert's ⌊12·(n/100)^0.25⌋ rule, then the
/// regression is refit at the chosen order. Returns None for series too
/// short or too degenerate to test; callers treat that as a rejection.
pub fn adf_test(series: &[f64], maxlag: Option<usize>) -> Option<AdfResult> {
    let n = series.len();
    if n < 20 {
        return None;
    }

    let dy = diff(series);
    let nobs = dy.len();
    let default_max = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let maxlag = maxlag
        .unwrap_or(default_max)
        .min(nobs.saturating_sub(1) / 2)
        .min(nobs.saturating_sub(10));

    // Lag selection on the sample trimmed to maxlag so every candidate sees
    // the same observations.
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=maxlag {
        let Some(fit) = fit_adf_regression(series, &dy, lag, maxlag) else {
            continue;
        };
        let nf = fit.nobs as f64;
        let k = lag as f64 + 2.0;
        let aic = nf * (fit.ssr / nf).ln() + 2.0 * k;
        if !aic.is_finite() {
            continue;
        }
        if best.map(|(b, _)| aic < b).unwrap_or(true) {
            best = Some((aic, lag));
        }
    }

    let (_, lags) = best?;
    let fit = fit_adf_regression(series, &dy, lags, lags)?;
    let statistic = fit.t_level;
    Some(AdfResult {
        statistic,
        p_value: mackinnon_pvalue(statistic),
        lags,
    })
}

/// Fit Δy[t] = α + γ·y[t−1] + Σ βᵢ·Δy[t−i] + ε for t in start..len(Δy),
/// returning the sum of squared residuals and the t-statistic of γ.
fn fit_adf_regression(series: &[f64], dy: &[f64], lag: usize, start: usize) -> Option<AdfFit> {
    let k = lag + 2;
    let nobs = dy.len().checked_sub(start)?;
    if nobs < k + 3 {
        return None;
    }

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(nobs);
    let mut response: Vec<f64> = Vec::with_capacity(nobs);
    for t in start..dy.len() {
        let mut row = Vec::with_capacity(k);
        row.push(1.0);
        row.push(series[t]);
        for i in 1..=lag {
            row.push(dy[t - i]);
        }
        rows.push(row);
        response.push(dy[t]);
    }

    // Normal equations X'X b = X'y.
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &y) in rows.iter().zip(response.iter()) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let coeffs = solve_linear(xtx.clone(), xty)?;

    let mut ssr = 0.0;
    for (row, &y) in rows.iter().zip(response.iter()) {
        let predicted: f64 = row.iter().zip(coeffs.iter()).map(|(x, b)| x * b).sum();
        let residual = y - predicted;
        ssr += residual * residual;
    }

    // Standard error of γ from the (1,1) element of s²·(X'X)⁻¹.
    let s2 = ssr / (nobs - k) as f64;
    let mut e1 = vec![0.0; k];
    e1[1] = 1.0;
    let inv_col = solve_linear(xtx, e1)?;
    let var_gamma = s2 * inv_col[1];
    if !(var_gamma.is_finite() && var_gamma > 0.0) {
        return None;
    }

    let t_level = coeffs[1] / var_gamma.sqrt();
    t_level.is_finite().then_some(AdfFit { ssr, nobs, t_level })
}

/// Solve A·x = b by Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_mag = a[col][col].abs();
        for row in (col + 1)..n {
            let mag = a[row][col].abs();
            if mag > pivot_mag {
                pivot_row = row;
                pivot_mag = mag;
            }
        }
        if pivot_mag < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for j in (col + 1)..n {
            sum -= a[col][j] * x[j];
        }
        x[col] = sum / a[col][col];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// MacKinnon (1994) approximate p-value for a Dickey-Fuller t-statistic
/// from a regression with a constant and no trend.
pub fn mackinnon_pvalue(statistic: f64) -> f64 {
    if !statistic.is_finite() {
        return 1.0;
    }
    if statistic > TAU_MAX_C {
        return 1.0;
    }
    if statistic < TAU_MIN_C {
        return 0.0;
    }

    let z = if statistic <= TAU_STAR_C {
        polyval(&TAU_C_SMALLP, statistic)
    } else {
        polyval(&TAU_C_LARGEP, statistic)
    };
    let p = 0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2));
    p.clamp(0.0, 1.0)
}

fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * x + c)
}
