//! Augmented Dickey–Fuller unit-root regression.
//!
//! `Δx_t = [c +] γ·x_{t−1} + Σ_{i=1..p} φ_i·Δx_{t−i} + ε_t`, with the lag
//! order `p` chosen by AIC over `0..=maxlag` on a common sample, then refit on
//! the longest sample that lag order allows. The statistic is the t-value of γ.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::mackinnon::mackinnon_p;
use super::ols::ols;
use super::NumericError;

/// Deterministic terms in the test regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deterministic {
    /// No constant. Used on cointegration residuals, which are mean-zero by construction.
    None,
    Constant,
}

impl Deterministic {
    fn n_terms(self) -> usize {
        match self {
            Deterministic::None => 0,
            Deterministic::Constant => 1,
        }
    }
}

/// ADF statistic and the regression it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfStatistic {
    pub statistic: f64,
    pub used_lag: usize,
    pub nobs: usize,
}

/// Single-series ADF result with its MacKinnon p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
}

/// Schwert's rule `ceil(12·(n/100)^{1/4})`, capped at `(n − terms − 3)/2`.
///
/// The cap leaves the widest lag regression on the common sample at least
/// one residual degree of freedom.
pub fn default_max_lag(n: usize, det: Deterministic) -> Result<usize, NumericError> {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let cap = n
        .checked_sub(det.n_terms() + 3)
        .map(|room| room / 2)
        .ok_or(NumericError::TooShort {
            len: n,
            min: det.n_terms() + 3,
        })?;
    Ok(schwert.min(cap))
}

/// Design for `lags` lagged differences, using the rows available after
/// dropping the first `sample_lag` differences.
fn design(
    x: &[f64],
    diffs: &[f64],
    sample_lag: usize,
    lags: usize,
    det: Deterministic,
) -> (DMatrix<f64>, DVector<f64>) {
    let nobs = diffs.len() - sample_lag;
    let ncols = 1 + lags + det.n_terms();
    let mut m = DMatrix::zeros(nobs, ncols);
    for r in 0..nobs {
        let t = sample_lag + r;
        m[(r, 0)] = x[t];
        for i in 1..=lags {
            m[(r, i)] = diffs[t - i];
        }
        if det == Deterministic::Constant {
            m[(r, ncols - 1)] = 1.0;
        }
    }
    let y = DVector::from_column_slice(&diffs[sample_lag..]);
    (m, y)
}

/// ADF statistic with AIC lag selection. `max_lag = None` uses [`default_max_lag`].
pub fn adf_statistic(
    series: &[f64],
    det: Deterministic,
    max_lag: Option<usize>,
) -> Result<AdfStatistic, NumericError> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(NumericError::NonFinite);
    }
    let n = series.len();
    let max_lag = match max_lag {
        Some(lag) => lag,
        None => default_max_lag(n, det)?,
    };
    // Common sample: n − 1 − max_lag rows against 1 + max_lag + terms columns.
    let min_len = 2 * max_lag + det.n_terms() + 3;
    if n < min_len {
        return Err(NumericError::TooShort { len: n, min: min_len });
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the common sample.
    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lag {
        let (x, y) = design(series, &diffs, max_lag, lags, det);
        let Ok(fit) = ols(&x, &y) else { continue };
        let aic = fit.aic();
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lags));
        }
    }
    let (_, used_lag) = best.ok_or(NumericError::Singular)?;

    let (x, y) = design(series, &diffs, used_lag, used_lag, det);
    let fit = ols(&x, &y)?;
    let statistic = fit.t_value(0);
    if statistic.is_nan() {
        return Err(NumericError::NonFinite);
    }

    Ok(AdfStatistic {
        statistic,
        used_lag,
        nobs: fit.nobs,
    })
}

/// ADF test with a constant on one series, with its MacKinnon p-value.
pub fn adf_test(series: &[f64]) -> Result<AdfResult, NumericError> {
    let stat = adf_statistic(series, Deterministic::Constant, None)?;
    let p_value = mackinnon_p(stat.statistic, 1).unwrap_or(f64::NAN);
    Ok(AdfResult {
        statistic: stat.statistic,
        p_value,
        used_lag: stat.used_lag,
        nobs: stat.nobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-normal noise (sum of uniforms from an LCG).
    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                let mut acc = 0.0;
                for _ in 0..12 {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    acc += (state >> 11) as f64 / (1u64 << 53) as f64;
                }
                acc - 6.0
            })
            .collect()
    }

    #[test]
    fn default_max_lag_follows_schwert_rule() {
        assert_eq!(default_max_lag(60, Deterministic::None).unwrap(), 11);
        assert_eq!(default_max_lag(100, Deterministic::None).unwrap(), 12);
        assert_eq!(default_max_lag(10, Deterministic::Constant).unwrap(), 3);
        assert!(default_max_lag(3, Deterministic::Constant).is_err());
    }

    #[test]
    fn default_max_lag_leaves_residual_degrees_of_freedom() {
        for det in [Deterministic::None, Deterministic::Constant] {
            for n in (det.n_terms() + 3)..=40 {
                let p = default_max_lag(n, det).unwrap();
                let nobs = n - 1 - p;
                let ncols = 1 + p + det.n_terms();
                assert!(nobs > ncols, "n={n} p={p} nobs={nobs} ncols={ncols}");
            }
        }
    }

    #[test]
    fn short_even_series_get_a_finite_statistic() {
        for n in 10..=30 {
            let x = noise(40 + n as u64, n);
            let stat = adf_statistic(&x, Deterministic::None, None)
                .unwrap_or_else(|e| panic!("n={n}: {e}"));
            assert!(stat.statistic.is_finite(), "n={n}");
        }
    }

    #[test]
    fn explicit_lag_too_wide_for_the_sample_is_rejected() {
        let x = noise(9, 12);
        assert!(matches!(
            adf_statistic(&x, Deterministic::None, Some(5)),
            Err(NumericError::TooShort { len: 12, min: 13 })
        ));
        assert!(adf_statistic(&x, Deterministic::None, Some(4)).is_ok());
    }

    #[test]
    fn white_noise_is_stationary() {
        let x = noise(7, 200);
        let res = adf_test(&x).unwrap();
        assert!(res.statistic < -3.5, "stat = {}", res.statistic);
        assert!(res.p_value < 0.01);
    }

    #[test]
    fn random_walk_is_not_rejected() {
        let mut level = 0.0;
        let walk: Vec<f64> = noise(16, 200)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();
        let res = adf_test(&walk).unwrap();
        assert!(res.p_value > 0.05, "p = {}", res.p_value);
    }

    #[test]
    fn nan_input_is_rejected() {
        let mut x = noise(3, 50);
        x[10] = f64::NAN;
        assert!(matches!(
            adf_statistic(&x, Deterministic::None, None),
            Err(NumericError::NonFinite)
        ));
    }

    #[test]
    fn fixed_lag_is_respected() {
        let x = noise(5, 80);
        let stat = adf_statistic(&x, Deterministic::None, Some(0)).unwrap();
        assert_eq!(stat.used_lag, 0);
        assert_eq!(stat.nobs, 79);
    }
}
