//! Engle–Granger two-step cointegration test.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::adf::{adf_statistic, Deterministic};
use super::mackinnon::mackinnon_p;
use super::ols::ols;
use super::NumericError;

/// Shortest series the test accepts.
pub const MIN_OBSERVATIONS: usize = 10;

/// Outcome of one Engle–Granger test of `y` against `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngleGranger {
    /// ADF t-statistic of the step-one residuals. `-inf` for perfectly collinear inputs.
    pub statistic: f64,
    /// Approximate probability that `y` and `x` are not cointegrated.
    pub p_value: f64,
    /// Slope of `y` on `x`.
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub used_lag: usize,
}

fn is_constant(s: &[f64]) -> bool {
    s.iter().all(|v| *v == s[0])
}

/// Test whether `y` and `x` are cointegrated.
///
/// Step one regresses `y` on `[1, x]`; step two runs an ADF regression
/// without deterministic terms on the residuals, with AIC lag selection. The
/// p-value comes from the two-variable MacKinnon surface.
pub fn engle_granger(y: &[f64], x: &[f64]) -> Result<EngleGranger, NumericError> {
    if y.len() != x.len() {
        return Err(NumericError::LengthMismatch {
            left: y.len(),
            right: x.len(),
        });
    }
    let n = y.len();
    if n < MIN_OBSERVATIONS {
        return Err(NumericError::TooShort {
            len: n,
            min: MIN_OBSERVATIONS,
        });
    }
    if y.iter().chain(x).any(|v| !v.is_finite()) {
        return Err(NumericError::NonFinite);
    }
    if is_constant(y) || is_constant(x) {
        return Err(NumericError::ZeroVariance);
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let target = DVector::from_column_slice(y);
    let fit = ols(&design, &target)?;
    let intercept = fit.params[0];
    let hedge_ratio = fit.params[1];

    // Residuals of an exact linear relation carry no unit-root information.
    let collinear_r2 = 1.0 - 100.0 * f64::EPSILON.sqrt();
    if fit.r_squared(&target) >= collinear_r2 {
        return Ok(EngleGranger {
            statistic: f64::NEG_INFINITY,
            p_value: 0.0,
            hedge_ratio,
            intercept,
            used_lag: 0,
        });
    }

    let stat = adf_statistic(fit.residuals.as_slice(), Deterministic::None, None)?;
    let p_value = mackinnon_p(stat.statistic, 2).ok_or(NumericError::NonFinite)?;

    Ok(EngleGranger {
        statistic: stat.statistic,
        p_value,
        hedge_ratio,
        intercept,
        used_lag: stat.used_lag,
    })
}
