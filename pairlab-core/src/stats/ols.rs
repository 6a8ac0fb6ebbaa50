//! Ordinary least squares on small dense designs.

use nalgebra::{DMatrix, DVector};

use super::NumericError;

/// A fitted OLS regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
    xtx_inv: DMatrix<f64>,
}

impl OlsFit {
    pub fn k(&self) -> usize {
        self.params.len()
    }

    pub fn df_resid(&self) -> usize {
        self.nobs.saturating_sub(self.k())
    }

    /// Standard error of coefficient `j`.
    pub fn std_err(&self, j: usize) -> f64 {
        let df = self.df_resid();
        if df == 0 {
            return f64::NAN;
        }
        let sigma2 = self.ssr / df as f64;
        (sigma2 * self.xtx_inv[(j, j)]).sqrt()
    }

    /// t-statistic of coefficient `j`.
    pub fn t_value(&self, j: usize) -> f64 {
        self.params[j] / self.std_err(j)
    }

    /// Akaike information criterion (Gaussian likelihood).
    ///
    /// Only differences between fits on the same sample are meaningful.
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.k() as f64
    }

    /// Coefficient of determination against the centered total sum of squares.
    pub fn r_squared(&self, y: &DVector<f64>) -> f64 {
        let mean = y.mean();
        let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        1.0 - self.ssr / tss
    }
}

/// Fit `y = X·β + ε` through the normal equations.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, NumericError> {
    if x.nrows() != y.len() {
        return Err(NumericError::LengthMismatch {
            left: x.nrows(),
            right: y.len(),
        });
    }
    if x.nrows() < x.ncols() {
        return Err(NumericError::TooShort {
            len: x.nrows(),
            min: x.ncols(),
        });
    }

    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse().ok_or(NumericError::Singular)?;
    let params = &xtx_inv * (&xt * y);
    let residuals = y - x * &params;
    let ssr = residuals.norm_squared();

    Ok(OlsFit {
        params,
        residuals,
        ssr,
        nobs: x.nrows(),
        xtx_inv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let x = DMatrix::from_fn(5, 2, |i, j| if j == 0 { 1.0 } else { xs[i] });
        let y = DVector::from_iterator(5, xs.iter().map(|v| 2.0 + 3.0 * v));
        let fit = ols(&x, &y).unwrap();
        assert!((fit.params[0] - 2.0).abs() < 1e-9);
        assert!((fit.params[1] - 3.0).abs() < 1e-9);
        assert!(fit.ssr < 1e-18);
    }

    #[test]
    fn standard_error_matches_hand_computation() {
        // y = [1, 3, 2, 5, 4] on [1, x], x = 1..5:
        // slope 0.8, intercept 0.6, ssr 3.6, se(slope) = sqrt(1.2 / 10).
        let x = DMatrix::from_fn(5, 2, |i, j| if j == 0 { 1.0 } else { (i + 1) as f64 });
        let y = DVector::from_vec(vec![1.0, 3.0, 2.0, 5.0, 4.0]);
        let fit = ols(&x, &y).unwrap();
        assert!((fit.params[1] - 0.8).abs() < 1e-10);
        assert!((fit.params[0] - 0.6).abs() < 1e-10);
        assert!((fit.ssr - 3.6).abs() < 1e-10);
        assert!((fit.std_err(1) - (0.12f64).sqrt()).abs() < 1e-10);
        assert!((fit.r_squared(&y) - 0.64).abs() < 1e-10);
    }

    #[test]
    fn collinear_design_is_singular() {
        let x = DMatrix::from_fn(4, 2, |i, _| i as f64);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(ols(&x, &y), Err(NumericError::Singular)));
    }

    #[test]
    fn row_mismatch_is_rejected() {
        let x = DMatrix::from_element(3, 1, 1.0);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(ols(&x, &y), Err(NumericError::LengthMismatch { .. })));
    }
}
