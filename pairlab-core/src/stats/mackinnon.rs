//! MacKinnon (1994) approximate asymptotic p-values for unit-root and
//! cointegration t-statistics, constant-only case.
//!
//! The p-value is `Φ(Σ cᵢ·τⁱ)`, with one polynomial below the switch point
//! `τ*` and another above it. Outside `[τ_min, τ_max]` the p-value is clamped
//! to 0 or 1.

use statrs::distribution::{ContinuousCDF, Normal};

struct Surface {
    max: f64,
    min: f64,
    star: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
}

/// Single series (plain ADF with a constant).
const ONE_SERIES: Surface = Surface {
    max: 2.74,
    min: -18.83,
    star: -1.61,
    small_p: [2.1659, 1.4412, 0.038269],
    large_p: [1.7339, 0.93202, -0.12745, -0.010368],
};

/// Two series (Engle–Granger residual test with a constant).
const TWO_SERIES: Surface = Surface {
    max: 0.92,
    min: -18.86,
    star: -2.62,
    small_p: [2.92, 1.5012, 0.039796],
    large_p: [2.1945, 0.64695, -0.29198, -0.042377],
};

fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// p-value for a t-statistic with `n_series` integrated variables (1 or 2).
///
/// Returns `None` for other variable counts.
pub fn mackinnon_p(stat: f64, n_series: usize) -> Option<f64> {
    let surface = match n_series {
        1 => &ONE_SERIES,
        2 => &TWO_SERIES,
        _ => return None,
    };
    if stat.is_nan() {
        return Some(f64::NAN);
    }
    if stat > surface.max {
        return Some(1.0);
    }
    if stat < surface.min {
        return Some(0.0);
    }
    let z = if stat <= surface.star {
        polyval(&surface.small_p, stat)
    } else {
        polyval(&surface.large_p, stat)
    };
    Some(Normal::standard().cdf(z))
}
