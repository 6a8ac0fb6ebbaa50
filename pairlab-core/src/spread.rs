//! Spread z-score bands for pairs that already passed the screen.
//!
//! The spread is `a − β·b` over the lookback window. Its latest value is
//! scored against the window mean and standard deviation. The result is
//! advisory: it never feeds back into pair acceptance.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

use crate::domain::PriceWindow;
use crate::stats::NumericError;

/// Default entry band, in standard deviations.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadBand {
    /// Spread unusually wide: sell `a`, buy `b`.
    Short,
    /// Spread unusually narrow: buy `a`, sell `b`.
    Long,
    Neutral,
}

impl fmt::Display for SpreadBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadBand::Short => write!(f, "short spread"),
            SpreadBand::Long => write!(f, "long spread"),
            SpreadBand::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSignal {
    pub zscore: f64,
    pub spread: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub band: SpreadBand,
}

impl SpreadSignal {
    /// Score the latest spread of `a − hedge_ratio·b`.
    pub fn evaluate(
        a: &PriceWindow,
        b: &PriceWindow,
        hedge_ratio: f64,
        zscore_threshold: f64,
    ) -> Result<Self, NumericError> {
        if a.len() != b.len() {
            return Err(NumericError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        if a.len() < 2 {
            return Err(NumericError::TooShort { len: a.len(), min: 2 });
        }

        let spread: Vec<f64> = a
            .closes
            .iter()
            .zip(&b.closes)
            .map(|(x, y)| x - hedge_ratio * y)
            .collect();
        if spread.iter().any(|v| !v.is_finite()) {
            return Err(NumericError::NonFinite);
        }

        let mean = spread.iter().copied().mean();
        let std_dev = spread.iter().copied().std_dev();
        if std_dev == 0.0 {
            return Err(NumericError::ZeroVariance);
        }

        let last = spread[spread.len() - 1];
        let zscore = (last - mean) / std_dev;
        let band = if zscore >= zscore_threshold {
            SpreadBand::Short
        } else if zscore <= -zscore_threshold {
            SpreadBand::Long
        } else {
            SpreadBand::Neutral
        };

        Ok(Self {
            zscore,
            spread: last,
            mean,
            std_dev,
            band,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn window(ticker: &str, closes: Vec<f64>) -> PriceWindow {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        PriceWindow::new(ticker, dates, closes)
    }

    #[test]
    fn zscore_of_last_point() {
        // spread = a - 2b = [0, 1, 0, 1, 4]; mean 1.2, sample sd sqrt(2.7)
        let a = window("A", vec![10.0, 11.0, 10.0, 11.0, 14.0]);
        let b = window("B", vec![5.0; 5]);
        let sig = SpreadSignal::evaluate(&a, &b, 2.0, 1.5).unwrap();
        assert!((sig.mean - 1.2).abs() < 1e-10);
        assert!((sig.std_dev - 2.7f64.sqrt()).abs() < 1e-10);
        assert!((sig.zscore - 2.8 / 2.7f64.sqrt()).abs() < 1e-10);
        assert_eq!(sig.band, SpreadBand::Short);
    }

    #[test]
    fn bands_are_symmetric() {
        let b = window("B", vec![1.0; 5]);
        let low = window("A", vec![4.0, 5.0, 4.0, 5.0, 0.0]);
        let mid = window("A", vec![4.0, 5.0, 4.0, 5.0, 4.5]);
        assert_eq!(
            SpreadSignal::evaluate(&low, &b, 1.0, 1.5).unwrap().band,
            SpreadBand::Long
        );
        assert_eq!(
            SpreadSignal::evaluate(&mid, &b, 1.0, 1.5).unwrap().band,
            SpreadBand::Neutral
        );
    }

    #[test]
    fn flat_spread_is_rejected() {
        let a = window("A", vec![3.0; 4]);
        let b = window("B", vec![1.0; 4]);
        assert_eq!(
            SpreadSignal::evaluate(&a, &b, 1.0, 2.0),
            Err(NumericError::ZeroVariance)
        );
    }
}
