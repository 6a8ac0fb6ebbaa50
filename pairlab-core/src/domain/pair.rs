//! Candidate pairs and their cointegration results.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Ticker;

/// An unordered pair of distinct tickers.
///
/// The fields keep enumeration order (`first` came before `second` in the
/// input mapping); equality and hashing go through [`TickerPair::key`] so
/// `(A, B)` and `(B, A)` are the same pair.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct TickerPair {
    pub first: Ticker,
    pub second: Ticker,
}

impl TickerPair {
    pub fn new(first: impl Into<Ticker>, second: impl Into<Ticker>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Canonical (lexicographically sorted) view of the pair.
    pub fn key(&self) -> (&str, &str) {
        if self.first <= self.second {
            (&self.first, &self.second)
        } else {
            (&self.second, &self.first)
        }
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.first == ticker || self.second == ticker
    }
}

impl PartialEq for TickerPair {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl std::hash::Hash for TickerPair {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for TickerPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// Outcome of one Engle–Granger test on one pair for one simulated date.
///
/// Recomputed fresh every date; never cached across dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    pub pair: TickerPair,
    /// ADF t-statistic of the regression residuals.
    pub test_statistic: f64,
    /// Approximate probability that the two series are NOT cointegrated.
    pub p_value: f64,
    /// Slope of `first` regressed on `second`.
    pub hedge_ratio: f64,
    /// Lag order the residual unit-root regression used.
    pub used_lag: usize,
}
