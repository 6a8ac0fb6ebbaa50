//! Pairwise cointegration screen.
//!
//! For k windows the screen enumerates exactly k·(k−1)/2 unordered pairs,
//! `(i, j)` with `i < j` in window order, and runs one Engle–Granger test per
//! pair. Windows are borrowed, never re-filtered inside the pair loop.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CointegrationResult, PriceWindow, TickerPair, WindowSet};
use crate::stats::{engle_granger, NumericError};

/// Default significance cutoff.
pub const DEFAULT_P_VALUE_THRESHOLD: f64 = 0.05;

/// A pair whose test could not run, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub pair: TickerPair,
    pub reason: String,
}

/// Everything one screen produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenReport {
    /// Pairs with `p_value < threshold`, in enumeration order.
    pub accepted: Vec<CointegrationResult>,
    /// Number of pairs enumerated, skipped ones included.
    pub tested: usize,
    pub skipped: Vec<SkippedPair>,
}

impl ScreenReport {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Index pairs `(i, j)`, `i < j`, for `k` items in lexicographic order.
pub fn pair_indices(k: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(k * k.saturating_sub(1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            out.push((i, j));
        }
    }
    out
}

/// Run the Engle–Granger test on one pair of windows.
pub fn test_pair(
    first: &PriceWindow,
    second: &PriceWindow,
) -> Result<CointegrationResult, NumericError> {
    if first.is_empty() || second.is_empty() {
        return Err(NumericError::TooShort { len: 0, min: 1 });
    }
    let eg = engle_granger(&first.closes, &second.closes)?;
    Ok(CointegrationResult {
        pair: TickerPair::new(first.ticker.clone(), second.ticker.clone()),
        test_statistic: eg.statistic,
        p_value: eg.p_value,
        hedge_ratio: eg.hedge_ratio,
        used_lag: eg.used_lag,
    })
}

#[derive(Debug, Clone)]
pub struct PairScreener {
    p_value_threshold: f64,
    parallel: bool,
}

impl Default for PairScreener {
    fn default() -> Self {
        Self::new(DEFAULT_P_VALUE_THRESHOLD)
    }
}

impl PairScreener {
    pub fn new(p_value_threshold: f64) -> Self {
        Self {
            p_value_threshold,
            parallel: false,
        }
    }

    /// Spread pair tests across the rayon pool. Output order is unchanged.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn p_value_threshold(&self) -> f64 {
        self.p_value_threshold
    }

    /// Test every pair, in enumeration order, without applying the threshold.
    pub fn test_all(
        &self,
        windows: &WindowSet,
    ) -> Vec<(TickerPair, Result<CointegrationResult, NumericError>)> {
        let slice = windows.as_slice();
        let pairs = pair_indices(slice.len());
        let run = |&(i, j): &(usize, usize)| {
            let (a, b) = (&slice[i], &slice[j]);
            (
                TickerPair::new(a.ticker.clone(), b.ticker.clone()),
                test_pair(a, b),
            )
        };

        if self.parallel {
            pairs.par_iter().map(run).collect()
        } else {
            pairs.iter().map(run).collect()
        }
    }

    /// Screen all pairs and keep those with `p_value < threshold`.
    pub fn screen(&self, windows: &WindowSet) -> ScreenReport {
        let outcomes = self.test_all(windows);
        let mut report = ScreenReport {
            tested: outcomes.len(),
            ..ScreenReport::default()
        };

        for (pair, outcome) in outcomes {
            match outcome {
                Ok(result) if result.p_value < self.p_value_threshold => {
                    report.accepted.push(result)
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(%pair, error = %e, "skipping pair");
                    report.skipped.push(SkippedPair {
                        pair,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            windows = windows.len(),
            tested = report.tested,
            accepted = report.accepted.len(),
            skipped = report.skipped.len(),
            "pair screen complete"
        );
        report
    }
}

/// Screen `windows` sequentially at `p_value_threshold`.
pub fn screen(windows: &WindowSet, p_value_threshold: f64) -> Vec<CointegrationResult> {
    PairScreener::new(p_value_threshold).screen(windows).accepted
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

    /// Random walk driven by a 64-bit LCG.
    fn walk(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed;
        let mut level = 100.0;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                level += (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
                level
            })
            .collect()
    }

    #[test]
    fn pair_indices_count_and_order() {
        assert_eq!(pair_indices(0).len(), 0);
        assert_eq!(pair_indices(1).len(), 0);
        assert_eq!(pair_indices(4), vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(pair_indices(30).len(), 435);
    }

    #[test]
    fn degenerate_pair_is_skipped_not_fatal() {
        let windows: WindowSet = vec![
            window("A", walk(1, 40)),
            window("FLAT", vec![5.0; 40]),
            window("B", walk(2, 40)),
        ]
        .into_iter()
        .collect();

        let report = PairScreener::new(1.0).screen(&windows);
        assert_eq!(report.tested, 3);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.pair.contains("FLAT")));
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].pair, TickerPair::new("A", "B"));
    }

    #[test]
    fn empty_and_nan_windows_are_skipped() {
        let mut holed = walk(1, 40);
        holed[3] = f64::NAN;
        let windows: WindowSet = vec![
            window("EMPTY", vec![]),
            window("HOLED", holed),
            window("OK", walk(2, 40)),
        ]
        .into_iter()
        .collect();

        let report = PairScreener::new(1.0).screen(&windows);
        assert_eq!(report.tested, 3);
        assert_eq!(report.skipped.len(), 3);
        assert!(report.accepted.is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let windows: WindowSet = (0..8)
            .map(|i| window(&format!("T{i}"), walk(i + 10, 60)))
            .collect();
        let seq = PairScreener::new(1.0).screen(&windows);
        let par = PairScreener::new(1.0).with_parallelism(true).screen(&windows);
        assert_eq!(seq, par);
        assert_eq!(seq.tested, 28);
    }
}
