//! PriceBar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single ticker.
///
/// Bars are immutable once loaded. A ticker's history is ordered by date with
/// at most one bar per trading day; missing days are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Bar with every price field set to `close`. Handy for close-only feeds.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Sort bars ascending by date, keeping the last occurrence of a duplicated date.
pub fn normalize_history(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    // Stable sort keeps file order among equal dates, so the last duplicate wins below.
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn from_close_fills_every_price() {
        let bar = PriceBar::from_close(d(2), 103.0);
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (103.0, 103.0, 103.0, 103.0));
        assert_eq!(bar.volume, 0.0);
    }

    #[test]
    fn normalize_sorts_and_dedups_last_wins() {
        let bars = vec![
            PriceBar::from_close(d(4), 3.0),
            PriceBar::from_close(d(2), 1.0),
            PriceBar::from_close(d(4), 4.0),
            PriceBar::from_close(d(3), 2.0),
        ];
        let out = normalize_history(bars);
        let dates: Vec<_> = out.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(2), d(3), d(4)]);
        assert_eq!(out[2].close, 4.0);
    }
}
