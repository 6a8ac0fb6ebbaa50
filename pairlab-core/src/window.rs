//! Lookback window assembly with a strict no-lookahead cut.
//!
//! A window is the last `lookback` bars dated at or before the as-of date,
//! taken straight from the ticker's real trading history. Tickers with fewer
//! qualifying bars are excluded, never padded or filled.

use chrono::NaiveDate;
use tracing::debug;

use crate::data::{DataError, MarketDataSource};
use crate::domain::{PriceBar, PriceWindow, Ticker, WindowSet};

/// Result of assembling windows for one as-of date.
#[derive(Debug, Clone, Default)]
pub struct WindowAssembly {
    /// Complete windows, in input ticker order.
    pub windows: WindowSet,
    /// Tickers with fewer than `lookback` bars at or before the as-of date.
    pub incomplete: Vec<Ticker>,
    /// Tickers whose history could not be loaded, with the reason.
    pub unavailable: Vec<(Ticker, String)>,
}

impl WindowAssembly {
    pub fn valid_count(&self) -> usize {
        self.windows.len()
    }

    /// At least two windows survived, so at least one pair can be screened.
    pub fn is_screenable(&self) -> bool {
        self.windows.len() >= 2
    }
}

/// Cut the trailing window out of a date-sorted history.
///
/// Returns `None` unless exactly `lookback` bars dated `<= as_of` are available.
pub fn window_from_history(
    ticker: &str,
    bars: &[PriceBar],
    as_of: NaiveDate,
    lookback: usize,
) -> Option<PriceWindow> {
    if lookback == 0 {
        return None;
    }
    let end = bars.partition_point(|b| b.date <= as_of);
    if end < lookback {
        return None;
    }
    let slice = &bars[end - lookback..end];
    Some(PriceWindow::new(
        ticker,
        slice.iter().map(|b| b.date).collect(),
        slice.iter().map(|b| b.close).collect(),
    ))
}

/// Load each ticker's history and cut its window as of `as_of`.
///
/// Output order follows the input order. Load failures are collected rather
/// than propagated: one bad ticker never sinks the date.
pub fn assemble<'a, S, I>(source: &S, tickers: I, as_of: NaiveDate, lookback: usize) -> WindowAssembly
where
    S: MarketDataSource + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut out = WindowAssembly::default();

    for ticker in tickers {
        let bars = match source.load_price_history(ticker) {
            Ok(bars) => bars,
            Err(e) => {
                debug!(ticker, %as_of, error = %e, "price history unavailable");
                out.unavailable.push((ticker.to_string(), describe(&e)));
                continue;
            }
        };

        match window_from_history(ticker, &bars, as_of, lookback) {
            Some(window) => out.windows.insert(window),
            None => out.incomplete.push(ticker.to_string()),
        }
    }

    debug!(
        %as_of,
        valid = out.windows.len(),
        incomplete = out.incomplete.len(),
        unavailable = out.unavailable.len(),
        "assembled lookback windows"
    );
    out
}

fn describe(e: &DataError) -> String {
    match e {
        DataError::NotFound { .. } => "no price history".to_string(),
        other => other.to_string(),
    }
}
