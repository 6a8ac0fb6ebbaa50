//! PriceWindow and WindowSet — trailing close-price windows scoped to one as-of date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Ticker;

/// The last N closing prices of one ticker at or before an as-of date.
///
/// The window is a suffix of the ticker's real trading history: no calendar
/// resampling, no padding, no fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceWindow {
    pub ticker: Ticker,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
}

impl PriceWindow {
    pub fn new(ticker: impl Into<Ticker>, dates: Vec<NaiveDate>, closes: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), closes.len());
        Self {
            ticker: ticker.into(),
            dates,
            closes,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Ticker → window mapping that keeps insertion order.
///
/// Iteration order is the order tickers were inserted, which makes pair
/// enumeration reproducible for a given input. Serializes as the plain list
/// of windows; the ticker index is rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PriceWindow>", into = "Vec<PriceWindow>")]
pub struct WindowSet {
    windows: Vec<PriceWindow>,
    index: HashMap<Ticker, usize>,
}

impl WindowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a window. A window for a ticker already present replaces it in place.
    pub fn insert(&mut self, window: PriceWindow) {
        match self.index.get(&window.ticker).copied() {
            Some(slot) => self.windows[slot] = window,
            None => {
                self.index.insert(window.ticker.clone(), self.windows.len());
                self.windows.push(window);
            }
        }
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceWindow> {
        self.index.get(ticker).map(|&slot| &self.windows[slot])
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index.contains_key(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(|w| w.ticker.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceWindow> {
        self.windows.iter()
    }

    pub fn as_slice(&self) -> &[PriceWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl PartialEq for WindowSet {
    fn eq(&self, other: &Self) -> bool {
        self.windows == other.windows
    }
}

impl FromIterator<PriceWindow> for WindowSet {
    fn from_iter<I: IntoIterator<Item = PriceWindow>>(iter: I) -> Self {
        let mut set = WindowSet::new();
        for w in iter {
            set.insert(w);
        }
        set
    }
}

impl From<Vec<PriceWindow>> for WindowSet {
    fn from(windows: Vec<PriceWindow>) -> Self {
        windows.into_iter().collect()
    }
}

impl From<WindowSet> for Vec<PriceWindow> {
    fn from(set: WindowSet) -> Self {
        set.windows
    }
}

impl<'a> IntoIterator for &'a WindowSet {
    type Item = &'a PriceWindow;
    type IntoIter = std::slice::Iter<'a, PriceWindow>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.iter()
    }
}
