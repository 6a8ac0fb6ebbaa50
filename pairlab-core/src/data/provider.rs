//! Market data source trait and structured error types.
//!
//! The `MarketDataSource` trait abstracts over where price histories, the
//! index-membership mask, and the sector table come from (flat CSV files, an
//! in-memory fixture, a Parquet cache) so the simulation never knows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::mask::MembershipMask;
use crate::domain::{PriceBar, Ticker};

/// Structured error types for data operations.
///
/// `NotFound` is the expected "no data for this ticker/table" case and is
/// recovered locally by the simulation. The rest indicate malformed or
/// unreadable data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data available: {what}")]
    NotFound { what: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("parse error in {path} (row {row}, column '{column}'): {message}")]
    Parse {
        path: String,
        row: usize,
        column: String,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("cache error: {0}")]
    Cache(String),
}

impl DataError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DataError::NotFound { what: what.into() }
    }

    /// True for the "data simply absent" case, as opposed to corrupt data.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound { .. })
    }
}

/// Sector classification for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorInfo {
    pub group: String,
    pub sector: String,
    pub subgroup: String,
}

/// Ticker → sector classification.
///
/// Only the presentation layer consumes it, joining on ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorTable {
    entries: BTreeMap<Ticker, SectorInfo>,
}

impl SectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<Ticker>, info: SectorInfo) {
        self.entries.insert(ticker.into(), info);
    }

    pub fn get(&self, ticker: &str) -> Option<&SectorInfo> {
        self.entries.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join tickers with their sector info; unknown tickers get `None`.
    pub fn enrich<'a, I>(&self, tickers: I) -> Vec<(String, Option<SectorInfo>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tickers
            .into_iter()
            .map(|t| (t.to_string(), self.get(t).cloned()))
            .collect()
    }
}

impl FromIterator<(Ticker, SectorInfo)> for SectorTable {
    fn from_iter<I: IntoIterator<Item = (Ticker, SectorInfo)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Where the simulation reads market data from.
///
/// All operations are synchronous reads. Implementations return
/// `DataError::NotFound` for absent data, which callers treat as
/// "no data for this ticker/date" rather than a fatal failure.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Full daily history of one ticker, ascending by date, one bar per date.
    fn load_price_history(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError>;

    /// Index membership mask (date → member tickers).
    fn load_membership_mask(&self) -> Result<MembershipMask, DataError>;

    /// Sector reference table.
    fn load_sector_table(&self) -> Result<SectorTable, DataError>;

    /// Tickers this source has price histories for, sorted.
    fn available_tickers(&self) -> Result<Vec<Ticker>, DataError>;
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load_price_history(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        (**self).load_price_history(ticker)
    }

    fn load_membership_mask(&self) -> Result<MembershipMask, DataError> {
        (**self).load_membership_mask()
    }

    fn load_sector_table(&self) -> Result<SectorTable, DataError> {
        (**self).load_sector_table()
    }

    fn available_tickers(&self) -> Result<Vec<Ticker>, DataError> {
        (**self).available_tickers()
    }
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load_price_history(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        (**self).load_price_history(ticker)
    }

    fn load_membership_mask(&self) -> Result<MembershipMask, DataError> {
        (**self).load_membership_mask()
    }

    fn load_sector_table(&self) -> Result<SectorTable, DataError> {
        (**self).load_sector_table()
    }

    fn available_tickers(&self) -> Result<Vec<Ticker>, DataError> {
        (**self).available_tickers()
    }
}
