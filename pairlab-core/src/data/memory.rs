//! In-memory market data source for tests, benches, and synthetic runs.

use std::collections::BTreeMap;

use super::mask::MembershipMask;
use super::provider::{DataError, MarketDataSource, SectorTable};
use crate::domain::{normalize_history, PriceBar, Ticker};

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    histories: BTreeMap<Ticker, Vec<PriceBar>>,
    mask: Option<MembershipMask>,
    sectors: Option<SectorTable>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a ticker's history. Bars are sorted and de-duplicated by date.
    pub fn insert_history(&mut self, ticker: impl Into<Ticker>, bars: Vec<PriceBar>) {
        self.histories.insert(ticker.into(), normalize_history(bars));
    }

    pub fn with_history(mut self, ticker: impl Into<Ticker>, bars: Vec<PriceBar>) -> Self {
        self.insert_history(ticker, bars);
        self
    }

    pub fn set_mask(&mut self, mask: MembershipMask) {
        self.mask = Some(mask);
    }

    pub fn with_mask(mut self, mask: MembershipMask) -> Self {
        self.set_mask(mask);
        self
    }

    pub fn set_sectors(&mut self, sectors: SectorTable) {
        self.sectors = Some(sectors);
    }
}

impl MarketDataSource for InMemorySource {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn load_price_history(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        self.histories
            .get(ticker)
            .cloned()
            .ok_or_else(|| DataError::not_found(format!("price history for '{ticker}'")))
    }

    fn load_membership_mask(&self) -> Result<MembershipMask, DataError> {
        self.mask
            .clone()
            .ok_or_else(|| DataError::not_found("membership mask"))
    }

    fn load_sector_table(&self) -> Result<SectorTable, DataError> {
        self.sectors
            .clone()
            .ok_or_else(|| DataError::not_found("sector table"))
    }

    fn available_tickers(&self) -> Result<Vec<Ticker>, DataError> {
        Ok(self.histories.keys().cloned().collect())
    }
}
