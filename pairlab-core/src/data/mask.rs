//! Index membership mask — point-in-time constituents per calendar date.
//!
//! Built from a boolean ticker × date table where a flag of exactly 1 marks
//! membership. Dates without any flag set still appear (with an empty set) so
//! "row present, nobody flagged" and "row absent" are both representable.
//! Rows that failed to parse are kept as malformed markers so the failure is
//! reported against that single date instead of failing the whole load.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::Ticker;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipMask {
    rows: BTreeMap<NaiveDate, BTreeSet<Ticker>>,
    #[serde(default)]
    malformed: BTreeMap<NaiveDate, String>,
}

impl MembershipMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(date, ticker, flag)` cells. Only `flag == 1` counts as membership.
    pub fn from_flags<I, T>(cells: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, T, u8)>,
        T: Into<Ticker>,
    {
        let mut mask = Self::new();
        for (date, ticker, flag) in cells {
            let row = mask.rows.entry(date).or_default();
            if flag == 1 {
                row.insert(ticker.into());
            }
        }
        mask
    }

    /// Register a row for `date` (possibly with nobody flagged yet).
    pub fn add_row(&mut self, date: NaiveDate) -> &mut BTreeSet<Ticker> {
        self.rows.entry(date).or_default()
    }

    /// Mark `ticker` as a member on `date`.
    pub fn set_member(&mut self, date: NaiveDate, ticker: impl Into<Ticker>) {
        self.add_row(date).insert(ticker.into());
    }

    /// Record that the row for `date` could not be parsed.
    pub fn mark_malformed(&mut self, date: NaiveDate, reason: impl Into<String>) {
        self.rows.remove(&date);
        self.malformed.insert(date, reason.into());
    }

    /// Parse failure recorded for `date`, if any.
    pub fn malformed_reason(&self, date: NaiveDate) -> Option<&str> {
        self.malformed.get(&date).map(|s| s.as_str())
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }

    /// Exact-date row lookup. `None` means the mask has no row for that date.
    pub fn row(&self, date: NaiveDate) -> Option<&BTreeSet<Ticker>> {
        self.rows.get(&date)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.rows.contains_key(&date)
    }

    /// Dates present in the mask, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }

    /// Constituents on the most recent date in the mask.
    pub fn latest_constituents(&self) -> Option<(NaiveDate, &BTreeSet<Ticker>)> {
        self.rows.iter().next_back().map(|(d, s)| (*d, s))
    }

    /// Every ticker that was a member on at least one date.
    pub fn all_tickers(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|s| s.iter().map(|t| t.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn from_flags_keeps_only_ones() {
        let mask = MembershipMask::from_flags(vec![
            (d(2), "A", 1),
            (d(2), "B", 0),
            (d(3), "A", 0),
            (d(3), "B", 1),
        ]);
        assert_eq!(mask.row(d(2)).unwrap().len(), 1);
        assert!(mask.row(d(2)).unwrap().contains("A"));
        assert!(mask.row(d(3)).unwrap().contains("B"));
    }

    #[test]
    fn unflagged_row_is_present_but_empty() {
        let mask = MembershipMask::from_flags(vec![(d(2), "A", 0)]);
        assert!(mask.contains_date(d(2)));
        assert!(mask.row(d(2)).unwrap().is_empty());
        assert!(mask.row(d(3)).is_none());
    }

    #[test]
    fn latest_constituents_uses_last_date() {
        let mut mask = MembershipMask::new();
        mask.set_member(d(2), "A");
        mask.set_member(d(5), "B");
        mask.set_member(d(5), "C");
        let (date, members) = mask.latest_constituents().unwrap();
        assert_eq!(date, d(5));
        assert_eq!(members.len(), 2);
        assert_eq!(mask.all_tickers().len(), 3);
    }

    #[test]
    fn malformed_row_replaces_members() {
        let mut mask = MembershipMask::new();
        mask.set_member(d(2), "A");
        mask.mark_malformed(d(2), "bad flag 'x'");
        assert!(mask.row(d(2)).is_none());
        assert_eq!(mask.malformed_reason(d(2)), Some("bad flag 'x'"));
        assert_eq!(mask.malformed_count(), 1);
    }
}
