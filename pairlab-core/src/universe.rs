//! Point-in-time universe resolution.
//!
//! Membership is looked up on the exact calendar date. There is no fallback
//! to the nearest earlier row: a date without a row is an empty universe, so
//! gaps in the reference data stay visible instead of silently reusing stale
//! membership.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::data::MembershipMask;
use crate::domain::Ticker;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UniverseError {
    #[error("membership row for {date} is malformed: {reason}")]
    MalformedRow { date: NaiveDate, reason: String },
}

/// Tickers flagged as index members on exactly `date`.
///
/// A missing row and a row with nobody flagged both resolve to an empty set.
/// Only a row that failed to parse is an error.
pub fn members_on(mask: &MembershipMask, date: NaiveDate) -> Result<BTreeSet<Ticker>, UniverseError> {
    if let Some(reason) = mask.malformed_reason(date) {
        return Err(UniverseError::MalformedRow {
            date,
            reason: reason.to_string(),
        });
    }
    Ok(mask.row(date).cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn mask() -> MembershipMask {
        MembershipMask::from_flags(vec![
            (d(10), "A", 1),
            (d(10), "B", 1),
            (d(10), "C", 0),
            (d(11), "A", 0),
        ])
    }

    #[test]
    fn exact_date_lookup() {
        let members = members_on(&mask(), d(10)).unwrap();
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn absent_date_is_empty_not_previous_row() {
        // 2024-01-13 is a Saturday with no row; 01-10 must not leak forward.
        assert!(members_on(&mask(), d(13)).unwrap().is_empty());
    }

    #[test]
    fn unflagged_row_is_empty() {
        assert!(members_on(&mask(), d(11)).unwrap().is_empty());
    }

    #[test]
    fn malformed_row_is_an_error() {
        let mut m = mask();
        m.mark_malformed(d(12), "flag must be 0 or 1, got 2");
        let err = members_on(&m, d(12)).unwrap_err();
        assert!(err.to_string().contains("2024-01-12"));
    }
}
