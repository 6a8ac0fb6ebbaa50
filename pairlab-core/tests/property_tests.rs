//! Property tests for the per-date invariants.
//!
//! Uses proptest to verify:
//! 1. Universe correctness — exact-date rows, empty set for absent dates
//! 2. Window completeness — a window exists iff enough bars precede the as-of date
//! 3. No look-ahead — window dates never exceed the as-of date
//! 4. Pair enumeration — k·(k−1)/2 distinct pairs, no self-pairs
//! 5. Threshold monotonicity — raising the cutoff never drops a pair
//! 6. Determinism — identical inputs give identical results

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

use pairlab_core::data::MembershipMask;
use pairlab_core::domain::{PriceBar, PriceWindow, TickerPair, WindowSet};
use pairlab_core::members_on;
use pairlab_core::screen::{pair_indices, PairScreener};
use pairlab_core::window::window_from_history;

const TICKERS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// A mask as (day offset, per-ticker flags) rows.
fn arb_mask_rows() -> impl Strategy<Value = Vec<(i64, Vec<u8>)>> {
    prop::collection::vec(
        (0i64..30, prop::collection::vec(0u8..=1, TICKERS.len())),
        0..20,
    )
}

/// A sorted history with random gaps between trading days.
fn arb_history() -> impl Strategy<Value = Vec<PriceBar>> {
    prop::collection::vec((1i64..4, 50.0..150.0_f64), 0..80).prop_map(|steps| {
        let mut day = 0;
        steps
            .into_iter()
            .map(|(gap, close)| {
                day += gap;
                PriceBar::from_close(base() + Duration::days(day), close)
            })
            .collect()
    })
}

fn lcg_walk(seed: u64, n: usize) -> Vec<f64> {
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

fn windows_from_seeds(seeds: &[u64]) -> WindowSet {
    let dates: Vec<NaiveDate> = (0..40).map(|i| base() + Duration::days(i)).collect();
    seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| PriceWindow::new(format!("T{i}"), dates.clone(), lcg_walk(*seed, 40)))
        .collect()
}

// ── 1. Universe correctness ──────────────────────────────────────────

proptest! {
    #[test]
    fn members_on_matches_flagged_row(rows in arb_mask_rows(), probe in 0i64..35) {
        let mut cells = Vec::new();
        // Later rows for the same date overwrite earlier ones, as a reloaded table would.
        let mut expected: std::collections::BTreeMap<i64, BTreeSet<String>> = Default::default();
        for (offset, flags) in &rows {
            let members: BTreeSet<String> = TICKERS
                .iter()
                .zip(flags)
                .filter(|(_, flag)| **flag == 1)
                .map(|(ticker, _)| ticker.to_string())
                .collect();
            expected.insert(*offset, members);
        }
        for (offset, members) in &expected {
            let date = base() + Duration::days(*offset);
            for ticker in TICKERS {
                let flag = u8::from(members.contains(ticker));
                cells.push((date, ticker, flag));
            }
        }
        let mask = MembershipMask::from_flags(cells);

        let date = base() + Duration::days(probe);
        let got = members_on(&mask, date).unwrap();
        match expected.get(&probe) {
            Some(members) => prop_assert_eq!(&got, members),
            None => prop_assert!(got.is_empty()),
        }
    }
}

// ── 2 & 3. Window completeness and no look-ahead ─────────────────────

proptest! {
    #[test]
    fn window_exists_iff_enough_history(
        bars in arb_history(),
        as_of_offset in 0i64..250,
        lookback in 1usize..30,
    ) {
        let as_of = base() + Duration::days(as_of_offset);
        let qualifying: Vec<&PriceBar> = bars.iter().filter(|b| b.date <= as_of).collect();
        let window = window_from_history("T", &bars, as_of, lookback);

        if qualifying.len() >= lookback {
            let window = window.unwrap();
            prop_assert_eq!(window.len(), lookback);
            // Suffix of the real history: the last `lookback` qualifying bars.
            let expected: Vec<NaiveDate> = qualifying[qualifying.len() - lookback..]
                .iter()
                .map(|b| b.date)
                .collect();
            prop_assert_eq!(&window.dates, &expected);
            prop_assert!(window.dates.iter().all(|d| *d <= as_of));
        } else {
            prop_assert!(window.is_none());
        }
    }
}

// ── 4. Pair enumeration ──────────────────────────────────────────────

proptest! {
    #[test]
    fn pair_enumeration_is_complete(k in 0usize..40) {
        let pairs = pair_indices(k);
        prop_assert_eq!(pairs.len(), k * k.saturating_sub(1) / 2);
        let unique: HashSet<(usize, usize)> = pairs.iter().copied().collect();
        prop_assert_eq!(unique.len(), pairs.len());
        prop_assert!(pairs.iter().all(|(i, j)| i < j && *j < k));
    }
}

// ── 5 & 6. Threshold monotonicity and determinism ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn raising_threshold_never_removes_pairs(
        seeds in prop::collection::vec(1u64..10_000, 2..6),
        lo in 0.0..1.0_f64,
        bump in 0.0..0.5_f64,
    ) {
        let windows = windows_from_seeds(&seeds);
        let hi = lo + bump;
        let strict: HashSet<TickerPair> = PairScreener::new(lo)
            .screen(&windows)
            .accepted
            .into_iter()
            .map(|r| r.pair)
            .collect();
        let loose: HashSet<TickerPair> = PairScreener::new(hi)
            .screen(&windows)
            .accepted
            .into_iter()
            .map(|r| r.pair)
            .collect();
        prop_assert!(strict.is_subset(&loose));
    }

    #[test]
    fn screen_is_deterministic(seeds in prop::collection::vec(1u64..10_000, 2..6)) {
        let windows = windows_from_seeds(&seeds);
        let screener = PairScreener::new(0.5);
        let first = screener.screen(&windows);
        let second = screener.screen(&windows);
        prop_assert_eq!(&first, &second);
        let k = windows.len();
        prop_assert_eq!(first.tested, k * (k - 1) / 2);
    }
}
