//! Look-ahead contamination tests for window assembly and the pair screen.
//!
//! Invariant: nothing computed as of date D may depend on a bar dated after D.
//!
//! Method: build each ticker's history twice, once truncated at D and once
//! with extra bars after D (including absurd prices). Windows and screen
//! results as of D must be identical between the two.

use chrono::{Duration, NaiveDate};
use pairlab_core::data::InMemorySource;
use pairlab_core::domain::PriceBar;
use pairlab_core::screen::PairScreener;
use pairlab_core::window::{assemble, window_from_history};

/// Deterministic pseudo-random walk with weekend gaps.
fn make_history(seed: u64, n: usize) -> Vec<PriceBar> {
    let base = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let mut state = seed;
    let mut price = 100.0;
    let mut bars = Vec::with_capacity(n);
    let mut day = 0i64;
    while bars.len() < n {
        let date = base + Duration::days(day);
        day += 1;
        if matches!(
            chrono::Datelike::weekday(&date),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        ) {
            continue;
        }
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        price += ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 2.0;
        bars.push(PriceBar::from_close(date, price));
    }
    bars
}

fn truncated_at(bars: &[PriceBar], as_of: NaiveDate) -> Vec<PriceBar> {
    bars.iter().filter(|b| b.date <= as_of).cloned().collect()
}

fn poisoned_after(bars: &[PriceBar], as_of: NaiveDate) -> Vec<PriceBar> {
    bars.iter()
        .map(|b| {
            if b.date > as_of {
                PriceBar::from_close(b.date, f64::NAN)
            } else {
                b.clone()
            }
        })
        .collect()
}

#[test]
fn window_never_contains_bars_after_as_of() {
    let bars = make_history(1, 200);
    for idx in [60, 90, 150, 199] {
        let as_of = bars[idx].date;
        let window = window_from_history("T", &bars, as_of, 60).unwrap();
        assert!(window.dates.iter().all(|d| *d <= as_of));
        assert_eq!(window.last_date(), Some(as_of));
    }
}

#[test]
fn weekend_as_of_uses_friday_close() {
    let bars = make_history(2, 120);
    let friday = bars
        .iter()
        .rev()
        .find(|b| chrono::Datelike::weekday(&b.date) == chrono::Weekday::Fri)
        .unwrap()
        .date;
    let sunday = friday + Duration::days(2);
    let window = window_from_history("T", &bars, sunday, 30).unwrap();
    assert_eq!(window.last_date(), Some(friday));
}

#[test]
fn future_bars_do_not_change_windows() {
    let full = make_history(3, 200);
    for idx in [59, 100, 180] {
        let as_of = full[idx].date;
        let truncated = truncated_at(&full, as_of);
        let a = window_from_history("T", &full, as_of, 60);
        let b = window_from_history("T", &truncated, as_of, 60);
        assert_eq!(a, b, "window differs as of {as_of}");
    }
}

#[test]
fn future_bars_do_not_change_screen() {
    let histories: Vec<(String, Vec<PriceBar>)> = (0..5)
        .map(|i| (format!("T{i}"), make_history(100 + i, 200)))
        .collect();
    let as_of = histories[0].1[120].date;

    let mut full = InMemorySource::new();
    let mut poisoned = InMemorySource::new();
    let mut truncated = InMemorySource::new();
    for (ticker, bars) in &histories {
        full.insert_history(ticker.clone(), bars.clone());
        poisoned.insert_history(ticker.clone(), poisoned_after(bars, as_of));
        truncated.insert_history(ticker.clone(), truncated_at(bars, as_of));
    }

    let tickers: Vec<&str> = histories.iter().map(|(t, _)| t.as_str()).collect();
    let screener = PairScreener::new(1.0);
    let reports: Vec<_> = [&full, &poisoned, &truncated]
        .into_iter()
        .map(|src| {
            let assembly = assemble(src, tickers.iter().copied(), as_of, 60);
            assert_eq!(assembly.valid_count(), 5);
            screener.screen(&assembly.windows)
        })
        .collect();

    assert_eq!(reports[0], reports[1]);
    assert_eq!(reports[0], reports[2]);
    assert_eq!(reports[0].tested, 10);
    assert!(reports[0].skipped.is_empty());
}
