//! Deterministic synthetic market data.
//!
//! Per-ticker seeds are derived from a master seed with BLAKE3, so a ticker's
//! series does not depend on the order tickers are generated in.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::mask::MembershipMask;
use super::memory::InMemorySource;
use crate::domain::{PriceBar, Ticker};

/// Derive a stable sub-seed for `ticker` from `master_seed`.
pub fn ticker_seed(master_seed: u64, ticker: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(ticker.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

pub fn rng_for(master_seed: u64, ticker: &str) -> StdRng {
    StdRng::seed_from_u64(ticker_seed(master_seed, ticker))
}

/// Standard normal draw (Box–Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `count` consecutive weekdays starting at `start` (rolled forward off a weekend).
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut day = start;
    while out.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(day);
        }
        day += Duration::days(1);
    }
    out
}

/// Gaussian random walk of `n` levels starting at `start`.
pub fn random_walk<R: Rng + ?Sized>(rng: &mut R, start: f64, step_sd: f64, n: usize) -> Vec<f64> {
    let mut level = start;
    (0..n)
        .map(|_| {
            level += step_sd * standard_normal(rng);
            level
        })
        .collect()
}

/// `a = intercept + hedge_ratio · b + noise`, with `b` a random walk.
///
/// The residual is i.i.d. noise, so the pair is cointegrated by construction.
pub fn cointegrated_pair<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    hedge_ratio: f64,
    intercept: f64,
    noise_sd: f64,
) -> (Vec<f64>, Vec<f64>) {
    let b = random_walk(rng, 100.0, 1.0, n);
    let a = b
        .iter()
        .map(|x| intercept + hedge_ratio * x + noise_sd * standard_normal(rng))
        .collect();
    (a, b)
}

/// Close-only bars for paired dates and closes.
pub fn bars_from_closes(dates: &[NaiveDate], closes: &[f64]) -> Vec<PriceBar> {
    dates
        .iter()
        .zip(closes)
        .map(|(d, c)| PriceBar::from_close(*d, *c))
        .collect()
}

/// Builder for an [`InMemorySource`] with random-walk tickers, cointegrated
/// pairs, and a mask listing every ticker on every business day.
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    seed: u64,
    dates: Vec<NaiveDate>,
    series: Vec<(Ticker, Vec<f64>)>,
}

impl SyntheticMarket {
    pub fn new(seed: u64, start: NaiveDate, days: usize) -> Self {
        Self {
            seed,
            dates: business_days(start, days),
            series: Vec::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Add an independent random walk.
    pub fn random_walk(mut self, ticker: &str) -> Self {
        let mut rng = rng_for(self.seed, ticker);
        let closes = random_walk(&mut rng, 100.0, 1.0, self.dates.len());
        self.series.push((ticker.to_string(), closes));
        self
    }

    /// Add a pair cointegrated with the given hedge ratio.
    pub fn cointegrated(mut self, a: &str, b: &str, hedge_ratio: f64) -> Self {
        let mut rng = rng_for(self.seed, &format!("{a}/{b}"));
        let (sa, sb) = cointegrated_pair(&mut rng, self.dates.len(), hedge_ratio, 5.0, 0.5);
        self.series.push((a.to_string(), sa));
        self.series.push((b.to_string(), sb));
        self
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|(t, _)| t.as_str())
    }

    pub fn build(self) -> InMemorySource {
        let mut mask = MembershipMask::new();
        for date in &self.dates {
            for (ticker, _) in &self.series {
                mask.set_member(*date, ticker.clone());
            }
        }

        let mut source = InMemorySource::new();
        for (ticker, closes) in &self.series {
            source.insert_history(ticker.clone(), bars_from_closes(&self.dates, closes));
        }
        source.set_mask(mask);
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::MarketDataSource;

    #[test]
    fn ticker_seeds_are_stable_and_distinct() {
        assert_eq!(ticker_seed(7, "XOM"), ticker_seed(7, "XOM"));
        assert_ne!(ticker_seed(7, "XOM"), ticker_seed(7, "CVX"));
        assert_ne!(ticker_seed(7, "XOM"), ticker_seed(8, "XOM"));
    }

    #[test]
    fn business_days_skip_weekends() {
        // 2024-01-05 is a Friday.
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let days = business_days(start, 3);
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn market_is_deterministic_per_seed() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let a = SyntheticMarket::new(1, start, 30).random_walk("A").build();
        let b = SyntheticMarket::new(1, start, 30).random_walk("A").build();
        assert_eq!(
            a.load_price_history("A").unwrap(),
            b.load_price_history("A").unwrap()
        );
    }

    #[test]
    fn built_mask_lists_every_ticker() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let market = SyntheticMarket::new(3, start, 10)
            .cointegrated("A", "B", 1.5)
            .random_walk("C");
        let last = *market.dates().last().unwrap();
        let source = market.build();
        let mask = source.load_membership_mask().unwrap();
        assert_eq!(mask.row(last).unwrap().len(), 3);
        assert_eq!(source.load_price_history("B").unwrap().len(), 10);
    }
}
