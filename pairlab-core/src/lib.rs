//! PairLab Core — market data, point-in-time universe, lookback windows, cointegration screen.
//!
//! This crate holds everything one simulated date needs:
//! - Domain types (bars, windows, pairs, cointegration results)
//! - The `MarketDataSource` trait with flat-file, in-memory, and Parquet-cached sources
//! - Exact-date universe resolution against the membership mask
//! - No-lookahead window assembly
//! - Engle–Granger statistics and the O(k²) pair screen
//! - Spread z-score bands for accepted pairs

pub mod data;
pub mod domain;
pub mod screen;
pub mod spread;
pub mod stats;
pub mod universe;
pub mod window;

pub use data::{DataError, MarketDataSource, MembershipMask};
pub use domain::{CointegrationResult, PriceBar, PriceWindow, Ticker, TickerPair, WindowSet};
pub use screen::{PairScreener, ScreenReport};
pub use spread::{SpreadBand, SpreadSignal};
pub use universe::{members_on, UniverseError};
pub use window::{assemble, WindowAssembly};
