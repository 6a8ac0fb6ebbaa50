//! Domain types for PairLab

pub mod bar;
pub mod pair;
pub mod window;

pub use bar::{normalize_history, PriceBar};
pub use pair::{CointegrationResult, TickerPair};
pub use window::{PriceWindow, WindowSet};

/// Ticker type alias
pub type Ticker = String;
