//! Market data: the source trait, concrete sources, the membership mask, and the price cache.

pub mod cache;
pub mod flat_file;
pub mod mask;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use cache::{CacheFill, CacheMeta, CachedSource, ParquetPriceCache};
pub use flat_file::FlatFileSource;
pub use mask::MembershipMask;
pub use memory::InMemorySource;
pub use provider::{DataError, MarketDataSource, SectorInfo, SectorTable};
pub use synthetic::SyntheticMarket;
