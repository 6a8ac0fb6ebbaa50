//! Parquet cache of per-ticker price histories with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/ticker={TICKER}/{year}.parquet` plus a `meta.json`
//! sidecar per ticker.
//!
//! - Writes are atomic (write to `.tmp`, rename into place)
//! - Loads validate schema and row count
//! - Corrupt partitions are quarantined (`{file}.quarantined`) and skipped

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::mask::MembershipMask;
use super::provider::{DataError, MarketDataSource, SectorTable};
use crate::domain::{normalize_history, PriceBar, Ticker};

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for a cached ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    /// BLAKE3 over the JSON encoding of the cached bars.
    pub data_hash: String,
    /// Name of the source the bars were copied from.
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

pub struct ParquetPriceCache {
    cache_dir: PathBuf,
}

impl ParquetPriceCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn ticker_dir(&self, ticker: &str) -> PathBuf {
        self.cache_dir.join(format!("ticker={ticker}"))
    }

    fn year_path(&self, ticker: &str, year: i32) -> PathBuf {
        self.ticker_dir(ticker).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, ticker: &str) -> PathBuf {
        self.ticker_dir(ticker).join("meta.json")
    }

    /// Write a ticker's bars, one Parquet file per calendar year.
    pub fn write(&self, ticker: &str, bars: &[PriceBar], source: &str) -> Result<CacheMeta, DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::Cache(format!("no bars to cache for '{ticker}'")));
        };

        let dir = self.ticker_dir(ticker);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Cache(format!("failed to create {}: {e}", dir.display())))?;

        let mut by_year: BTreeMap<i32, Vec<&PriceBar>> = BTreeMap::new();
        for bar in bars {
            by_year.entry(bar.date.year()).or_default().push(bar);
        }

        for (year, year_bars) in &by_year {
            let mut df = bars_to_dataframe(year_bars)?;
            let path = self.year_path(ticker, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::Cache(format!("atomic rename failed: {e}"))
            })?;
        }

        let encoded = serde_json::to_vec(bars)
            .map_err(|e| DataError::Cache(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            ticker: ticker.to_string(),
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            data_hash: blake3::hash(&encoded).to_hex().to_string(),
            source: source.to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Cache(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(ticker), meta_json)
            .map_err(|e| DataError::Cache(format!("meta write: {e}")))?;

        debug!(ticker, bars = bars.len(), years = by_year.len(), "cached price history");
        Ok(meta)
    }

    /// Load every cached bar for a ticker, sorted by date.
    pub fn load(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        let dir = self.ticker_dir(ticker);
        if !dir.is_dir() {
            return Err(DataError::not_found(format!("cached bars for '{ticker}'")));
        }

        let entries = fs::read_dir(&dir).map_err(|e| DataError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut bars = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }

            match load_and_validate_parquet(&path) {
                Ok(part) => bars.extend(part),
                Err(e) => {
                    let quarantine = path.with_extension("parquet.quarantined");
                    warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                    let _ = fs::rename(&path, &quarantine);
                }
            }
        }

        if bars.is_empty() {
            return Err(DataError::not_found(format!("cached bars for '{ticker}'")));
        }
        Ok(normalize_history(bars))
    }

    pub fn get_meta(&self, ticker: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(ticker)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.get_meta(ticker).is_some()
    }

    /// Tickers with a metadata sidecar, sorted.
    pub fn cached_tickers(&self) -> Vec<Ticker> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut tickers: Vec<Ticker> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix("ticker="))
                    .map(str::to_string)
            })
            .filter(|t| self.contains(t))
            .collect();
        tickers.sort();
        tickers
    }

    /// Copy every available ticker of `source` into the cache.
    ///
    /// Tickers the source has no bars for are skipped. A ticker that fails to
    /// load or write is logged and recorded in [`CacheFill::failed`]; the
    /// remaining tickers are still cached.
    pub fn fill_from(&self, source: &dyn MarketDataSource) -> Result<CacheFill, DataError> {
        let mut fill = CacheFill::default();
        for ticker in source.available_tickers()? {
            let bars = match source.load_price_history(&ticker) {
                Ok(bars) if !bars.is_empty() => bars,
                Ok(_) => continue,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!(%ticker, error = %e, "skipping ticker");
                    fill.failed.push((ticker, e));
                    continue;
                }
            };
            match self.write(&ticker, &bars, source.name()) {
                Ok(meta) => fill.written.push(meta),
                Err(e) => {
                    warn!(%ticker, error = %e, "failed to cache ticker");
                    fill.failed.push((ticker, e));
                }
            }
        }
        Ok(fill)
    }
}

/// Outcome of [`ParquetPriceCache::fill_from`].
#[derive(Debug, Default)]
pub struct CacheFill {
    pub written: Vec<CacheMeta>,
    pub failed: Vec<(Ticker, DataError)>,
}

/// Serves price histories from a [`ParquetPriceCache`], reading through to
/// `inner` on a miss and caching the result. Mask and sector table always
/// come from `inner`.
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<ParquetPriceCache>,
}

impl<S: MarketDataSource> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<ParquetPriceCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &ParquetPriceCache {
        &self.cache
    }
}

impl<S: MarketDataSource> MarketDataSource for CachedSource<S> {
    fn name(&self) -> &str {
        "parquet-cache"
    }

    fn load_price_history(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        match self.cache.load(ticker) {
            Ok(bars) => return Ok(bars),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let bars = self.inner.load_price_history(ticker)?;
        if !bars.is_empty() {
            if let Err(e) = self.cache.write(ticker, &bars, self.inner.name()) {
                warn!(ticker, error = %e, "failed to populate price cache");
            }
        }
        Ok(bars)
    }

    fn load_membership_mask(&self) -> Result<MembershipMask, DataError> {
        self.inner.load_membership_mask()
    }

    fn load_sector_table(&self) -> Result<SectorTable, DataError> {
        self.inner.load_sector_table()
    }

    fn available_tickers(&self) -> Result<Vec<Ticker>, DataError> {
        self.inner.available_tickers()
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[&PriceBar]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path)
        .map_err(|e| DataError::Parquet(format!("create {}: {e}", path.display())))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::Validation("empty parquet file".into()));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::Validation(format!("missing column '{name}'")));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, DataError> {
    let col_err = |name: &str, e: PolarsError| DataError::Parquet(format!("column '{name}': {e}"));

    let date_col = df.column("date").map_err(|e| col_err("date", e))?;
    let open_col = df.column("open").map_err(|e| col_err("open", e))?;
    let high_col = df.column("high").map_err(|e| col_err("high", e))?;
    let low_col = df.column("low").map_err(|e| col_err("low", e))?;
    let close_col = df.column("close").map_err(|e| col_err("close", e))?;
    let volume_col = df.column("volume").map_err(|e| col_err("volume", e))?;

    let date_ca = date_col.date().map_err(|e| col_err("date", e))?;
    let open_ca = open_col.f64().map_err(|e| col_err("open", e))?;
    let high_ca = high_col.f64().map_err(|e| col_err("high", e))?;
    let low_ca = low_col.f64().map_err(|e| col_err("low", e))?;
    let close_ca = close_col.f64().map_err(|e| col_err("close", e))?;
    let volume_ca = volume_col.f64().map_err(|e| col_err("volume", e))?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null date at row {i}")))?;
        bars.push(PriceBar {
            date: epoch() + chrono::Duration::days(days as i64),
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: volume_ca.get(i).unwrap_or(0.0),
        });
    }
    Ok(bars)
}
