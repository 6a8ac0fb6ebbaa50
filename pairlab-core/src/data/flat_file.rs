//! Flat-file market data source.
//!
//! Layout under the data root:
//! - `market_data/{TICKER}.csv` — daily bars, date column `dt`
//! - `in_spx_mask.csv` — `date` column plus one 0/1 column per ticker
//! - `sectors.csv` — ticker plus group/sector/subgroup columns
//!
//! Columns are located by header name (case-insensitive); unknown columns are
//! ignored. Blank price cells load as NaN so the screener can exclude the
//! affected pairs instead of the whole ticker silently vanishing.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::mask::MembershipMask;
use super::provider::{DataError, MarketDataSource, SectorInfo, SectorTable};
use crate::domain::{normalize_history, PriceBar, Ticker};

const MARKET_DATA_DIR: &str = "market_data";
const MASK_FILE: &str = "in_spx_mask.csv";
const SECTORS_FILE: &str = "sectors.csv";

/// Reads the on-disk CSV layout. Every call re-reads the files.
#[derive(Debug, Clone)]
pub struct FlatFileSource {
    root: PathBuf,
}

impl FlatFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn market_data_dir(&self) -> PathBuf {
        self.root.join(MARKET_DATA_DIR)
    }

    fn price_path(&self, ticker: &str) -> PathBuf {
        self.market_data_dir().join(format!("{ticker}.csv"))
    }

    fn mask_path(&self) -> PathBuf {
        self.root.join(MASK_FILE)
    }

    fn sectors_path(&self) -> PathBuf {
        self.root.join(SECTORS_FILE)
    }
}

impl MarketDataSource for FlatFileSource {
    fn name(&self) -> &str {
        "flat-file"
    }

    fn load_price_history(&self, ticker: &str) -> Result<Vec<PriceBar>, DataError> {
        let path = self.price_path(ticker);
        if !path.is_file() {
            return Err(DataError::not_found(format!("price history for '{ticker}'")));
        }
        let bars = read_price_csv(&path)?;
        debug!(ticker, bars = bars.len(), "loaded price history");
        Ok(bars)
    }

    fn load_membership_mask(&self) -> Result<MembershipMask, DataError> {
        let path = self.mask_path();
        if !path.is_file() {
            return Err(DataError::not_found(format!(
                "membership mask at {}",
                path.display()
            )));
        }
        read_mask_csv(&path)
    }

    fn load_sector_table(&self) -> Result<SectorTable, DataError> {
        let path = self.sectors_path();
        if !path.is_file() {
            return Err(DataError::not_found(format!(
                "sector table at {}",
                path.display()
            )));
        }
        read_sectors_csv(&path)
    }

    fn available_tickers(&self) -> Result<Vec<Ticker>, DataError> {
        let dir = self.market_data_dir();
        let entries = fs::read_dir(&dir).map_err(|e| DataError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tickers.push(stem.to_string());
            }
        }
        tickers.sort();
        Ok(tickers)
    }
}

// ── CSV helpers ─────────────────────────────────────────────────────

/// Parse a calendar date, ignoring any time-of-day suffix.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, DataError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Csv {
            path: path.display().to_string(),
            source: e,
        })
}

fn headers(reader: &mut csv::Reader<fs::File>, path: &Path) -> Result<Vec<String>, DataError> {
    Ok(reader
        .headers()
        .map_err(|e| DataError::Csv {
            path: path.display().to_string(),
            source: e,
        })?
        .iter()
        .map(|h| h.to_string())
        .collect())
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn parse_price(raw: Option<&str>) -> Result<f64, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(s) => s.parse::<f64>().map_err(|e| format!("'{s}': {e}")),
    }
}

/// Read one ticker's bar file. Rows come back sorted by date, one per date.
pub fn read_price_csv(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader, path)?;
    let path_str = path.display().to_string();

    let date_col = find_column(&headers, &["dt", "date"]).ok_or_else(|| {
        DataError::Validation(format!("{path_str}: missing date column 'dt'"))
    })?;
    let close_col = find_column(&headers, &["close"]).ok_or_else(|| {
        DataError::Validation(format!("{path_str}: missing column 'close'"))
    })?;
    let open_col = find_column(&headers, &["open"]);
    let high_col = find_column(&headers, &["high"]);
    let low_col = find_column(&headers, &["low"]);
    let volume_col = find_column(&headers, &["volume"]);

    let mut bars = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 2;
        let record = record.map_err(|e| DataError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

        let raw_date = record.get(date_col).unwrap_or("");
        let date = parse_calendar_date(raw_date).ok_or_else(|| DataError::Parse {
            path: path_str.clone(),
            row,
            column: headers[date_col].clone(),
            message: format!("unparsable date '{raw_date}'"),
        })?;

        let field = |col: Option<usize>, name: &str| -> Result<f64, DataError> {
            parse_price(col.and_then(|c| record.get(c))).map_err(|message| DataError::Parse {
                path: path_str.clone(),
                row,
                column: name.to_string(),
                message,
            })
        };

        let close = field(Some(close_col), "close")?;
        let open = open_col.map_or(Ok(close), |c| field(Some(c), "open"))?;
        let high = high_col.map_or(Ok(close), |c| field(Some(c), "high"))?;
        let low = low_col.map_or(Ok(close), |c| field(Some(c), "low"))?;
        let volume = field(volume_col, "volume")?;

        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: if volume.is_nan() { 0.0 } else { volume },
        });
    }

    Ok(normalize_history(bars))
}

/// Parse one mask cell. Blank and 0 mean "not a member".
fn parse_flag(raw: &str) -> Result<u8, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    match raw.parse::<f64>() {
        Ok(v) if v == 1.0 => Ok(1),
        Ok(v) if v == 0.0 => Ok(0),
        Ok(v) => Err(format!("flag must be 0 or 1, got {v}")),
        Err(_) => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(1),
            "false" => Ok(0),
            _ => Err(format!("unparsable flag '{raw}'")),
        },
    }
}

/// Read the membership mask table.
///
/// A row whose flags cannot be parsed is recorded as malformed for its date.
/// A row whose date cannot be parsed is skipped with a warning.
pub fn read_mask_csv(path: &Path) -> Result<MembershipMask, DataError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader, path)?;
    let path_str = path.display().to_string();

    let date_col = find_column(&headers, &["date", "dt"]).ok_or_else(|| {
        DataError::Validation(format!("{path_str}: missing date column 'date'"))
    })?;

    let mut mask = MembershipMask::new();
    let mut skipped_rows = 0usize;

    for (i, record) in reader.records().enumerate() {
        let row = i + 2;
        let record = record.map_err(|e| DataError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

        let raw_date = record.get(date_col).unwrap_or("");
        let Some(date) = parse_calendar_date(raw_date) else {
            warn!(path = %path_str, row, raw_date, "skipping mask row with unparsable date");
            skipped_rows += 1;
            continue;
        };

        let mut members = Vec::new();
        let mut problem = None;
        for (col, ticker) in headers.iter().enumerate() {
            if col == date_col {
                continue;
            }
            match parse_flag(record.get(col).unwrap_or("")) {
                Ok(1) => members.push(ticker.clone()),
                Ok(_) => {}
                Err(message) => {
                    problem = Some(format!("row {row}, column '{ticker}': {message}"));
                    break;
                }
            }
        }

        match problem {
            Some(reason) => mask.mark_malformed(date, reason),
            None => {
                let row_set = mask.add_row(date);
                row_set.extend(members);
            }
        }
    }

    if skipped_rows > 0 || mask.malformed_count() > 0 {
        warn!(
            path = %path_str,
            skipped_rows,
            malformed_rows = mask.malformed_count(),
            "membership mask loaded with problems"
        );
    }
    Ok(mask)
}

/// Read the sector reference table.
pub fn read_sectors_csv(path: &Path) -> Result<SectorTable, DataError> {
    let mut reader = open_reader(path)?;
    let headers = headers(&mut reader, path)?;
    let path_str = path.display().to_string();

    let ticker_col = find_column(&headers, &["ticker", "symbol"]).ok_or_else(|| {
        DataError::Validation(format!("{path_str}: missing column 'ticker'"))
    })?;
    let group_col = find_column(&headers, &["group", "industry_group"]);
    let sector_col = find_column(&headers, &["sector"]);
    let subgroup_col = find_column(&headers, &["subgroup", "sub_group", "industry"]);

    let mut table = SectorTable::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataError::Csv {
            path: path_str.clone(),
            source: e,
        })?;
        let cell = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let ticker = cell(Some(ticker_col));
        if ticker.is_empty() {
            continue;
        }
        table.insert(
            ticker,
            SectorInfo {
                group: cell(group_col),
                sector: cell(sector_col),
                subgroup: cell(subgroup_col),
            },
        );
    }
    Ok(table)
}
