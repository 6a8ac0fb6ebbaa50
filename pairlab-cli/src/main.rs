//! PairLab CLI — run simulations, list strategies, inspect constituents, manage the cache.
//!
//! Commands:
//! - `run` — stream a pairs-trading simulation over a date range
//! - `strategies` — list registered strategies
//! - `constituents` — index members on a date, joined with sectors
//! - `cache build` — fill the Parquet price cache from flat files
//! - `cache status` — list cached tickers and their date ranges
//!
//! Events go to stdout (one status line or JSON object each); logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pairlab_core::data::{
    CachedSource, FlatFileSource, MarketDataSource, ParquetPriceCache, SectorTable,
    SyntheticMarket,
};
use pairlab_core::members_on;
use pairlab_runner::{
    parse_date, spawn_from_config, ResultStore, RunResults, SimulationConfig, StrategyRegistry,
};

#[derive(Parser)]
#[command(
    name = "pairlab",
    about = "PairLab CLI — point-in-time cointegration screen over index constituents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and stream its events.
    Run {
        /// Data directory with market_data/, in_spx_mask.csv and sectors.csv.
        #[arg(long, conflicts_with = "synthetic")]
        data_dir: Option<PathBuf>,

        /// Use a generated market with this seed instead of --data-dir.
        #[arg(long)]
        synthetic: Option<u64>,

        /// Start date (YYYY-MM-DD). Required unless --config sets it.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Required unless --config sets it.
        #[arg(long)]
        end: Option<String>,

        /// Trailing bars per ticker.
        #[arg(long)]
        lookback: Option<usize>,

        /// Accept pairs with p-value below this.
        #[arg(long)]
        p_value: Option<f64>,

        /// Spread z-score band for accepted pairs.
        #[arg(long)]
        zscore: Option<f64>,

        /// TOML config file. Flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy name (see `pairlab strategies`).
        #[arg(long)]
        strategy: Option<String>,

        /// Screen pairs in parallel.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Read price histories through this Parquet cache.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Emit events as JSON lines.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List registered strategies.
    Strategies,
    /// Show index constituents on a date.
    Constituents {
        #[arg(long)]
        data_dir: PathBuf,

        /// Date (YYYY-MM-DD). Defaults to the latest date in the mask.
        #[arg(long)]
        date: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Price cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Cache every ticker found under <data-dir>/market_data.
    Build {
        #[arg(long)]
        data_dir: PathBuf,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// List cached tickers with their date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

struct RunArgs {
    data_dir: Option<PathBuf>,
    synthetic: Option<u64>,
    start: Option<String>,
    end: Option<String>,
    lookback: Option<usize>,
    p_value: Option<f64>,
    zscore: Option<f64>,
    config: Option<PathBuf>,
    strategy: Option<String>,
    parallel: bool,
    cache_dir: Option<PathBuf>,
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data_dir,
            synthetic,
            start,
            end,
            lookback,
            p_value,
            zscore,
            config,
            strategy,
            parallel,
            cache_dir,
            json,
        } => run_simulation_cmd(RunArgs {
            data_dir,
            synthetic,
            start,
            end,
            lookback,
            p_value,
            zscore,
            config,
            strategy,
            parallel,
            cache_dir,
            json,
        }),
        Commands::Strategies => run_strategies(),
        Commands::Constituents {
            data_dir,
            date,
            json,
        } => run_constituents(data_dir, date, json),
        Commands::Cache { action } => match action {
            CacheAction::Build {
                data_dir,
                cache_dir,
            } => run_cache_build(data_dir, cache_dir),
            CacheAction::Status { cache_dir } => run_cache_status(cache_dir),
        },
    }
}

/// Merge the config file (if any) with command-line overrides.
fn build_config(args: &RunArgs) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => {
            let (Some(start), Some(end)) = (&args.start, &args.end) else {
                bail!("--start and --end are required without --config");
            };
            SimulationConfig::new(parse_date(start)?, parse_date(end)?)
        }
    };

    if let Some(start) = &args.start {
        config.start_date = parse_date(start)?;
    }
    if let Some(end) = &args.end {
        config.end_date = parse_date(end)?;
    }
    if let Some(lookback) = args.lookback {
        config.lookback_period = lookback;
    }
    if let Some(p) = args.p_value {
        config.p_value_threshold = p;
    }
    if let Some(z) = args.zscore {
        config.zscore_threshold = z;
    }
    if let Some(name) = &args.strategy {
        config.strategy = name.clone();
    }
    if args.parallel {
        config.parallel_screen = true;
    }

    config.validate()?;
    Ok(config)
}

fn build_source(args: &RunArgs, config: &SimulationConfig) -> Result<Arc<dyn MarketDataSource>> {
    if let Some(seed) = args.synthetic {
        // Enough history before the start date for one full window.
        let warmup = config.lookback_period as i64 * 2;
        let first = config.start_date - chrono::Duration::days(warmup);
        let days = (config.end_date - first).num_days().max(0) as usize + 1;
        let market = SyntheticMarket::new(seed, first, days)
            .cointegrated("AAA", "BBB", 1.5)
            .cointegrated("CCC", "DDD", 0.8)
            .random_walk("EEE")
            .random_walk("FFF")
            .build();
        info!(seed, "using synthetic market");
        return Ok(Arc::new(market));
    }

    let Some(data_dir) = &args.data_dir else {
        bail!("either --data-dir or --synthetic is required");
    };
    if !data_dir.is_dir() {
        bail!("data directory not found: {}", data_dir.display());
    }
    let flat = FlatFileSource::new(data_dir);

    match &args.cache_dir {
        Some(cache_dir) => {
            let cache = Arc::new(ParquetPriceCache::new(cache_dir));
            Ok(Arc::new(CachedSource::new(flat, cache)))
        }
        None => Ok(Arc::new(flat)),
    }
}

fn run_simulation_cmd(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let source = build_source(&args, &config)?;
    let registry = StrategyRegistry::builtin();

    let key = config.run_key(Utc::now().naive_utc());
    let mut store = ResultStore::new(1);
    store.insert(key.clone(), RunResults::default());
    info!(run = %key, source = source.name(), "starting run");

    let handle = spawn_from_config(&registry, &config, source)?;
    for event in handle.iter() {
        store.record_event(&key, &event);
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{event}");
        }
    }
    if handle.join().is_err() {
        bail!("simulation worker panicked");
    }

    if let Some(results) = store.get(&key) {
        info!(
            run = %key,
            dates = results.dates_processed,
            dates_with_pairs = results.records.len(),
            pairs = results.pair_count(),
            diagnostics = results.diagnostics.len(),
            "run complete"
        );
    }
    Ok(())
}

fn run_strategies() -> Result<()> {
    for name in StrategyRegistry::builtin().names() {
        println!("{name}");
    }
    Ok(())
}

fn run_constituents(data_dir: PathBuf, date: Option<String>, json: bool) -> Result<()> {
    let source = FlatFileSource::new(&data_dir);
    let mask = source
        .load_membership_mask()
        .with_context(|| format!("loading membership mask from {}", data_dir.display()))?;

    let date: NaiveDate = match date {
        Some(s) => parse_date(&s)?,
        None => match mask.latest_date() {
            Some(d) => d,
            None => bail!("membership mask is empty"),
        },
    };
    let members = members_on(&mask, date)?;

    let sectors = match source.load_sector_table() {
        Ok(table) => table,
        Err(e) if e.is_not_found() => SectorTable::new(),
        Err(e) => return Err(e.into()),
    };
    let rows = sectors.enrich(members.iter().map(String::as_str));

    if json {
        let out: Vec<serde_json::Value> = rows
            .iter()
            .map(|(ticker, info)| serde_json::json!({ "ticker": ticker, "sector": info }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "date": date, "members": out }))?
        );
        return Ok(());
    }

    println!("{date}: {} constituent(s)", rows.len());
    for (ticker, info) in rows {
        match info {
            Some(info) => println!(
                "  {ticker:<8} {:<28} {:<24} {}",
                info.sector, info.group, info.subgroup
            ),
            None => println!("  {ticker}"),
        }
    }
    Ok(())
}

fn run_cache_build(data_dir: PathBuf, cache_dir: PathBuf) -> Result<()> {
    let source = FlatFileSource::new(&data_dir);
    let cache = ParquetPriceCache::new(&cache_dir);
    let fill = cache.fill_from(&source)?;
    for meta in &fill.written {
        println!(
            "  {:<8} {} → {} ({} bars)",
            meta.ticker, meta.start_date, meta.end_date, meta.bar_count
        );
    }
    for (ticker, err) in &fill.failed {
        println!("  {ticker:<8} FAILED: {err}");
    }
    println!(
        "Cached {} ticker(s) into {}",
        fill.written.len(),
        cache_dir.display()
    );
    if !fill.failed.is_empty() {
        println!("{} ticker(s) could not be cached", fill.failed.len());
    }
    Ok(())
}

fn run_cache_status(cache_dir: PathBuf) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let cache = ParquetPriceCache::new(&cache_dir);
    let tickers = cache.cached_tickers();
    if tickers.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Tickers: {}", tickers.len());
    for ticker in &tickers {
        match cache.get_meta(ticker) {
            Some(meta) => println!(
                "  {:<8} {} → {} ({} bars, source {})",
                ticker, meta.start_date, meta.end_date, meta.bar_count, meta.source
            ),
            None => println!("  {ticker:<8} (no metadata)"),
        }
    }
    Ok(())
}
