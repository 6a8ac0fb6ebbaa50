//! Events emitted by a running simulation.
//!
//! Each event renders a one-line status message through `Display`; the
//! structured fields are what JSON consumers read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use pairlab_core::domain::{CointegrationResult, Ticker};
use pairlab_core::SpreadSignal;

/// One accepted pair on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub ticker_a: Ticker,
    pub ticker_b: Ticker,
    pub p_value: f64,
    pub test_statistic: f64,
    pub hedge_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<SpreadSignal>,
}

impl PairRecord {
    pub fn from_result(result: &CointegrationResult, signal: Option<SpreadSignal>) -> Self {
        Self {
            ticker_a: result.pair.first.clone(),
            ticker_b: result.pair.second.clone(),
            p_value: result.p_value,
            test_statistic: result.test_statistic,
            hedge_ratio: result.hedge_ratio,
            signal,
        }
    }
}

/// All cointegrated pairs found on one date, in enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsFoundRecord {
    pub date: NaiveDate,
    /// Pairs tested that date, accepted or not.
    pub tested: usize,
    pub pairs: Vec<PairRecord>,
}

impl PairsFoundRecord {
    pub fn count(&self) -> usize {
        self.pairs.len()
    }
}

impl fmt::Display for PairsFoundRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: found {} cointegrated pair(s)",
            self.date,
            self.pairs.len()
        )?;
        for (i, pair) in self.pairs.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(
                f,
                "{sep}{}/{} (p={:.4})",
                pair.ticker_a, pair.ticker_b, pair.p_value
            )?;
            if let Some(signal) = &pair.signal {
                write!(f, " [z={:.2}, {}]", signal.zscore, signal.band)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationEvent {
    Started {
        strategy: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// The mask has no members on this date (weekend, holiday, gap).
    NoConstituents { date: NaiveDate },
    /// Fewer than two tickers had a complete window.
    NotEnoughData { date: NaiveDate, valid: usize },
    NoPairs { date: NaiveDate, tested: usize },
    PairsFound(PairsFoundRecord),
    /// A recovered per-date problem. Processing continued.
    Diagnostic {
        date: Option<NaiveDate>,
        message: String,
    },
    Finished {
        dates_processed: usize,
        cancelled: bool,
    },
}

impl SimulationEvent {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            SimulationEvent::NoConstituents { date }
            | SimulationEvent::NotEnoughData { date, .. }
            | SimulationEvent::NoPairs { date, .. } => Some(*date),
            SimulationEvent::PairsFound(record) => Some(record.date),
            SimulationEvent::Diagnostic { date, .. } => *date,
            SimulationEvent::Started { .. } | SimulationEvent::Finished { .. } => None,
        }
    }

    /// True for the last event of every run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulationEvent::Finished { .. })
    }
}

impl fmt::Display for SimulationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationEvent::Started {
                strategy,
                start,
                end,
            } => write!(f, "starting {strategy} simulation from {start} to {end}"),
            SimulationEvent::NoConstituents { date } => {
                write!(f, "{date}: no constituents")
            }
            SimulationEvent::NotEnoughData { date, valid } => write!(
                f,
                "{date}: not enough data ({valid} ticker(s) with a full window)"
            ),
            SimulationEvent::NoPairs { date, tested } => {
                write!(f, "{date}: no cointegrated pairs among {tested} tested")
            }
            SimulationEvent::PairsFound(record) => fmt::Display::fmt(record, f),
            SimulationEvent::Diagnostic {
                date: Some(date),
                message,
            } => write!(f, "{date}: {message}"),
            SimulationEvent::Diagnostic {
                date: None,
                message,
            } => f.write_str(message),
            SimulationEvent::Finished {
                dates_processed,
                cancelled: false,
            } => write!(f, "simulation complete ({dates_processed} date(s))"),
            SimulationEvent::Finished {
                dates_processed,
                cancelled: true,
            } => write!(
                f,
                "simulation cancelled after {dates_processed} date(s)"
            ),
        }
    }
}
