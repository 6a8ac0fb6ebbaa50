//! Date-by-date simulation state machine.
//!
//! `Initializing → PerDate → Finished`. A [`Simulation`] is an iterator: each
//! pull either returns a buffered event or processes the next calendar date,
//! so nothing runs ahead of the consumer. Per-date problems become
//! [`SimulationEvent::Diagnostic`] events; the loop never aborts early.

use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use pairlab_core::data::{DataError, MarketDataSource, MembershipMask};
use pairlab_core::screen::{PairScreener, SkippedPair};
use pairlab_core::{assemble, members_on, SpreadSignal};

use crate::config::SimulationConfig;
use crate::events::{PairRecord, PairsFoundRecord, SimulationEvent};

/// Fatal conditions. All are raised before the first event.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("membership mask unavailable: {0}")]
    MaskUnavailable(#[source] DataError),

    #[error("failed to spawn simulation worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Per-date screening parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub lookback_period: usize,
    pub p_value_threshold: f64,
    /// Spread band for accepted pairs. `None` skips the spread signal.
    pub zscore_threshold: Option<f64>,
    pub parallel_screen: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            lookback_period: crate::config::DEFAULT_LOOKBACK,
            p_value_threshold: crate::config::DEFAULT_P_VALUE_THRESHOLD,
            zscore_threshold: Some(crate::config::DEFAULT_ZSCORE_THRESHOLD),
            parallel_screen: false,
        }
    }
}

impl From<&SimulationConfig> for SimulationParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            lookback_period: config.lookback_period,
            p_value_threshold: config.p_value_threshold,
            zscore_threshold: Some(config.zscore_threshold),
            parallel_screen: config.parallel_screen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    /// `None` once the last date in range has been processed.
    PerDate { next: Option<NaiveDate> },
    Finished,
}

/// A lazy, single-use run over `[start, end]`.
pub struct Simulation {
    strategy: String,
    source: Arc<dyn MarketDataSource>,
    mask: MembershipMask,
    params: SimulationParams,
    screener: PairScreener,
    start: NaiveDate,
    end: NaiveDate,
    phase: Phase,
    pending: VecDeque<SimulationEvent>,
    dates_processed: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl Simulation {
    /// Validate the range and load the mask. Fails before any event exists.
    pub fn new(
        strategy: impl Into<String>,
        source: Arc<dyn MarketDataSource>,
        params: SimulationParams,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, SimulationError> {
        if start > end {
            return Err(SimulationError::InvalidDateRange { start, end });
        }
        let mask = source
            .load_membership_mask()
            .map_err(SimulationError::MaskUnavailable)?;
        if mask.malformed_count() > 0 {
            warn!(
                rows = mask.malformed_count(),
                "membership mask has malformed rows"
            );
        }

        let screener =
            PairScreener::new(params.p_value_threshold).with_parallelism(params.parallel_screen);

        Ok(Self {
            strategy: strategy.into(),
            source,
            mask,
            params,
            screener,
            start,
            end,
            phase: Phase::Initializing,
            pending: VecDeque::new(),
            dates_processed: 0,
            cancel: None,
        })
    }

    /// Check `flag` between dates and stop early once it is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }

    pub fn dates_processed(&self) -> usize {
        self.dates_processed
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished && self.pending.is_empty()
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn finish(&mut self, cancelled: bool) -> SimulationEvent {
        self.phase = Phase::Finished;
        info!(
            strategy = %self.strategy,
            dates = self.dates_processed,
            cancelled,
            "simulation finished"
        );
        SimulationEvent::Finished {
            dates_processed: self.dates_processed,
            cancelled,
        }
    }

    /// Everything one date produces, in emission order.
    fn process_date(&self, date: NaiveDate) -> Vec<SimulationEvent> {
        let members = match members_on(&self.mask, date) {
            Ok(members) => members,
            Err(e) => {
                warn!(%date, error = %e, "skipping date");
                return vec![SimulationEvent::Diagnostic {
                    date: Some(date),
                    message: e.to_string(),
                }];
            }
        };
        if members.is_empty() {
            debug!(%date, "no constituents");
            return vec![SimulationEvent::NoConstituents { date }];
        }

        let mut events = Vec::new();
        let assembly = assemble(
            &*self.source,
            members.iter().map(String::as_str),
            date,
            self.params.lookback_period,
        );
        if !assembly.unavailable.is_empty() {
            events.push(SimulationEvent::Diagnostic {
                date: Some(date),
                message: describe_unavailable(&assembly.unavailable),
            });
        }
        if !assembly.is_screenable() {
            debug!(
                %date,
                valid = assembly.valid_count(),
                incomplete = assembly.incomplete.len(),
                "not enough data"
            );
            events.push(SimulationEvent::NotEnoughData {
                date,
                valid: assembly.valid_count(),
            });
            return events;
        }

        let report = self.screener.screen(&assembly.windows);
        for skipped in &report.skipped {
            debug!(%date, pair = %skipped.pair, reason = %skipped.reason, "pair skipped");
        }
        debug!(
            %date,
            universe = members.len(),
            windows = assembly.valid_count(),
            tested = report.tested,
            accepted = report.accepted.len(),
            "date screened"
        );

        if report.tested > 0 && report.skipped.len() == report.tested {
            warn!(%date, tested = report.tested, "every pair test failed");
            events.push(SimulationEvent::Diagnostic {
                date: Some(date),
                message: describe_failed_screen(&report.skipped, report.tested),
            });
            return events;
        }
        if report.accepted.is_empty() {
            events.push(SimulationEvent::NoPairs {
                date,
                tested: report.tested,
            });
            return events;
        }

        let pairs = report
            .accepted
            .iter()
            .map(|result| {
                let signal = self.params.zscore_threshold.and_then(|threshold| {
                    let a = assembly.windows.get(&result.pair.first)?;
                    let b = assembly.windows.get(&result.pair.second)?;
                    SpreadSignal::evaluate(a, b, result.hedge_ratio, threshold).ok()
                });
                PairRecord::from_result(result, signal)
            })
            .collect();
        events.push(SimulationEvent::PairsFound(PairsFoundRecord {
            date,
            tested: report.tested,
            pairs,
        }));
        events
    }
}

fn describe_failed_screen(skipped: &[SkippedPair], tested: usize) -> String {
    match skipped.first() {
        Some(first) => format!(
            "all {tested} pair test(s) failed; first: {} ({})",
            first.pair, first.reason
        ),
        None => format!("all {tested} pair test(s) failed"),
    }
}

fn describe_unavailable(unavailable: &[(String, String)]) -> String {
    const SHOWN: usize = 5;
    let names: Vec<&str> = unavailable
        .iter()
        .take(SHOWN)
        .map(|(t, _)| t.as_str())
        .collect();
    let more = unavailable.len().saturating_sub(SHOWN);
    let more = if more > 0 {
        format!(" (+{more} more)")
    } else {
        String::new()
    };
    format!(
        "{} ticker(s) without price data: {}{}",
        unavailable.len(),
        names.join(", "),
        more
    )
}

impl Iterator for Simulation {
    type Item = SimulationEvent;

    fn next(&mut self) -> Option<SimulationEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        match self.phase {
            Phase::Initializing => {
                info!(
                    strategy = %self.strategy,
                    start = %self.start,
                    end = %self.end,
                    lookback = self.params.lookback_period,
                    p_value = self.params.p_value_threshold,
                    "simulation started"
                );
                self.phase = Phase::PerDate {
                    next: Some(self.start),
                };
                Some(SimulationEvent::Started {
                    strategy: self.strategy.clone(),
                    start: self.start,
                    end: self.end,
                })
            }
            Phase::PerDate { next } => {
                if self.cancelled() {
                    return Some(self.finish(true));
                }
                let Some(date) = next else {
                    return Some(self.finish(false));
                };

                let events = self.process_date(date);
                self.dates_processed += 1;
                self.phase = Phase::PerDate {
                    next: date.succ_opt().filter(|d| *d <= self.end),
                };
                self.pending.extend(events);
                // process_date always yields at least one event.
                self.next()
            }
            Phase::Finished => None,
        }
    }
}
