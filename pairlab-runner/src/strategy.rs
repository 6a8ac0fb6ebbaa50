//! Strategy trait and the pairs-trading screener.

use chrono::NaiveDate;
use std::sync::Arc;

use pairlab_core::data::MarketDataSource;

use crate::config::SimulationConfig;
use crate::engine::{Simulation, SimulationError, SimulationParams};

/// Something that turns a data source and a date range into an event stream.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Start a run. Fatal validation happens here, before any event.
    fn run(
        &self,
        source: Arc<dyn MarketDataSource>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Simulation, SimulationError>;
}

/// Daily Engle–Granger screen over the point-in-time index universe.
#[derive(Debug, Clone, PartialEq)]
pub struct PairsTradingStrategy {
    params: SimulationParams,
}

impl PairsTradingStrategy {
    pub const NAME: &'static str = "pairs_trading";

    pub fn new(params: SimulationParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(SimulationParams::from(config))
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }
}

impl Default for PairsTradingStrategy {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

impl Strategy for PairsTradingStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(
        &self,
        source: Arc<dyn MarketDataSource>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Simulation, SimulationError> {
        Simulation::new(Self::NAME, source, self.params, start, end)
    }
}
