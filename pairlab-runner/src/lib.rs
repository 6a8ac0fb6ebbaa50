//! PairLab Runner — simulation loop, strategy registry, event channel, result store.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML-backed simulation configuration and run keys
//! - The date-by-date simulation state machine and its event stream
//! - A static strategy registry
//! - A background worker with a bounded event channel and cancellation
//! - A bounded LRU/TTL store of run results

pub mod config;
pub mod engine;
pub mod events;
pub mod registry;
pub mod store;
pub mod strategy;
pub mod worker;

use std::sync::Arc;

use thiserror::Error;

use pairlab_core::data::MarketDataSource;

pub use config::{parse_date, ConfigError, RunKey, SimulationConfig};
pub use engine::{Simulation, SimulationError, SimulationParams};
pub use events::{PairRecord, PairsFoundRecord, SimulationEvent};
pub use registry::{RegistryError, StrategyFactory, StrategyRegistry};
pub use store::{ResultStore, RunResults};
pub use strategy::{PairsTradingStrategy, Strategy};
pub use worker::{spawn_prepared, spawn_simulation, SimulationHandle};

/// Errors from starting a run out of a config.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Validate `config`, build its strategy, and start a lazy simulation.
pub fn start_simulation(
    registry: &StrategyRegistry,
    config: &SimulationConfig,
    source: Arc<dyn MarketDataSource>,
) -> Result<Simulation, RunError> {
    config.validate()?;
    let strategy = registry.create(config)?;
    Ok(strategy.run(source, config.start_date, config.end_date)?)
}

/// Like [`start_simulation`], but on a worker thread with the config's channel capacity.
pub fn spawn_from_config(
    registry: &StrategyRegistry,
    config: &SimulationConfig,
    source: Arc<dyn MarketDataSource>,
) -> Result<SimulationHandle, RunError> {
    let simulation = start_simulation(registry, config, source)?;
    Ok(spawn_prepared(simulation, config.channel_capacity)?)
}
