//! Name → strategy factory table, populated statically at startup.

use std::collections::BTreeMap;

use crate::config::SimulationConfig;
use crate::strategy::{PairsTradingStrategy, Strategy};

/// Builds a strategy from a validated config.
pub type StrategyFactory = fn(&SimulationConfig) -> Box<dyn Strategy>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown strategy '{name}' (available: {available})")]
    UnknownStrategy { name: String, available: String },
    #[error("strategy '{0}' is already registered")]
    Duplicate(String),
}

#[derive(Clone)]
pub struct StrategyRegistry {
    factories: BTreeMap<&'static str, StrategyFactory>,
}

fn pairs_trading(config: &SimulationConfig) -> Box<dyn Strategy> {
    Box::new(PairsTradingStrategy::from_config(config))
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in strategy.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.factories.insert(PairsTradingStrategy::NAME, pairs_trading);
        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        factory: StrategyFactory,
    ) -> Result<(), RegistryError> {
        if self.factories.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build the strategy named by `config.strategy`.
    pub fn create(&self, config: &SimulationConfig) -> Result<Box<dyn Strategy>, RegistryError> {
        self.create_named(&config.strategy, config)
    }

    pub fn create_named(
        &self,
        name: &str,
        config: &SimulationConfig,
    ) -> Result<Box<dyn Strategy>, RegistryError> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory(config)),
            None => Err(RegistryError::UnknownStrategy {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            }),
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
