//! Background simulation worker.
//!
//! The simulation runs on its own named thread and pushes events into a
//! bounded channel. A full channel blocks the worker until the consumer
//! catches up; events are never dropped. Cancellation is cooperative and
//! checked between dates.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

use pairlab_core::data::MarketDataSource;

use crate::engine::{Simulation, SimulationError};
use crate::events::SimulationEvent;
use crate::strategy::Strategy;

/// Consumer side of a running simulation.
pub struct SimulationHandle {
    events: Receiver<SimulationEvent>,
    cancel: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl SimulationHandle {
    /// Ask the worker to stop after the current date.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Block for the next event. `None` once the worker is done.
    pub fn recv(&self) -> Option<SimulationEvent> {
        self.events.recv().ok()
    }

    /// Blocking iterator over the remaining events.
    pub fn iter(&self) -> mpsc::Iter<'_, SimulationEvent> {
        self.events.iter()
    }

    /// Wait for the worker thread to exit.
    pub fn join(mut self) -> thread::Result<()> {
        match self.join.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

/// Start `strategy` on a worker thread.
///
/// Fatal errors (bad range, missing mask) are returned here, before the
/// thread exists and before any event is sent.
pub fn spawn_simulation(
    strategy: &dyn Strategy,
    source: Arc<dyn MarketDataSource>,
    start: NaiveDate,
    end: NaiveDate,
    capacity: usize,
) -> Result<SimulationHandle, SimulationError> {
    let simulation = strategy.run(source, start, end)?;
    spawn_prepared(simulation, capacity)
}

/// Run an already validated simulation on a worker thread.
pub fn spawn_prepared(
    simulation: Simulation,
    capacity: usize,
) -> Result<SimulationHandle, SimulationError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let simulation = simulation.with_cancel_flag(Arc::clone(&cancel));
    let name = format!("pairlab-{}", simulation.strategy());

    let join = thread::Builder::new()
        .name(name)
        .spawn(move || {
            for event in simulation {
                if tx.send(event).is_err() {
                    debug!("event receiver dropped; stopping simulation");
                    break;
                }
            }
        })
        .map_err(SimulationError::Spawn)?;

    Ok(SimulationHandle {
        events: rx,
        cancel,
        join: Some(join),
    })
}
