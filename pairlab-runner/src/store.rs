//! Bounded in-memory store of run results.
//!
//! Keyed by [`RunKey`]. A run's entry is created when it starts and updated
//! as its events arrive. Capacity is fixed: inserting into a full store
//! evicts the least recently used run. An optional TTL expires entries by
//! age regardless of use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RunKey;
use crate::events::{PairsFoundRecord, SimulationEvent};

/// What a run produced so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub records: Vec<PairsFoundRecord>,
    pub diagnostics: Vec<String>,
    pub dates_processed: usize,
    pub finished: bool,
    pub cancelled: bool,
}

impl RunResults {
    /// Fold one event into the results.
    pub fn observe(&mut self, event: &SimulationEvent) {
        match event {
            SimulationEvent::PairsFound(record) => self.records.push(record.clone()),
            SimulationEvent::Diagnostic { .. } => self.diagnostics.push(event.to_string()),
            SimulationEvent::Finished {
                dates_processed,
                cancelled,
            } => {
                self.dates_processed = *dates_processed;
                self.cancelled = *cancelled;
                self.finished = true;
            }
            _ => {}
        }
    }

    /// Total accepted pairs across all dates.
    pub fn pair_count(&self) -> usize {
        self.records.iter().map(|r| r.pairs.len()).sum()
    }
}

#[derive(Debug)]
struct Entry {
    results: RunResults,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Debug)]
pub struct ResultStore {
    capacity: usize,
    ttl: Option<Duration>,
    entries: HashMap<RunKey, Entry>,
    clock: u64,
}

impl ResultStore {
    /// Store holding at most `capacity` runs (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: None,
            entries: HashMap::new(),
            clock: 0,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.inserted_at) >= ttl)
    }

    /// Insert or replace a run. Returns the key evicted to make room, if any.
    pub fn insert(&mut self, key: RunKey, results: RunResults) -> Option<RunKey> {
        let now = Instant::now();
        let stamp = self.tick();
        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            evicted = self.evict_lru();
        }
        self.entries.insert(
            key,
            Entry {
                results,
                inserted_at: now,
                last_used: stamp,
            },
        );
        evicted
    }

    fn evict_lru(&mut self) -> Option<RunKey> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone())?;
        self.entries.remove(&oldest);
        debug!(run = %oldest, "evicted least recently used run");
        Some(oldest)
    }

    /// Look up a run and mark it recently used. Expired runs are dropped.
    pub fn get(&mut self, key: &RunKey) -> Option<&RunResults> {
        self.get_mut(key).map(|r| &*r)
    }

    pub fn get_mut(&mut self, key: &RunKey) -> Option<&mut RunResults> {
        let now = Instant::now();
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            self.entries.remove(key);
            return None;
        }
        let stamp = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = stamp;
        Some(&mut entry.results)
    }

    /// Look up without touching recency.
    pub fn peek(&self, key: &RunKey) -> Option<&RunResults> {
        self.entries.get(key).map(|e| &e.results)
    }

    pub fn contains(&self, key: &RunKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &RunKey) -> Option<RunResults> {
        self.entries.remove(key).map(|e| e.results)
    }

    /// Fold an event into a stored run. False if the run is not stored.
    pub fn record_event(&mut self, key: &RunKey, event: &SimulationEvent) -> bool {
        match self.get_mut(key) {
            Some(results) => {
                results.observe(event);
                true
            }
            None => false,
        }
    }

    /// Drop every entry older than the TTL as of `now`. Returns how many.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted_at) < ttl);
        before - self.entries.len()
    }

    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Stored keys, most recently used first.
    pub fn keys(&self) -> Vec<RunKey> {
        let mut keyed: Vec<(&RunKey, u64)> =
            self.entries.iter().map(|(k, e)| (k, e.last_used)).collect();
        keyed.sort_by(|a, b| b.1.cmp(&a.1));
        keyed.into_iter().map(|(k, _)| k.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(n: u32) -> RunKey {
        RunKey {
            strategy: "pairs_trading".into(),
            params_hash: format!("{n:064}"),
            started_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, n)
                .unwrap(),
        }
    }

    fn found(day: u32, pairs: usize) -> SimulationEvent {
        use crate::events::PairRecord;
        SimulationEvent::PairsFound(PairsFoundRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            tested: 6,
            pairs: (0..pairs)
                .map(|i| PairRecord {
                    ticker_a: format!("A{i}"),
                    ticker_b: format!("B{i}"),
                    p_value: 0.01,
                    test_statistic: -4.0,
                    hedge_ratio: 1.0,
                    signal: None,
                })
                .collect(),
        })
    }

    #[test]
    fn lru_eviction_on_overflow() {
        let mut store = ResultStore::new(2);
        assert_eq!(store.insert(key(1), RunResults::default()), None);
        assert_eq!(store.insert(key(2), RunResults::default()), None);
        // Touch 1 so 2 becomes least recently used.
        assert!(store.get(&key(1)).is_some());
        assert_eq!(store.insert(key(3), RunResults::default()), Some(key(2)));
        assert!(store.contains(&key(1)));
        assert!(!store.contains(&key(2)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec![key(3), key(1)]);
    }

    #[test]
    fn reinsert_does_not_evict() {
        let mut store = ResultStore::new(1);
        store.insert(key(1), RunResults::default());
        assert_eq!(store.insert(key(1), RunResults::default()), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn events_fold_into_results() {
        let mut store = ResultStore::new(4);
        store.insert(key(1), RunResults::default());
        assert!(store.record_event(&key(1), &found(10, 2)));
        assert!(store.record_event(&key(1), &found(11, 1)));
        assert!(store.record_event(
            &key(1),
            &SimulationEvent::Finished {
                dates_processed: 2,
                cancelled: false
            }
        ));
        assert!(!store.record_event(&key(9), &found(10, 1)));

        let results = store.peek(&key(1)).unwrap();
        assert_eq!(results.records.len(), 2);
        assert_eq!(results.pair_count(), 3);
        assert!(results.finished);
        assert_eq!(results.dates_processed, 2);
    }

    #[test]
    fn ttl_purge() {
        let mut store = ResultStore::new(4).with_ttl(Duration::from_secs(60));
        store.insert(key(1), RunResults::default());
        store.insert(key(2), RunResults::default());
        assert_eq!(store.purge_expired_at(Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(120);
        assert_eq!(store.purge_expired_at(later), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn zero_ttl_expires_on_get() {
        let mut store = ResultStore::new(4).with_ttl(Duration::ZERO);
        store.insert(key(1), RunResults::default());
        assert!(store.get(&key(1)).is_none());
        assert!(!store.contains(&key(1)));
    }

    #[test]
    fn remove_returns_results() {
        let mut store = ResultStore::new(2);
        store.insert(key(1), RunResults::default());
        assert!(store.remove(&key(1)).is_some());
        assert!(store.remove(&key(1)).is_none());
    }
}
