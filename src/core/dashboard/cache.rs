//! Snapshot cache holding the last known value of every registered source.
//!
//! Each source owns one slot guarded by its own lock, so an update only ever
//! contends with readers of the same source and a reader never sees a
//! half-applied update.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;

use super::payload::MetricPayload;
use super::source::SourceId;
use super::value::MetricValue;
use crate::error::{DashError, Result};

/// Per-source slot as seen by readers.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub source_id: SourceId,
    /// Most recent successful value; `None` until the first success.
    pub last_value: Option<MetricValue>,
    /// Time of the most recent attempt, successful or not.
    pub last_attempt_time: Option<Instant>,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Error of the most recent failure since the last success.
    pub last_error: Option<String>,
    /// Total successful updates.
    pub successes: u64,
}

impl CacheEntry {
    fn new(source_id: SourceId) -> Self {
        Self {
            source_id,
            last_value: None,
            last_attempt_time: None,
            consecutive_failures: 0,
            last_error: None,
            successes: 0,
        }
    }

    pub fn payload(&self) -> Option<&MetricPayload> {
        self.last_value.as_ref().and_then(MetricValue::payload)
    }

    /// The cached value is older than the latest attempt.
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0
    }

    pub fn state(&self) -> EntryState {
        match (&self.last_value, self.consecutive_failures) {
            (None, 0) => EntryState::Pending,
            (None, _) => EntryState::Unavailable,
            (Some(_), 0) => EntryState::Fresh,
            (Some(_), n) => EntryState::Stale { failures: n },
        }
    }
}

/// Coarse display state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No attempt has completed yet.
    Pending,
    /// Latest attempt succeeded.
    Fresh,
    /// Serving an old value; the latest `failures` attempts failed.
    Stale { failures: u32 },
    /// Every attempt so far failed.
    Unavailable,
}

/// What `SnapshotCache::update` did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Stored,
    FailureRecorded,
    /// Older than the cached value; dropped.
    Outdated,
    UnknownSource,
}

/// Thread-safe store of the latest entry per source, in registration order.
#[derive(Debug)]
pub struct SnapshotCache {
    slots: Vec<RwLock<CacheEntry>>,
    index: HashMap<SourceId, usize>,
}

impl SnapshotCache {
    /// Create one empty entry per id. Duplicate ids are rejected.
    pub fn new<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = SourceId>,
    {
        let mut slots = Vec::new();
        let mut index = HashMap::new();

        for id in ids {
            if index.contains_key(&id) {
                return Err(DashError::config(format!(
                    "source '{}' registered twice",
                    id
                )));
            }
            index.insert(id.clone(), slots.len());
            slots.push(RwLock::new(CacheEntry::new(id)));
        }

        Ok(Self { slots, index })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.index.contains_key(source_id)
    }

    /// Copy of one entry, or `None` for an unregistered id.
    pub fn get(&self, source_id: &str) -> Option<CacheEntry> {
        let slot = self.index.get(source_id)?;
        Some(self.slots[*slot].read().clone())
    }

    /// Copies of all entries in registration order.
    pub fn get_all(&self) -> Vec<CacheEntry> {
        self.slots.iter().map(|slot| slot.read().clone()).collect()
    }

    /// Apply the result of one fetch attempt.
    ///
    /// Successes replace the cached value (unless older than it) and reset the
    /// failure count; failures only bump the count and the attempt time.
    pub fn update(&self, source_id: &str, value: MetricValue) -> UpdateOutcome {
        let Some(slot) = self.index.get(source_id) else {
            log::warn!("Dropping update for unregistered source '{}'", source_id);
            return UpdateOutcome::UnknownSource;
        };

        let mut entry = self.slots[*slot].write();
        let attempted_at = value.timestamp();

        if value.ok() {
            let outdated = entry
                .last_value
                .as_ref()
                .is_some_and(|current| attempted_at < current.timestamp());
            if outdated {
                return UpdateOutcome::Outdated;
            }

            entry.last_value = Some(value);
            entry.consecutive_failures = 0;
            entry.last_error = None;
            entry.successes += 1;
            entry.last_attempt_time = Some(latest(entry.last_attempt_time, attempted_at));
            UpdateOutcome::Stored
        } else {
            entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
            entry.last_error = value.error().map(str::to_string);
            entry.last_attempt_time = Some(latest(entry.last_attempt_time, attempted_at));
            UpdateOutcome::FailureRecorded
        }
    }
}

fn latest(current: Option<Instant>, candidate: Instant) -> Instant {
    match current {
        Some(t) if t > candidate => t,
        _ => candidate,
    }
}
