//! Refresh scheduler: decides which sources are due and dispatches their
//! fetches without waiting for them.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;

use super::cache::{SnapshotCache, UpdateOutcome};
use super::source::{MetricSource, SourceId};
use super::value::MetricValue;
use crate::error::{DashError, Result};

/// A fetch ready to run: performs the fetch and writes its result to the cache.
pub type FetchJob = Box<dyn FnOnce() + Send + 'static>;

/// Executes fetch jobs somewhere other than the scheduling loop.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: FetchJob);
}

/// Runs fetches on tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct BlockingDispatcher {
    handle: Handle,
}

impl BlockingDispatcher {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Dispatcher bound to the runtime of the calling task.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Dispatcher for BlockingDispatcher {
    fn dispatch(&self, job: FetchJob) {
        // Detached: the scheduler learns about completion through the cache.
        drop(self.handle.spawn_blocking(job));
    }
}

/// Runs fetches synchronously on the caller's thread.
///
/// Only suitable where blocking the caller is acceptable: one-shot
/// collection and deterministic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: FetchJob) {
        job()
    }
}

/// Sources handled by one call to [`RefreshScheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub dispatched: Vec<SourceId>,
    /// Due, but the previous fetch has not finished.
    pub skipped_in_flight: Vec<SourceId>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.dispatched.is_empty() && self.skipped_in_flight.is_empty()
    }
}

struct ScheduledSource {
    source: MetricSource,
    last_dispatch: Option<Instant>,
    in_flight: Arc<AtomicBool>,
    forced: bool,
}

impl ScheduledSource {
    fn is_due(&self, now: Instant) -> bool {
        self.forced
            || self
                .last_dispatch
                .is_none_or(|last| now.saturating_duration_since(last) >= self.source.interval())
    }
}

/// Clears a source's in-flight flag when the job finishes or is dropped unrun.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-source interval scheduler writing into a shared [`SnapshotCache`].
pub struct RefreshScheduler {
    cache: Arc<SnapshotCache>,
    slots: Vec<ScheduledSource>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl RefreshScheduler {
    /// Register `sources` and create their cache entries in the same order.
    pub fn register(sources: Vec<MetricSource>, dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        let cache = SnapshotCache::new(sources.iter().map(|s| s.id().clone()))?;
        Self::with_cache(sources, Arc::new(cache), dispatcher)
    }

    /// Schedule `sources` against an existing cache, which must hold exactly
    /// these sources.
    pub fn with_cache(
        sources: Vec<MetricSource>,
        cache: Arc<SnapshotCache>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<Self> {
        if cache.len() != sources.len() {
            return Err(DashError::config(format!(
                "cache holds {} sources but {} were registered",
                cache.len(),
                sources.len()
            )));
        }

        let mut slots = Vec::with_capacity(sources.len());
        let mut seen = HashSet::with_capacity(sources.len());
        for source in sources {
            if !seen.insert(source.id().clone()) {
                return Err(DashError::config(format!(
                    "source '{}' registered twice",
                    source.id()
                )));
            }
            if !cache.contains(source.id().as_str()) {
                return Err(DashError::config(format!(
                    "source '{}' has no cache entry",
                    source.id()
                )));
            }
            if source.interval().is_zero() {
                return Err(DashError::config(format!(
                    "source '{}' has a zero refresh interval",
                    source.id()
                )));
            }
            slots.push(ScheduledSource {
                source,
                last_dispatch: None,
                in_flight: Arc::new(AtomicBool::new(false)),
                forced: false,
            });
        }

        Ok(Self {
            cache,
            slots,
            dispatcher,
        })
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn sources(&self) -> impl Iterator<Item = &MetricSource> {
        self.slots.iter().map(|slot| &slot.source)
    }

    pub fn is_in_flight(&self, source_id: &str) -> bool {
        self.slots
            .iter()
            .find(|slot| slot.source.id() == source_id)
            .is_some_and(|slot| slot.in_flight.load(Ordering::Acquire))
    }

    /// Make every source due on the next tick. In-flight sources are still
    /// skipped until their current fetch completes.
    pub fn request_refresh_all(&mut self) {
        for slot in &mut self.slots {
            slot.forced = true;
        }
    }

    /// Dispatch every source that is due at `now` and not still fetching.
    ///
    /// Never waits on a fetch: completion is observed through the cache.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        for slot in &mut self.slots {
            if !slot.is_due(now) {
                continue;
            }

            // Claim the slot; a source that is still fetching sits this cycle out.
            if slot
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                log::debug!("Skipping '{}': previous fetch still running", slot.source.id());
                report.skipped_in_flight.push(slot.source.id().clone());
                continue;
            }

            slot.last_dispatch = Some(now);
            slot.forced = false;
            report.dispatched.push(slot.source.id().clone());

            let guard = InFlightGuard(Arc::clone(&slot.in_flight));
            let source = slot.source.clone();
            let cache = Arc::clone(&self.cache);

            self.dispatcher.dispatch(Box::new(move || {
                let value = run_fetch(&source, now);
                record(&cache, &source, value);
                drop(guard);
            }));
        }

        report
    }
}

fn record(cache: &SnapshotCache, source: &MetricSource, value: MetricValue) -> UpdateOutcome {
    let outcome = cache.update(source.id().as_str(), value);
    if outcome == UpdateOutcome::Outdated {
        log::debug!("Dropped outdated value for '{}'", source.id());
    }
    outcome
}

/// Run one fetch, turning errors and panics into a failed value.
///
/// Successes are stamped when the fetch returns; failures keep the
/// dispatch instant as their attempt time.
fn run_fetch(source: &MetricSource, attempted_at: Instant) -> MetricValue {
    let started = Instant::now();

    match panic::catch_unwind(AssertUnwindSafe(|| source.fetch())) {
        Ok(Ok(payload)) => {
            log::trace!(
                "Fetched '{}' ({}) in {:?}",
                source.id(),
                payload.kind(),
                started.elapsed()
            );
            MetricValue::success(payload, Instant::now())
        }
        Ok(Err(e)) => {
            log::warn!("Fetch for '{}' failed: {}", source.id(), e);
            MetricValue::failure(&e, attempted_at)
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Adapter for '{}' panicked: {}", source.id(), reason);
            MetricValue::failure_message(format!("adapter panicked: {}", reason), attempted_at)
        }
    }
}
