//! Tokio runtime that drives the refresh scheduler in the background.
//!
//! The render loop stays on the main thread and only reads the shared
//! [`SnapshotCache`]; this runtime owns the scheduling task and the blocking
//! pool the fetches run on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};

use super::cache::SnapshotCache;
use super::scheduler::{BlockingDispatcher, InlineDispatcher, RefreshScheduler};
use super::source::MetricSource;
use crate::error::Result;

/// How often the scheduling loop checks for due sources.
pub const DEFAULT_SCHEDULER_TICK: Duration = Duration::from_millis(250);

/// Requests from the UI to the scheduling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    RefreshAll,
}

/// Background scheduler plus the cache it fills.
pub struct DashboardRuntime {
    cache: Arc<SnapshotCache>,
    control_tx: mpsc::Sender<Control>,
    shutdown_tx: broadcast::Sender<()>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl DashboardRuntime {
    /// Register `sources` and start scheduling them immediately.
    pub fn start(sources: Vec<MetricSource>, scheduler_tick: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("metrics-worker")
            .build()?;

        let dispatcher = Arc::new(BlockingDispatcher::new(runtime.handle().clone()));
        let scheduler = RefreshScheduler::register(sources, dispatcher)?;
        let cache = Arc::clone(scheduler.cache());

        let (control_tx, control_rx) = mpsc::channel::<Control>(8);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        runtime.spawn(scheduler_task(
            scheduler,
            scheduler_tick,
            control_rx,
            shutdown_tx.subscribe(),
        ));

        log::info!("Dashboard runtime started ({} sources)", cache.len());

        Ok(Self {
            cache,
            control_tx,
            shutdown_tx,
            runtime: Some(runtime),
        })
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Ask for every source to be fetched as soon as possible.
    pub fn request_refresh(&self) {
        if let Err(e) = self.control_tx.try_send(Control::RefreshAll) {
            log::debug!("Refresh request dropped: {}", e);
        }
    }

    /// Stop scheduling and abandon in-flight fetches without waiting for them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            log::info!("Dashboard runtime stopped");
        }
    }
}

impl Drop for DashboardRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn scheduler_task(
    mut scheduler: RefreshScheduler,
    scheduler_tick: Duration,
    mut control_rx: mpsc::Receiver<Control>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(scheduler_tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = scheduler.tick(Instant::now());
                if !report.is_idle() {
                    log::trace!(
                        "Dispatched {:?}, skipped {:?}",
                        report.dispatched,
                        report.skipped_in_flight
                    );
                }
            }
            Some(control) = control_rx.recv() => match control {
                Control::RefreshAll => {
                    log::debug!("Refreshing all sources");
                    scheduler.request_refresh_all();
                    scheduler.tick(Instant::now());
                }
            },
            _ = shutdown.recv() => {
                log::debug!("Scheduler task shutting down");
                break;
            }
        }
    }
}

/// Fetch every source once on the calling thread and return the filled cache.
pub fn collect_once(sources: Vec<MetricSource>) -> Result<Arc<SnapshotCache>> {
    let mut scheduler = RefreshScheduler::register(sources, Arc::new(InlineDispatcher))?;
    scheduler.tick(Instant::now());
    Ok(Arc::clone(scheduler.cache()))
}
