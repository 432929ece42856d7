//! Metric caching and refresh scheduling for the dashboard.
//!
//! Sources are polled on independent intervals by a [`RefreshScheduler`];
//! results land in a [`SnapshotCache`] that the UI reads on every frame
//! without ever waiting on a fetch.

mod cache;
pub mod history;
mod payload;
pub mod registry;
pub mod runtime;
mod scheduler;
mod source;
pub mod sources;
mod value;

pub use cache::{CacheEntry, EntryState, SnapshotCache, UpdateOutcome};
pub use history::History;
pub use payload::{
    CostSummary, CronJob, FeedMessage, GatewayStatus, GpuStats, MetricPayload, ModelUsage,
    NetworkStats, ProcessInfo, Role, SessionInfo, SystemHealth, UsageWindow,
};
pub use registry::default_sources;
pub use runtime::{collect_once, DashboardRuntime, DEFAULT_SCHEDULER_TICK};
pub use scheduler::{
    BlockingDispatcher, Dispatcher, FetchJob, InlineDispatcher, RefreshScheduler, TickReport,
};
pub use source::{DataSource, MetricSource, SourceId};
pub use value::MetricValue;
