use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::payload::MetricPayload;
use crate::error::Result;

/// Unique key of a registered source, e.g. `"system"` or `"sessions"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl PartialEq<str> for SourceId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SourceId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// One external data retrieval behind a uniform contract.
///
/// Implementations must return within a bounded time (wrapping their own
/// timeouts around subprocesses or network calls) and report problems as
/// `Err`, never by panicking or exiting. They may keep private state behind
/// their own lock; the scheduler never runs two fetches of the same source
/// concurrently.
pub trait DataSource: Send + Sync {
    fn fetch(&self) -> Result<MetricPayload>;
}

impl<F> DataSource for F
where
    F: Fn() -> Result<MetricPayload> + Send + Sync,
{
    fn fetch(&self) -> Result<MetricPayload> {
        self()
    }
}

/// A registered source: identity, fixed refresh interval and adapter.
#[derive(Clone)]
pub struct MetricSource {
    id: SourceId,
    interval: Duration,
    adapter: Arc<dyn DataSource>,
}

impl MetricSource {
    pub fn new(id: impl Into<SourceId>, interval: Duration, adapter: Arc<dyn DataSource>) -> Self {
        Self {
            id: id.into(),
            interval,
            adapter,
        }
    }

    /// Convenience constructor for closures and simple adapters.
    pub fn from_fn<F>(id: impl Into<SourceId>, interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Result<MetricPayload> + Send + Sync + 'static,
    {
        Self::new(id, interval, Arc::new(fetch))
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn fetch(&self) -> Result<MetricPayload> {
        self.adapter.fetch()
    }
}

impl fmt::Debug for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSource")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
