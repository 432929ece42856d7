use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for clawtop
#[derive(Error, Debug)]
pub enum DashError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fatal at startup: paths or intervals could not be resolved.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single data source failed; recorded in the cache, never fatal.
    #[error("Source fetch failed: {0}")]
    SourceFetch(String),

    #[error("Timed out after {}s: {what}", .after.as_secs_f32())]
    Timeout { what: String, after: Duration },

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),

    #[error("Metric collection failed: {0}")]
    MetricCollection(String),

    #[error("TUI error: {0}")]
    Tui(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for clawtop
pub type Result<T> = std::result::Result<T, DashError>;

impl DashError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DashError::Config(msg.into())
    }

    pub fn source_fetch<S: Into<String>>(msg: S) -> Self {
        DashError::SourceFetch(msg.into())
    }

    pub fn timeout<S: Into<String>>(what: S, after: Duration) -> Self {
        DashError::Timeout {
            what: what.into(),
            after,
        }
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        DashError::GpuNotAvailable(msg.into())
    }

    pub fn metric_collection<S: Into<String>>(msg: S) -> Self {
        DashError::MetricCollection(msg.into())
    }

    pub fn tui<S: Into<String>>(msg: S) -> Self {
        DashError::Tui(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DashError::Other(msg.into())
    }

    /// Whether this error must abort startup rather than degrade a panel.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DashError::Config(_))
    }
}
