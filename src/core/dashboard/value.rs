use std::sync::Arc;
use std::time::Instant;

use super::payload::MetricPayload;
use crate::error::DashError;

/// Immutable result of one fetch attempt.
///
/// A successful value carries its payload; a failed one carries the error
/// text and no payload (the cache keeps serving the previous payload).
#[derive(Debug, Clone)]
pub struct MetricValue {
    payload: Option<Arc<MetricPayload>>,
    timestamp: Instant,
    error: Option<String>,
}

impl MetricValue {
    pub fn success(payload: MetricPayload, timestamp: Instant) -> Self {
        Self {
            payload: Some(Arc::new(payload)),
            timestamp,
            error: None,
        }
    }

    pub fn failure(error: &DashError, timestamp: Instant) -> Self {
        Self::failure_message(error.to_string(), timestamp)
    }

    pub fn failure_message(message: impl Into<String>, timestamp: Instant) -> Self {
        Self {
            payload: None,
            timestamp,
            error: Some(message.into()),
        }
    }

    pub fn ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn payload(&self) -> Option<&MetricPayload> {
        self.payload.as_deref()
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
