use parking_lot::Mutex;

use crate::core::dashboard::{DataSource, MetricPayload};
use crate::error::Result;
use crate::platform::{get_gpu_provider, GpuProvider};

/// Fetches between detection attempts once no GPU was found.
pub const DETECT_RETRY_FETCHES: u32 = 30;

type Detector = Box<dyn Fn() -> Result<Box<dyn GpuProvider>> + Send + Sync>;

enum Detection {
    Pending,
    Absent { skipped: u32 },
    Ready(Box<dyn GpuProvider>),
}

/// GPU utilization and memory. Detection runs on the first fetch, off the
/// scheduling loop, and a machine without a supported GPU reports `None`.
/// Failed detection is retried every [`DETECT_RETRY_FETCHES`] fetches, so a
/// driver that loads late is still picked up.
pub struct GpuSource {
    state: Mutex<Detection>,
    detect: Detector,
}

impl GpuSource {
    pub fn new() -> Self {
        Self::with_detector(get_gpu_provider)
    }

    pub fn with_detector<F>(detect: F) -> Self
    where
        F: Fn() -> Result<Box<dyn GpuProvider>> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(Detection::Pending),
            detect: Box::new(detect),
        }
    }

    pub fn with_provider(provider: Box<dyn GpuProvider>) -> Self {
        Self {
            state: Mutex::new(Detection::Ready(provider)),
            detect: Box::new(get_gpu_provider),
        }
    }

    pub fn absent() -> Self {
        Self {
            state: Mutex::new(Detection::Absent { skipped: 0 }),
            detect: Box::new(get_gpu_provider),
        }
    }
}

impl Default for GpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for GpuSource {
    fn fetch(&self) -> Result<MetricPayload> {
        let mut state = self.state.lock();

        if let Detection::Absent { skipped } = &mut *state {
            *skipped += 1;
            if *skipped >= DETECT_RETRY_FETCHES {
                *state = Detection::Pending;
            }
        }

        if matches!(*state, Detection::Pending) {
            *state = match (self.detect)() {
                Ok(provider) => {
                    log::info!("GPU provider: {}", provider.name());
                    Detection::Ready(provider)
                }
                Err(e) => {
                    log::info!("GPU metrics unavailable: {}", e);
                    Detection::Absent { skipped: 0 }
                }
            };
        }

        match &mut *state {
            Detection::Ready(provider) => provider.collect().map(|stats| MetricPayload::Gpu(Some(stats))),
            _ => Ok(MetricPayload::Gpu(None)),
        }
    }
}
