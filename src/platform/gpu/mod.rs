//! GPU-specific platform code.
//!
//! Provides GPU metrics collection for supported vendors. NVIDIA is read
//! through NVML when the `nvml` feature is enabled.

mod nvidia;

pub use nvidia::NvidiaGpuProvider;

use crate::core::dashboard::GpuStats;
use crate::error::{DashError, Result};

/// Vendor-specific GPU reader.
pub trait GpuProvider: Send {
    fn name(&self) -> &'static str;

    /// Collect current utilization and memory figures
    fn collect(&mut self) -> Result<GpuStats>;
}

/// Attempt to get an available GPU provider
///
/// Returns error if no GPU is available.
pub fn get_gpu_provider() -> Result<Box<dyn GpuProvider>> {
    if let Ok(provider) = NvidiaGpuProvider::new() {
        return Ok(Box::new(provider));
    }

    Err(DashError::gpu_not_available("No supported GPU found"))
}
