#[cfg(feature = "nvml")]
use nvml_wrapper::{Device, Nvml};

use super::GpuProvider;
use crate::core::dashboard::GpuStats;
use crate::error::{DashError, Result};

/// NVIDIA GPU provider using NVML
pub struct NvidiaGpuProvider {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    #[cfg_attr(not(feature = "nvml"), allow(dead_code))]
    device_index: u32,
}

impl NvidiaGpuProvider {
    /// Initializes NVML and selects the first GPU.
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    /// Create provider for a specific GPU index
    pub fn with_device_index(index: u32) -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init()
                .map_err(|e| DashError::gpu_not_available(format!("Failed to init NVML: {}", e)))?;

            // Verify device exists
            let _ = nvml.device_by_index(index).map_err(|e| {
                DashError::gpu_not_available(format!("GPU {} not found: {}", index, e))
            })?;

            Ok(Self {
                nvml,
                device_index: index,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = index;
            Err(DashError::gpu_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    #[cfg(feature = "nvml")]
    fn get_device(&self) -> Result<Device<'_>> {
        self.nvml
            .device_by_index(self.device_index)
            .map_err(|e| DashError::metric_collection(format!("Failed to get GPU device: {}", e)))
    }
}

impl GpuProvider for NvidiaGpuProvider {
    fn name(&self) -> &'static str {
        "nvidia"
    }

    fn collect(&mut self) -> Result<GpuStats> {
        #[cfg(feature = "nvml")]
        {
            let device = self.get_device()?;

            let name = device
                .name()
                .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string());

            let utilization = device.utilization_rates().map(|u| u.gpu).map_err(|e| {
                DashError::metric_collection(format!("Failed to get utilization: {}", e))
            })?;

            let memory_info = device.memory_info().map_err(|e| {
                DashError::metric_collection(format!("Failed to get memory info: {}", e))
            })?;

            let memory_percent = if memory_info.total > 0 {
                (memory_info.used as f32 / memory_info.total as f32) * 100.0
            } else {
                0.0
            };

            Ok(GpuStats {
                name,
                utilization_percent: utilization,
                memory_used_bytes: memory_info.used,
                memory_total_bytes: memory_info.total,
                memory_percent,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(DashError::gpu_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}
