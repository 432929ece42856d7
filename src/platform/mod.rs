// Platform-specific code module

pub mod gpu;

pub use gpu::{get_gpu_provider, GpuProvider};
