use lumen_renderer::SamplingStrategy;
use thiserror::Error;

/// Errors from GPU offload. All of them end the render.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Kernel failed to build:\n{log}")]
    KernelBuild { log: String },

    #[error("{0} sampling is not supported on the GPU")]
    UnsupportedSampling(SamplingStrategy),

    #[error("Device validation failed: {0}")]
    Validation(String),

    #[error("Failed to read back results: {0}")]
    Readback(String),
}
