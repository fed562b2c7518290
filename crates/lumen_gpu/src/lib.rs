//! GPU offload for lumen.
//!
//! Runs the stochastic path tracer as a wgpu compute kernel. The kernel
//! advances every path one bounce per dispatch, so recursion on the host
//! becomes a fixed number of passes on the device.

mod backend;
mod context;
mod error;
mod kernel;
mod marshal;

pub use backend::{batch_capacity, check_support, GpuBackend};
pub use context::GpuContext;
pub use error::GpuError;
pub use kernel::{TraceKernel, TRACE_SHADER, WORKGROUP_SIZE};
pub use marshal::{pack_scene, GpuMaterial, GpuSurface, Params, PathState};
