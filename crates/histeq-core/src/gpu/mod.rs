//! GPU equalization pipeline built on wgpu (WebGPU).
//!
//! Runs the four compute stages (binning, prefix sum, LUT construction,
//! remap) as storage-buffer dispatches on whatever backend wgpu finds:
//! Metal on macOS, Vulkan on Linux/Windows, DX12 on Windows. The CPU
//! implementation in [`crate::cpu`] remains the authoritative reference;
//! every kernel is validated against it.

mod buffers;
mod context;
mod pipeline;
mod profiler;
mod shaders;

pub use buffers::EqualizeBuffers;
pub use context::{GpuContext, GpuError};
pub use pipeline::equalize;

/// Check if GPU acceleration is available on this system.
pub fn is_gpu_available() -> bool {
    GpuContext::is_available()
}

/// Get information about the available GPU device.
pub fn gpu_info() -> Option<String> {
    GpuContext::device_info()
}
