//! Histeq Core Library
//!
//! GPU-parallel histogram equalization for 8-bit raster images: bin the
//! input samples into an intensity histogram, derive the cumulative
//! histogram, build a lookup table, and remap every sample to produce a
//! contrast-enhanced output image, with per-stage execution timing.

pub mod cpu;
pub mod gpu;
pub mod models;

// Re-export commonly used types
pub use models::{
    BinConfig, DeviceSelection, EqualizeResult, ImageData, Stage, StageTiming, TimingReport,
};

// Re-export GPU entry points
pub use gpu::{equalize, gpu_info, is_gpu_available, GpuContext, GpuError};
