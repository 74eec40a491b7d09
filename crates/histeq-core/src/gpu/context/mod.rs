//! GPU context management for wgpu device, queue, and compute pipelines.

mod init;
mod pipelines;

use std::sync::Arc;

use crate::models::DeviceSelection;

pub use pipelines::GpuPipelines;

/// Errors that can occur during GPU operations.
#[derive(Debug, Clone)]
pub enum GpuError {
    /// No suitable GPU adapter found
    NoAdapter,
    /// Requested adapter index does not exist
    DeviceSelection { index: usize, available: usize },
    /// Failed to request GPU device
    DeviceRequest(String),
    /// Shader compilation failed; carries the full diagnostic log
    ShaderCompilation(String),
    /// Buffer allocation or readback failed
    Buffer(String),
    /// Dispatch could not be sized or bound
    Dispatch(String),
    /// GPU execution failed
    Execution(String),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No suitable GPU adapter found"),
            GpuError::DeviceSelection { index, available } => write!(
                f,
                "Adapter index {} out of range: {} adapter(s) available",
                index, available
            ),
            GpuError::DeviceRequest(e) => write!(f, "Failed to request GPU device: {}", e),
            GpuError::ShaderCompilation(e) => write!(f, "Shader compilation failed: {}", e),
            GpuError::Buffer(e) => write!(f, "Buffer operation failed: {}", e),
            GpuError::Dispatch(e) => write!(f, "Dispatch failed: {}", e),
            GpuError::Execution(e) => write!(f, "GPU execution failed: {}", e),
        }
    }
}

impl std::error::Error for GpuError {}

/// GPU context holding the wgpu device, queue, and pre-compiled pipelines.
///
/// Creating a context selects an adapter, requests a device with a
/// serial command queue, and compiles all four stage kernels up front.
/// A shader compilation failure is fatal: no context is returned and no
/// stage ever runs.
pub struct GpuContext {
    pub(crate) device: Arc<wgpu::Device>,
    pub(crate) queue: Arc<wgpu::Queue>,
    pub(crate) pipelines: GpuPipelines,
    adapter_info: wgpu::AdapterInfo,
    /// Whether the device was created with TIMESTAMP_QUERY; controls
    /// whether stage timings come from device queries or the host clock.
    pub(crate) timestamps_enabled: bool,
}

impl GpuContext {
    /// Check if GPU acceleration is available without fully initializing.
    pub fn is_available() -> bool {
        init::is_available()
    }

    /// Get information about the available GPU device.
    pub fn device_info() -> Option<String> {
        init::device_info()
    }

    /// Create a new GPU context, initializing the device and compiling all shaders.
    pub fn new(selection: DeviceSelection) -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async(selection))
    }

    /// Async version of context creation.
    pub async fn new_async(selection: DeviceSelection) -> Result<Self, GpuError> {
        let (device, queue, adapter_info, timestamps_enabled) =
            init::initialize_device(selection).await?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        // Compile all shaders and create pipelines
        let pipelines = pipelines::create_pipelines(&device)?;

        Ok(Self {
            device,
            queue,
            pipelines,
            adapter_info,
            timestamps_enabled,
        })
    }

    /// Get the adapter info for this context.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Submit a command encoder and block until the device has finished it.
    ///
    /// This is the inter-stage barrier: stage N+1 is never submitted
    /// before this returns for stage N.
    pub fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }
}
