//! Device and adapter initialization for GPU context.

use super::GpuError;
use crate::models::DeviceSelection;

/// Check if GPU acceleration is available without fully initializing.
pub fn is_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    pollster::block_on(async {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .is_some()
    })
}

/// Get information about the available GPU device.
pub fn device_info() -> Option<String> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    pollster::block_on(async {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map(|adapter| {
                let info = adapter.get_info();
                format!("{} ({:?}, {:?})", info.name, info.device_type, info.backend)
            })
    })
}

/// Initialize the wgpu device and queue.
///
/// Returns the device, queue, adapter info, and whether timestamp
/// queries were enabled on the device.
pub async fn initialize_device(
    selection: DeviceSelection,
) -> Result<(wgpu::Device, wgpu::Queue, wgpu::AdapterInfo, bool), GpuError> {
    // Create wgpu instance with all backends
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = match selection {
        DeviceSelection::Auto => instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?,
        DeviceSelection::Index(index) => {
            // Honor an explicit adapter index; out-of-range indices fail
            // before any device work happens.
            let adapters: Vec<wgpu::Adapter> = instance.enumerate_adapters(wgpu::Backends::all());
            let available = adapters.len();
            adapters
                .into_iter()
                .nth(index)
                .ok_or(GpuError::DeviceSelection { index, available })?
        }
    };

    let adapter_info = adapter.get_info();
    let adapter_limits = adapter.limits();

    // Timestamp queries give device-side stage timings; not every
    // adapter supports them, so stage timing falls back to the host
    // clock when absent.
    let timestamps_supported = adapter
        .features()
        .contains(wgpu::Features::TIMESTAMP_QUERY);
    let required_features = if timestamps_supported {
        wgpu::Features::TIMESTAMP_QUERY
    } else {
        wgpu::Features::empty()
    };

    // Request higher buffer limits for large images
    let limits = wgpu::Limits {
        max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
        max_buffer_size: adapter_limits.max_buffer_size,
        ..Default::default()
    };

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("histeq-gpu"),
                required_features,
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )
        .await
        .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

    Ok((device, queue, adapter_info, timestamps_supported))
}
