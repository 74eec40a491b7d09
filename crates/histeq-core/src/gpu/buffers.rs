//! GPU buffer management for the equalization pipeline.
//!
//! Samples travel as one `u32` per 8-bit sample: WGSL has no 8-bit
//! storage type, so the host widens on upload and narrows on readback.

use bytemuck::{Pod, Zeroable};
use std::sync::Arc;
use wgpu::{self, util::DeviceExt};

use super::context::{GpuContext, GpuError};
use crate::models::{BinConfig, ImageData};

/// Stage parameters for the uniform buffer.
/// Must match the WGSL `Params` struct layout exactly.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct StageParams {
    pub bin_width: f32,
    pub bin_count: u32,
    pub sample_count: u32,
    pub _padding: u32,
}

/// The device-resident buffer set for one pipeline run.
///
/// Exclusively owned by the run: buffers are never reused across runs
/// or shared between concurrent runs. Dropping the set releases the
/// device memory.
pub struct EqualizeBuffers {
    /// Input image samples (read-only to kernels)
    pub(crate) input: wgpu::Buffer,
    /// Per-bin counters, written by `hist`
    pub(crate) histogram: wgpu::Buffer,
    /// Inclusive prefix sums, written by `cumu_hist`
    pub(crate) cumulative: wgpu::Buffer,
    /// Lookup table, written by `LUT`
    pub(crate) lut: wgpu::Buffer,
    /// Output image samples, written by `e_output`
    pub(crate) output: wgpu::Buffer,
    /// Stage parameter uniform shared by all four kernels
    pub(crate) params: wgpu::Buffer,

    sample_count: u32,
    bin_count: u32,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl EqualizeBuffers {
    /// Allocate and initialize all device buffers for one run.
    ///
    /// Fails with `GpuError::Buffer` when the image is empty or a
    /// buffer would exceed the device's storage binding limit.
    pub fn allocate(
        ctx: &GpuContext,
        image: &ImageData,
        bins: BinConfig,
    ) -> Result<Self, GpuError> {
        let sample_count = image.sample_count();
        if sample_count == 0 {
            return Err(GpuError::Buffer(
                "Cannot allocate buffers for an empty image".to_string(),
            ));
        }

        let image_bytes = sample_count as u64 * std::mem::size_of::<u32>() as u64;
        let max_binding = ctx.device.limits().max_storage_buffer_binding_size as u64;
        if image_bytes > max_binding {
            return Err(GpuError::Buffer(format!(
                "Image buffer of {} bytes exceeds device limit of {} bytes",
                image_bytes, max_binding
            )));
        }

        // Widen samples to u32 for storage-buffer access.
        let widened: Vec<u32> = image.samples.iter().map(|&s| s as u32).collect();
        let input = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("input_samples"),
                contents: bytemuck::cast_slice(&widened),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let bin_count = bins.bin_count();
        let hist_bytes = bin_count as u64 * std::mem::size_of::<u32>() as u64;

        let histogram = create_storage_buffer(&ctx.device, "histogram", hist_bytes);
        let cumulative = create_storage_buffer(&ctx.device, "cumulative_histogram", hist_bytes);
        let lut = create_storage_buffer(&ctx.device, "lut", hist_bytes);

        let output = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output_samples"),
            size: image_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params_data = StageParams {
            bin_width: bins.bin_width(),
            bin_count,
            sample_count,
            _padding: 0,
        };
        let params = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("stage_params"),
                contents: bytemuck::bytes_of(&params_data),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        Ok(Self {
            input,
            histogram,
            cumulative,
            lut,
            output,
            params,
            sample_count,
            bin_count,
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
        })
    }

    /// Zero-fill the histogram-family buffers.
    ///
    /// The binning stage accumulates with atomic increments, so its
    /// counters must start at zero before any dispatch runs.
    pub fn zero_fill(&self, ctx: &GpuContext) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("zero_fill_encoder"),
            });

        encoder.clear_buffer(&self.histogram, 0, None);
        encoder.clear_buffer(&self.cumulative, 0, None);
        encoder.clear_buffer(&self.lut, 0, None);

        ctx.submit_and_wait(encoder);
    }

    /// Number of samples the input/output buffers hold.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Number of bins the histogram-family buffers hold.
    pub fn bin_count(&self) -> u32 {
        self.bin_count
    }

    /// Download the histogram to the host.
    pub fn download_histogram(&self) -> Result<Vec<u32>, GpuError> {
        self.read_u32_buffer(&self.histogram, self.bin_count as usize)
    }

    /// Download the cumulative histogram to the host.
    pub fn download_cumulative(&self) -> Result<Vec<u32>, GpuError> {
        self.read_u32_buffer(&self.cumulative, self.bin_count as usize)
    }

    /// Download the lookup table to the host.
    pub fn download_lut(&self) -> Result<Vec<u32>, GpuError> {
        self.read_u32_buffer(&self.lut, self.bin_count as usize)
    }

    /// Download the output image, narrowing samples back to `u8`.
    pub fn download_output(&self) -> Result<Vec<u8>, GpuError> {
        let widened = self.read_u32_buffer(&self.output, self.sample_count as usize)?;
        Ok(widened.into_iter().map(|s| s as u8).collect())
    }

    /// Copy a storage buffer into a staging buffer, map it, and read
    /// `len` u32 values back to the host. Blocks until the copy and
    /// map have completed.
    fn read_u32_buffer(&self, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<u32>, GpuError> {
        let size = (len * std::mem::size_of::<u32>()) as u64;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });

        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();

        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // Ignore send error - if receiver is dropped, the recv() call will fail appropriately
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| GpuError::Buffer(e.to_string()))?
            .map_err(|e| GpuError::Buffer(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let result: Vec<u32> = bytemuck::cast_slice(&data).to_vec();

        drop(data);
        staging.unmap();

        Ok(result)
    }
}

fn create_storage_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
