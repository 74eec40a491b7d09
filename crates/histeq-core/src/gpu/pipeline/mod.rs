//! Pipeline orchestration: the four equalization stages in dispatch order.

mod dispatch;

use super::buffers::EqualizeBuffers;
use super::context::{GpuContext, GpuError};
use super::profiler::StageProfiler;
use crate::models::{BinConfig, EqualizeResult, ImageData, Stage};

/// Workgroup size for compute shaders
pub(crate) const WORKGROUP_SIZE: u32 = 256;

/// Maximum workgroups per dimension (GPU limit)
pub(crate) const MAX_WORKGROUPS_PER_DIM: u32 = 65535;

/// Run the full equalization pipeline on the GPU.
///
/// Stages run strictly in order with a blocking wait between them:
/// binning reads the input and fills the histogram, the prefix sum
/// reads the histogram, LUT construction reads the cumulative
/// histogram, and the remap reads the input and the LUT. Any failure
/// aborts the run with no partial result; buffers are freshly
/// allocated per run and released when this function returns.
pub fn equalize(
    ctx: &GpuContext,
    image: &ImageData,
    bins: BinConfig,
) -> Result<EqualizeResult, GpuError> {
    let buffers = EqualizeBuffers::allocate(ctx, image, bins)?;
    buffers.zero_fill(ctx);

    let mut profiler = StageProfiler::new(ctx);

    // Stage 1: hist(input, histogram, bin_width)
    let hist_group = stage_bind_group(
        ctx,
        "hist_bind_group",
        &buffers.input,
        &buffers.histogram,
        &buffers.params,
    );
    dispatch::run_stage(
        ctx,
        &mut profiler,
        Stage::Histogram,
        &ctx.pipelines.hist,
        &hist_group,
        buffers.sample_count(),
    )?;

    // Stage 2: cumu_hist(histogram, cumulative) — work size is the bin
    // count, not the histogram's byte size.
    let scan_group = stage_bind_group(
        ctx,
        "cumu_hist_bind_group",
        &buffers.histogram,
        &buffers.cumulative,
        &buffers.params,
    );
    dispatch::run_stage(
        ctx,
        &mut profiler,
        Stage::CumulativeHistogram,
        &ctx.pipelines.cumu_hist,
        &scan_group,
        buffers.bin_count(),
    )?;

    // Stage 3: LUT(cumulative, lut, bin_width)
    let lut_group = stage_bind_group(
        ctx,
        "lut_bind_group",
        &buffers.cumulative,
        &buffers.lut,
        &buffers.params,
    );
    dispatch::run_stage(
        ctx,
        &mut profiler,
        Stage::Lut,
        &ctx.pipelines.lut,
        &lut_group,
        buffers.bin_count(),
    )?;

    // Stage 4: e_output(input, lut, output, bin_width)
    let remap_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("e_output_bind_group"),
        layout: &ctx.pipelines.remap_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffers.input.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: buffers.lut.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffers.output.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: buffers.params.as_entire_binding(),
            },
        ],
    });
    dispatch::run_stage(
        ctx,
        &mut profiler,
        Stage::Remap,
        &ctx.pipelines.e_output,
        &remap_group,
        buffers.sample_count(),
    )?;

    let timing = profiler.finish(ctx)?;

    // Collect results back to host memory.
    let histogram = buffers.download_histogram()?;
    let cumulative = buffers.download_cumulative()?;
    let lut = buffers.download_lut()?;
    let samples = buffers.download_output()?;

    let output = ImageData {
        width: image.width,
        height: image.height,
        depth: image.depth,
        channels: image.channels,
        samples,
    };

    Ok(EqualizeResult {
        histogram,
        cumulative,
        lut,
        output,
        timing,
    })
}

/// Bind group for the shared three-binding stage layout
/// (source, destination, params).
fn stage_bind_group(
    ctx: &GpuContext,
    label: &'static str,
    source: &wgpu::Buffer,
    destination: &wgpu::Buffer,
    params: &wgpu::Buffer,
) -> wgpu::BindGroup {
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &ctx.pipelines.stage_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: source.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: destination.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
    })
}
