//! Compute pipeline creation for the four equalization stages.

use super::GpuError;
use crate::gpu::shaders::Shaders;

/// Pre-compiled compute pipelines for the equalization stages.
pub struct GpuPipelines {
    /// Stage 1: per-sample binning with atomic accumulation
    pub hist: wgpu::ComputePipeline,
    /// Stage 2: inclusive prefix sum of the histogram
    pub cumu_hist: wgpu::ComputePipeline,
    /// Stage 3: lookup table construction
    pub lut: wgpu::ComputePipeline,
    /// Stage 4: per-sample remap through the LUT
    pub e_output: wgpu::ComputePipeline,

    // Cached bind group layouts
    /// Layout for stages 1-3: read-only source + read-write destination + params
    pub stage_layout: wgpu::BindGroupLayout,
    /// Layout for stage 4: input + LUT (both read-only) + output + params
    pub remap_layout: wgpu::BindGroupLayout,
}

/// Create all compute pipelines from shader sources.
pub fn create_pipelines(device: &wgpu::Device) -> Result<GpuPipelines, GpuError> {
    // Load shader modules. Each compiles inside a validation error
    // scope so a broken shader surfaces its full diagnostic log instead
    // of a later pipeline-creation panic.
    let histogram_module = compile_shader(device, "histogram", Shaders::HISTOGRAM)?;
    let scan_module = compile_shader(device, "scan", Shaders::SCAN)?;
    let lut_module = compile_shader(device, "lut", Shaders::LUT)?;
    let remap_module = compile_shader(device, "remap", Shaders::REMAP)?;

    // Create pipeline layouts
    let stage_layout = create_stage_layout(device);
    let stage_pipeline_layout = create_pipeline_layout(device, "stage", &stage_layout);

    let remap_layout = create_remap_layout(device);
    let remap_pipeline_layout = create_pipeline_layout(device, "remap", &remap_layout);

    // Create the stage pipelines; entry point names follow the kernel
    // contract (hist / cumu_hist / LUT / e_output).
    let hist = create_compute_pipeline(
        device,
        "hist",
        &stage_pipeline_layout,
        &histogram_module,
        "hist",
    );

    let cumu_hist = create_compute_pipeline(
        device,
        "cumu_hist",
        &stage_pipeline_layout,
        &scan_module,
        "cumu_hist",
    );

    let lut = create_compute_pipeline(device, "lut", &stage_pipeline_layout, &lut_module, "LUT");

    let e_output = create_compute_pipeline(
        device,
        "e_output",
        &remap_pipeline_layout,
        &remap_module,
        "e_output",
    );

    Ok(GpuPipelines {
        hist,
        cumu_hist,
        lut,
        e_output,
        stage_layout,
        remap_layout,
    })
}

/// Compile a WGSL module, converting validation errors into
/// `GpuError::ShaderCompilation` with the driver's diagnostic log.
fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(GpuError::ShaderCompilation(format!("{}: {}", label, error)));
    }

    Ok(module)
}

/// Create a compute pipeline with the given parameters.
fn create_compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Bind group layout shared by the histogram, prefix-sum, and LUT
/// stages: one read-only storage source, one read-write storage
/// destination, and the stage parameter uniform.
fn create_stage_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("stage_layout"),
        entries: &[
            // Source buffer (read-only)
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Destination buffer (read-write; atomic for the histogram stage)
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Stage parameters (uniform)
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

/// Bind group layout for the remap stage: input samples and LUT are
/// read-only, output samples read-write, plus the parameter uniform.
fn create_remap_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("remap_layout"),
        entries: &[
            // Input samples (read-only)
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Lookup table (read-only)
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Output samples (read-write)
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Stage parameters (uniform)
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

/// Create a single-group pipeline layout.
fn create_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    })
}
