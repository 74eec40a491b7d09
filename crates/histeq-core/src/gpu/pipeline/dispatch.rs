//! Dispatch sizing and the per-stage submit/wait cycle.

use super::{MAX_WORKGROUPS_PER_DIM, WORKGROUP_SIZE};
use crate::gpu::context::{GpuContext, GpuError};
use crate::gpu::profiler::StageProfiler;
use crate::models::Stage;

/// Compute the workgroup grid covering `work_items` invocations.
///
/// Small work sizes fit in one dispatch dimension; larger ones split
/// into a roughly square 2D grid (the shaders flatten it back to a
/// linear index). Fails with `GpuError::Dispatch` when even the 2D
/// grid cannot cover the work.
pub(crate) fn workgroup_grid(work_items: u32) -> Result<(u32, u32), GpuError> {
    let total_workgroups = work_items.div_ceil(WORKGROUP_SIZE);

    if total_workgroups <= MAX_WORKGROUPS_PER_DIM {
        return Ok((total_workgroups.max(1), 1));
    }

    let side = ((total_workgroups as f64).sqrt().ceil() as u32).min(MAX_WORKGROUPS_PER_DIM);
    let rows = total_workgroups.div_ceil(side);

    if rows > MAX_WORKGROUPS_PER_DIM {
        return Err(GpuError::Dispatch(format!(
            "Work size {} requires {} workgroups, max supported is {}",
            work_items,
            total_workgroups,
            MAX_WORKGROUPS_PER_DIM as u64 * MAX_WORKGROUPS_PER_DIM as u64
        )));
    }

    Ok((side, rows))
}

/// Encode, submit, and wait out one pipeline stage.
///
/// The blocking wait is the stage barrier: the caller never encodes
/// the next stage until the previous stage's output buffer is fully
/// written. The profiler records queue/submit/completion marks and
/// hooks the pass's device timestamps.
pub(crate) fn run_stage(
    ctx: &GpuContext,
    profiler: &mut StageProfiler,
    stage: Stage,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    work_items: u32,
) -> Result<(), GpuError> {
    let stage_index = profiler.begin_stage(stage);
    let (workgroups_x, workgroups_y) = workgroup_grid(work_items)?;

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(stage.kernel_name()),
        });

    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(stage.kernel_name()),
            timestamp_writes: profiler.timestamp_writes(stage_index),
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
    }

    profiler.mark_submitted(stage_index);
    ctx.submit_and_wait(encoder);
    profiler.mark_completed(stage_index);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_small_work_sizes() {
        // A single bin still needs one workgroup.
        assert_eq!(workgroup_grid(1).unwrap(), (1, 1));
        assert_eq!(workgroup_grid(256).unwrap(), (1, 1));
        assert_eq!(workgroup_grid(257).unwrap(), (2, 1));
    }

    #[test]
    fn test_grid_covers_work_items() {
        for work_items in [1u32, 255, 256, 1000, 1 << 20, 100_000_000] {
            let (x, y) = workgroup_grid(work_items).unwrap();
            let covered = x as u64 * y as u64 * WORKGROUP_SIZE as u64;
            assert!(
                covered >= work_items as u64,
                "{} workitems not covered by {}x{} grid",
                work_items,
                x,
                y
            );
            assert!(x <= MAX_WORKGROUPS_PER_DIM && y <= MAX_WORKGROUPS_PER_DIM);
        }
    }

    #[test]
    fn test_grid_splits_into_two_dimensions() {
        // More workgroups than one dimension can hold.
        let work_items = (MAX_WORKGROUPS_PER_DIM + 1) * WORKGROUP_SIZE;
        let (x, y) = workgroup_grid(work_items).unwrap();
        assert!(y > 1);
        assert!(x as u64 * y as u64 * WORKGROUP_SIZE as u64 >= work_items as u64);
    }
}
