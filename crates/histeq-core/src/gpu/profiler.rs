//! Per-stage execution timing.
//!
//! Each stage's compute pass writes a begin/end timestamp pair into a
//! shared query set when the device supports `TIMESTAMP_QUERY`. After
//! the final stage the queries are resolved, read back, scaled by the
//! queue's timestamp period, and re-based onto the host clock offsets
//! so every value in the report shares one origin (the start of the
//! run). Without timestamp support, stage start/end fall back to the
//! host wall clock around the blocking submit.
//!
//! Profiling is read-only: it never changes what the pipeline computes.

use std::time::Instant;

use super::context::{GpuContext, GpuError};
use crate::models::{Stage, StageTiming, TimingReport};

/// Begin and end timestamps per stage.
const QUERIES_PER_STAGE: u32 = 2;

struct StageRecord {
    stage: Stage,
    queued_ns: u64,
    submitted_ns: u64,
    completed_ns: u64,
}

/// Collects host-clock marks and device timestamps across a run.
pub(crate) struct StageProfiler {
    query_set: Option<wgpu::QuerySet>,
    run_start: Instant,
    records: Vec<StageRecord>,
}

impl StageProfiler {
    pub(crate) fn new(ctx: &GpuContext) -> Self {
        let query_set = if ctx.timestamps_enabled {
            Some(ctx.device.create_query_set(&wgpu::QuerySetDescriptor {
                label: Some("stage_timestamps"),
                ty: wgpu::QueryType::Timestamp,
                count: QUERIES_PER_STAGE * Stage::ALL.len() as u32,
            }))
        } else {
            None
        };

        Self {
            query_set,
            run_start: Instant::now(),
            records: Vec::with_capacity(Stage::ALL.len()),
        }
    }

    fn elapsed_ns(&self) -> u64 {
        self.run_start.elapsed().as_nanos() as u64
    }

    /// Record that a stage's dispatch is being encoded. Returns the
    /// stage index used for the other marks and the timestamp queries.
    pub(crate) fn begin_stage(&mut self, stage: Stage) -> usize {
        let queued_ns = self.elapsed_ns();
        self.records.push(StageRecord {
            stage,
            queued_ns,
            submitted_ns: queued_ns,
            completed_ns: queued_ns,
        });
        self.records.len() - 1
    }

    /// Timestamp writes for the stage's compute pass, when supported.
    pub(crate) fn timestamp_writes(
        &self,
        stage_index: usize,
    ) -> Option<wgpu::ComputePassTimestampWrites<'_>> {
        self.query_set
            .as_ref()
            .map(|query_set| wgpu::ComputePassTimestampWrites {
                query_set,
                beginning_of_pass_write_index: Some(stage_index as u32 * QUERIES_PER_STAGE),
                end_of_pass_write_index: Some(stage_index as u32 * QUERIES_PER_STAGE + 1),
            })
    }

    /// Record that the stage's command buffer is about to be submitted.
    pub(crate) fn mark_submitted(&mut self, stage_index: usize) {
        self.records[stage_index].submitted_ns = self.elapsed_ns();
    }

    /// Record that the host observed the stage's completion.
    pub(crate) fn mark_completed(&mut self, stage_index: usize) {
        self.records[stage_index].completed_ns = self.elapsed_ns();
    }

    /// Resolve the device timestamps and build the timing report.
    pub(crate) fn finish(self, ctx: &GpuContext) -> Result<TimingReport, GpuError> {
        let device_spans = match &self.query_set {
            Some(query_set) => Some(self.resolve_timestamps(ctx, query_set)?),
            None => None,
        };

        let stages = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let (started_ns, ended_ns) = match &device_spans {
                    Some(spans) => spans[i],
                    // Host fallback: the dispatch ran somewhere between
                    // submit and the blocking poll returning.
                    None => (record.submitted_ns, record.completed_ns),
                };
                StageTiming {
                    stage: record.stage,
                    queued_ns: record.queued_ns,
                    submitted_ns: record.submitted_ns,
                    started_ns,
                    ended_ns,
                }
            })
            .collect();

        Ok(TimingReport { stages })
    }

    /// Read the raw timestamp ticks back and convert them to
    /// nanosecond offsets on the report's common origin.
    fn resolve_timestamps(
        &self,
        ctx: &GpuContext,
        query_set: &wgpu::QuerySet,
    ) -> Result<Vec<(u64, u64)>, GpuError> {
        let query_count = QUERIES_PER_STAGE * self.records.len() as u32;
        let size = query_count as u64 * std::mem::size_of::<u64>() as u64;

        let resolve_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timestamp_resolve"),
            size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("timestamp_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("timestamp_resolve_encoder"),
            });
        encoder.resolve_query_set(query_set, 0..query_count, &resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(&resolve_buffer, 0, &staging, 0, size);
        ctx.submit_and_wait(encoder);

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| GpuError::Execution(e.to_string()))?
            .map_err(|e| GpuError::Execution(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let ticks: Vec<u64> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        // Device ticks share an arbitrary origin. Re-base them so the
        // first stage's begin tick coincides with its host submit
        // offset; durations stay exact device measurements.
        let period = ctx.queue.get_timestamp_period() as f64;
        let base_tick = ticks[0];
        let base_ns = self.records[0].submitted_ns;
        let to_ns =
            |tick: u64| base_ns + (tick.saturating_sub(base_tick) as f64 * period) as u64;

        Ok(self
            .records
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let begin = ticks[i * QUERIES_PER_STAGE as usize];
                let end = ticks[i * QUERIES_PER_STAGE as usize + 1];
                (to_ns(begin), to_ns(end))
            })
            .collect())
    }
}
