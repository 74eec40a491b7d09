//! Data models for histogram equalization
//!
//! Core data structures shared by the CPU reference implementation and
//! the GPU pipeline: the input image, the validated bin configuration,
//! device selection, and the result/timing report types.

use serde::Deserialize;

/// Number of representable intensity values for 8-bit samples.
pub const MAX_INTENSITY: u32 = 256;

/// An 8-bit raster image held in host memory.
///
/// Samples are stored in row-major order; for multi-channel images the
/// channels are interleaved. The pipeline only ever reads this data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Image depth (always 1 for 2-D images)
    pub depth: u32,

    /// Number of channels (1 for grayscale, 3 for color)
    pub channels: u32,

    /// Interleaved 8-bit samples, `width * height * depth * channels` long
    pub samples: Vec<u8>,
}

impl ImageData {
    /// Create an image, validating that the sample count is addressable
    /// and that the sample buffer length matches the stated dimensions.
    pub fn new(width: u32, height: u32, channels: u32, samples: Vec<u8>) -> Result<Self, String> {
        let expected = width as u64 * height as u64 * channels as u64;
        if expected > u32::MAX as u64 {
            return Err(format!(
                "Image of {}x{}x{} has {} samples, exceeding the supported maximum of {}",
                width,
                height,
                channels,
                expected,
                u32::MAX
            ));
        }
        let expected = expected as usize;
        if samples.len() != expected {
            return Err(format!(
                "Sample buffer length mismatch: expected {} ({}x{}x{}), got {}",
                expected,
                width,
                height,
                channels,
                samples.len()
            ));
        }
        Ok(Self {
            width,
            height,
            depth: 1,
            channels,
            samples,
        })
    }

    /// Total number of 8-bit samples (width * height * depth * channels).
    pub fn sample_count(&self) -> u32 {
        self.width * self.height * self.depth * self.channels
    }
}

/// Validated histogram bin configuration.
///
/// The bin count must divide the intensity range exactly, so only the
/// powers of two up to 256 are representable. Construct via
/// [`BinConfig::new`]; the menu-driven selection of the bin count is a
/// caller concern, this type only guarantees the invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u32")]
pub struct BinConfig {
    bin_count: u32,
}

impl BinConfig {
    /// The bin counts that divide 256 exactly.
    pub const ALLOWED: [u32; 9] = [1, 2, 4, 8, 16, 32, 64, 128, 256];

    /// Create a configuration, rejecting bin counts outside the allowed set.
    pub fn new(bin_count: u32) -> Result<Self, String> {
        if !Self::ALLOWED.contains(&bin_count) {
            return Err(format!(
                "Invalid bin count {}: must be one of {:?}",
                bin_count,
                Self::ALLOWED
            ));
        }
        Ok(Self { bin_count })
    }

    /// Number of histogram bins.
    pub fn bin_count(&self) -> u32 {
        self.bin_count
    }

    /// Width of one bin on the [0, 256) intensity range.
    ///
    /// Exact for every allowed bin count (both operands are powers of two).
    pub fn bin_width(&self) -> f32 {
        MAX_INTENSITY as f32 / self.bin_count as f32
    }
}

impl TryFrom<u32> for BinConfig {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// How to pick the compute adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSelection {
    /// Let wgpu pick a high-performance adapter.
    #[default]
    Auto,
    /// Use the adapter at this index in the enumerated adapter list.
    Index(usize),
}

/// One stage of the four-stage equalization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Per-sample binning into the histogram (atomic accumulation).
    Histogram,
    /// Inclusive prefix sum of the histogram.
    CumulativeHistogram,
    /// Lookup table construction from the cumulative histogram.
    Lut,
    /// Per-sample remap through the lookup table.
    Remap,
}

impl Stage {
    /// All stages in dispatch order.
    pub const ALL: [Stage; 4] = [
        Stage::Histogram,
        Stage::CumulativeHistogram,
        Stage::Lut,
        Stage::Remap,
    ];

    /// Name of the compute kernel entry point implementing this stage.
    pub fn kernel_name(&self) -> &'static str {
        match self {
            Stage::Histogram => "hist",
            Stage::CumulativeHistogram => "cumu_hist",
            Stage::Lut => "LUT",
            Stage::Remap => "e_output",
        }
    }
}

/// Timestamped record of one stage's dispatch.
///
/// All values are nanosecond offsets from the start of the run.
/// `queued_ns` and `submitted_ns` come from the host clock;
/// `started_ns` and `ended_ns` come from device timestamp queries when
/// the adapter supports them (host wall clock otherwise).
#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    /// Which stage this record describes
    pub stage: Stage,
    /// When the host began recording the dispatch
    pub queued_ns: u64,
    /// When the host submitted the command buffer
    pub submitted_ns: u64,
    /// When the device began executing the dispatch
    pub started_ns: u64,
    /// When the device finished executing the dispatch
    pub ended_ns: u64,
}

impl StageTiming {
    /// Device execution time of this stage (ended - started).
    pub fn duration_ns(&self) -> u64 {
        self.ended_ns.saturating_sub(self.started_ns)
    }
}

/// Per-stage and total timing for one pipeline run.
#[derive(Debug, Clone)]
pub struct TimingReport {
    /// One record per stage, in dispatch order
    pub stages: Vec<StageTiming>,
}

impl TimingReport {
    /// Total pipeline duration: completion of the last stage minus the
    /// queue time of the first stage.
    pub fn total_ns(&self) -> u64 {
        match (self.stages.first(), self.stages.last()) {
            (Some(first), Some(last)) => last.ended_ns.saturating_sub(first.queued_ns),
            _ => 0,
        }
    }
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct EqualizeResult {
    /// Per-bin sample counts
    pub histogram: Vec<u32>,
    /// Inclusive running sum of the histogram
    pub cumulative: Vec<u32>,
    /// Per-bin output intensity, non-decreasing, in [0, 255]
    pub lut: Vec<u32>,
    /// Remapped image, same dimensions as the input
    pub output: ImageData,
    /// Per-stage and total execution timing
    pub timing: TimingReport,
}
