//! WGSL shader sources embedded at compile time.

/// Container for all shader source code.
pub struct Shaders;

impl Shaders {
    /// Per-sample binning with atomic accumulation (`hist`).
    pub const HISTOGRAM: &'static str = include_str!("histogram.wgsl");

    /// Inclusive prefix sum of the histogram (`cumu_hist`).
    pub const SCAN: &'static str = include_str!("scan.wgsl");

    /// Lookup table construction (`LUT`).
    pub const LUT: &'static str = include_str!("lut.wgsl");

    /// Per-sample remap through the lookup table (`e_output`).
    pub const REMAP: &'static str = include_str!("remap.wgsl");
}
