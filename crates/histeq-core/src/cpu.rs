//! CPU reference implementation of the equalization pipeline.
//!
//! Runs the same four stages as the GPU pipeline (binning, prefix sum,
//! LUT construction, remap) sequentially on the host. The GPU kernels
//! are validated against this implementation, and the CLI falls back to
//! it when no compute adapter is available. Stage timings come from the
//! host clock.

use std::time::Instant;

use crate::models::{BinConfig, EqualizeResult, ImageData, Stage, StageTiming, TimingReport};

/// Map a sample to its bin index, clamped so 255 lands in the last bin.
pub(crate) fn bin_index(sample: u8, bins: BinConfig) -> usize {
    let bin = (sample as f32 / bins.bin_width()) as u32;
    bin.min(bins.bin_count() - 1) as usize
}

/// Build the per-bin histogram of an image.
pub fn build_histogram(image: &ImageData, bins: BinConfig) -> Vec<u32> {
    let mut histogram = vec![0u32; bins.bin_count() as usize];
    for &sample in &image.samples {
        histogram[bin_index(sample, bins)] += 1;
    }
    histogram
}

/// Inclusive prefix sum of the histogram.
pub fn build_cumulative(histogram: &[u32]) -> Vec<u32> {
    let mut cumulative = Vec::with_capacity(histogram.len());
    let mut sum = 0u32;
    for &count in histogram {
        sum += count;
        cumulative.push(sum);
    }
    cumulative
}

/// Build the lookup table from the cumulative histogram.
///
/// `LUT[i] = round(CH[i] * 255 / sample_count)`, clamped to [0, 255].
/// Non-decreasing by construction since the cumulative histogram is.
pub fn build_lut(cumulative: &[u32], sample_count: u32) -> Vec<u32> {
    cumulative
        .iter()
        .map(|&ch| {
            let scaled = (ch as f64 * 255.0 / sample_count as f64).round();
            scaled.clamp(0.0, 255.0) as u32
        })
        .collect()
}

/// Remap every sample through the lookup table.
pub fn remap(image: &ImageData, lut: &[u32], bins: BinConfig) -> ImageData {
    let samples = image
        .samples
        .iter()
        .map(|&sample| lut[bin_index(sample, bins)] as u8)
        .collect();
    ImageData {
        width: image.width,
        height: image.height,
        depth: image.depth,
        channels: image.channels,
        samples,
    }
}

/// Run the full four-stage pipeline on the CPU.
pub fn equalize(image: &ImageData, bins: BinConfig) -> EqualizeResult {
    let run_start = Instant::now();
    let mut stages = Vec::with_capacity(Stage::ALL.len());

    let mut timed = |stage: Stage, start: Instant, end: Instant| {
        let queued = (start - run_start).as_nanos() as u64;
        let ended = (end - run_start).as_nanos() as u64;
        stages.push(StageTiming {
            stage,
            queued_ns: queued,
            submitted_ns: queued,
            started_ns: queued,
            ended_ns: ended,
        });
    };

    let t0 = Instant::now();
    let histogram = build_histogram(image, bins);
    let t1 = Instant::now();
    timed(Stage::Histogram, t0, t1);

    let cumulative = build_cumulative(&histogram);
    let t2 = Instant::now();
    timed(Stage::CumulativeHistogram, t1, t2);

    let lut = build_lut(&cumulative, image.sample_count());
    let t3 = Instant::now();
    timed(Stage::Lut, t2, t3);

    let output = remap(image, &lut, bins);
    let t4 = Instant::now();
    timed(Stage::Remap, t3, t4);

    EqualizeResult {
        histogram,
        cumulative,
        lut,
        output,
        timing: TimingReport { stages },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32, samples: Vec<u8>) -> ImageData {
        ImageData::new(width, height, 1, samples).unwrap()
    }

    fn gradient(width: u32, height: u32) -> ImageData {
        let samples = (0..width * height).map(|i| (i % 256) as u8).collect();
        gray(width, height, samples)
    }

    #[test]
    fn test_histogram_sums_to_sample_count() {
        let img = gradient(64, 48);
        for &count in BinConfig::ALLOWED.iter() {
            let bins = BinConfig::new(count).unwrap();
            let histogram = build_histogram(&img, bins);
            assert_eq!(histogram.len(), count as usize);
            assert_eq!(
                histogram.iter().sum::<u32>(),
                img.sample_count(),
                "bin count {}",
                count
            );
        }
    }

    #[test]
    fn test_cumulative_is_non_decreasing_and_totals() {
        let img = gradient(100, 30);
        let bins = BinConfig::new(32).unwrap();
        let cumulative = build_cumulative(&build_histogram(&img, bins));
        for pair in cumulative.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(*cumulative.last().unwrap(), img.sample_count());
    }

    #[test]
    fn test_lut_is_non_decreasing_and_bounded() {
        let img = gradient(77, 13);
        for &count in BinConfig::ALLOWED.iter() {
            let bins = BinConfig::new(count).unwrap();
            let cumulative = build_cumulative(&build_histogram(&img, bins));
            let lut = build_lut(&cumulative, img.sample_count());
            for pair in lut.windows(2) {
                assert!(pair[1] >= pair[0]);
            }
            assert!(lut.iter().all(|&v| v <= 255));
        }
    }

    #[test]
    fn test_sample_255_lands_in_last_bin() {
        for &count in BinConfig::ALLOWED.iter() {
            let bins = BinConfig::new(count).unwrap();
            assert_eq!(bin_index(255, bins), (count - 1) as usize);
        }
    }

    #[test]
    fn test_single_bin_maps_everything_to_255() {
        // Scenario A: one bin collects all N samples, CH = [N],
        // LUT = [255], and the output is uniformly 255.
        let img = gray(3, 2, vec![0, 17, 99, 128, 200, 255]);
        let bins = BinConfig::new(1).unwrap();
        let result = equalize(&img, bins);

        assert_eq!(result.histogram, vec![6]);
        assert_eq!(result.cumulative, vec![6]);
        assert_eq!(result.lut, vec![255]);
        assert!(result.output.samples.iter().all(|&s| s == 255));
    }

    #[test]
    fn test_four_bin_scenario() {
        // Scenario B: 2x2 image [0, 64, 128, 255] with 4 bins of width 64.
        // One sample per bin, CH = [1,2,3,4], LUT = round(CH * 255 / 4).
        let img = gray(2, 2, vec![0, 64, 128, 255]);
        let bins = BinConfig::new(4).unwrap();
        let result = equalize(&img, bins);

        assert_eq!(result.histogram, vec![1, 1, 1, 1]);
        assert_eq!(result.cumulative, vec![1, 2, 3, 4]);
        let expected = [64u32, 128, 191, 255];
        for (got, want) in result.lut.iter().zip(expected.iter()) {
            assert!(
                got.abs_diff(*want) <= 1,
                "LUT {:?} outside tolerance of {:?}",
                result.lut,
                expected
            );
        }
        let remapped: Vec<u8> = result.lut.iter().map(|&v| v as u8).collect();
        assert_eq!(result.output.samples, remapped);
    }

    #[test]
    fn test_equalize_is_deterministic() {
        let img = gradient(40, 25);
        let bins = BinConfig::new(64).unwrap();
        let a = equalize(&img, bins);
        let b = equalize(&img, bins);
        assert_eq!(a.histogram, b.histogram);
        assert_eq!(a.cumulative, b.cumulative);
        assert_eq!(a.lut, b.lut);
        assert_eq!(a.output, b.output);
    }

    #[test]
    fn test_equalize_preserves_dimensions() {
        let img = ImageData::new(5, 3, 3, (0u8..45).collect()).unwrap();
        let result = equalize(&img, BinConfig::new(16).unwrap());
        assert_eq!(result.output.width, 5);
        assert_eq!(result.output.height, 3);
        assert_eq!(result.output.channels, 3);
        assert_eq!(result.output.samples.len(), 45);
    }

    #[test]
    fn test_equalize_expands_low_contrast() {
        // Values confined to [100, 115] should spread out after remapping.
        let samples: Vec<u8> = (0..256).map(|i| 100 + (i % 16) as u8).collect();
        let img = gray(16, 16, samples);
        let result = equalize(&img, BinConfig::new(256).unwrap());
        let min = *result.output.samples.iter().min().unwrap();
        let max = *result.output.samples.iter().max().unwrap();
        assert!(max - min > 100, "range {}..{} not expanded", min, max);
    }

    #[test]
    fn test_timing_report_has_all_stages() {
        let img = gradient(8, 8);
        let result = equalize(&img, BinConfig::new(256).unwrap());
        assert_eq!(result.timing.stages.len(), 4);
        let order: Vec<Stage> = result.timing.stages.iter().map(|t| t.stage).collect();
        assert_eq!(order, Stage::ALL);
        // Stage records never overlap backwards.
        for pair in result.timing.stages.windows(2) {
            assert!(pair[1].queued_ns >= pair[0].ended_ns);
        }
    }
}
