//! Timing and array report formatting.
//!
//! Times print in nanoseconds; the total spans from the first stage
//! being queued on the host to the last stage finishing on the device.

use histeq_core::{Stage, TimingReport};

/// Human-readable name for a stage in the timing report.
fn stage_display_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Histogram => "Histogram",
        Stage::CumulativeHistogram => "Cumulative Histogram",
        Stage::Lut => "LUT",
        Stage::Remap => "Output processing",
    }
}

/// Format the per-stage and total timing report.
///
/// `verbose` adds the queued/submitted/started/ended breakdown under
/// each stage line.
pub fn format_timing(report: &TimingReport, verbose: bool) -> String {
    let mut out = String::new();

    for timing in &report.stages {
        out.push_str(&format!(
            "{} kernel execution time: {} [ns]\n",
            stage_display_name(timing.stage),
            timing.duration_ns()
        ));
        if verbose {
            out.push_str(&format!(
                "  queued: {} [ns], submitted: {} [ns], started: {} [ns], ended: {} [ns]\n",
                timing.queued_ns, timing.submitted_ns, timing.started_ns, timing.ended_ns
            ));
        }
    }

    out.push_str(&format!(
        "Total program execution time: {} [ns]\n",
        report.total_ns()
    ));
    out
}

/// Format a histogram-family array as a bracketed list.
pub fn format_array(values: &[u32]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use histeq_core::StageTiming;

    fn sample_report() -> TimingReport {
        TimingReport {
            stages: Stage::ALL
                .iter()
                .enumerate()
                .map(|(i, &stage)| StageTiming {
                    stage,
                    queued_ns: i as u64 * 1000,
                    submitted_ns: i as u64 * 1000 + 100,
                    started_ns: i as u64 * 1000 + 200,
                    ended_ns: i as u64 * 1000 + 700,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_timing_lines() {
        let text = format_timing(&sample_report(), false);
        assert!(text.contains("Histogram kernel execution time: 500 [ns]"));
        assert!(text.contains("Cumulative Histogram kernel execution time: 500 [ns]"));
        assert!(text.contains("LUT kernel execution time: 500 [ns]"));
        assert!(text.contains("Output processing kernel execution time: 500 [ns]"));
        // ended of last stage (3700) minus queued of first stage (0).
        assert!(text.contains("Total program execution time: 3700 [ns]"));
        assert!(!text.contains("queued:"));
    }

    #[test]
    fn test_format_timing_verbose() {
        let text = format_timing(&sample_report(), true);
        assert!(text.contains("queued: 0 [ns], submitted: 100 [ns]"));
    }

    #[test]
    fn test_format_array() {
        assert_eq!(format_array(&[1, 2, 3]), "[1, 2, 3]");
        assert_eq!(format_array(&[]), "[]");
        assert_eq!(format_array(&[42]), "[42]");
    }
}
