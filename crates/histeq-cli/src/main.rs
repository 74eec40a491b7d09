use clap::Parser;
use histeq_cli::{format_array, format_timing, load_png, save_png};
use histeq_core::{cpu, gpu, BinConfig, DeviceSelection, EqualizeResult};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "histeq")]
#[command(version, about = "GPU-parallel histogram equalization for PNG images", long_about = None)]
struct Cli {
    /// Input PNG file (8-bit grayscale or RGB)
    #[arg(value_name = "INPUT", required_unless_present = "info")]
    input: Option<PathBuf>,

    /// Histogram bin count (power of two, 1-256)
    #[arg(short, long, value_name = "N", default_value = "256")]
    bins: u32,

    /// Output file (defaults to <input>_eq.png)
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Compute adapter index (defaults to automatic selection)
    #[arg(short, long, value_name = "N")]
    device: Option<usize>,

    /// Run on the CPU instead of the GPU
    #[arg(long)]
    cpu: bool,

    /// Print the available compute adapter and exit
    #[arg(long)]
    info: bool,

    /// Print per-stage queue/submit/start/end breakdown
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match (cli.info, cli.input) {
        (true, _) => cmd_info(),
        (false, Some(input)) => cmd_equalize(
            input,
            cli.bins,
            cli.out,
            cli.device,
            cli.cpu,
            cli.verbose,
        ),
        (false, None) => Err("No input file given".to_string()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_info() -> Result<(), String> {
    match gpu::gpu_info() {
        Some(info) => {
            println!("GPU: {}", info);
            Ok(())
        }
        None => Err("No compute adapter available".to_string()),
    }
}

fn cmd_equalize(
    input: PathBuf,
    bins: u32,
    out: Option<PathBuf>,
    device: Option<usize>,
    use_cpu: bool,
    verbose: bool,
) -> Result<(), String> {
    let bins = BinConfig::new(bins)?;
    let image = load_png(&input)?;

    println!(
        "Loaded {}: {}x{}, {} channel(s), {} bins",
        input.display(),
        image.width,
        image.height,
        image.channels,
        bins.bin_count()
    );

    let result = if use_cpu {
        println!("Running on CPU");
        cpu::equalize(&image, bins)
    } else {
        run_gpu(&image, bins, device, verbose)?
    };

    print_report(&result, verbose);

    let out_path = out.unwrap_or_else(|| default_output_path(&input));
    save_png(&out_path, &result.output)?;
    println!("Wrote {}", out_path.display());

    Ok(())
}

fn run_gpu(
    image: &histeq_core::ImageData,
    bins: BinConfig,
    device: Option<usize>,
    verbose: bool,
) -> Result<EqualizeResult, String> {
    let selection = match device {
        Some(index) => DeviceSelection::Index(index),
        None => DeviceSelection::Auto,
    };

    let ctx = gpu::GpuContext::new(selection).map_err(|e| e.to_string())?;
    if verbose {
        let info = ctx.adapter_info();
        println!("GPU adapter: {} ({:?})", info.name, info.backend);
    }

    gpu::equalize(&ctx, image, bins).map_err(|e| e.to_string())
}

fn print_report(result: &EqualizeResult, verbose: bool) {
    println!();
    println!("Histogram: {}", format_array(&result.histogram));
    println!("Cumulative Histogram: {}", format_array(&result.cumulative));
    println!("LUT: {}", format_array(&result.lut));
    println!();
    print!("{}", format_timing(&result.timing, verbose));
}

/// `foo.png` becomes `foo_eq.png`, in the input's directory.
fn default_output_path(input: &PathBuf) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}_eq.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_input_unless_info() {
        assert!(Cli::try_parse_from(["histeq"]).is_err());
        assert!(Cli::try_parse_from(["histeq", "--info"]).is_ok());

        let cli = Cli::try_parse_from(["histeq", "scan.png", "--bins", "64"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("scan.png")));
        assert_eq!(cli.bins, 64);
        assert!(!cli.info);
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(&PathBuf::from("/data/scan.png"));
        assert_eq!(path, PathBuf::from("/data/scan_eq.png"));
    }

    #[test]
    fn test_default_output_path_no_extension() {
        let path = default_output_path(&PathBuf::from("scan"));
        assert_eq!(path, PathBuf::from("scan_eq.png"));
    }
}
