//! histeq — equalize the histogram of an image on the GPU.

mod args;
mod error;
mod image_io;
mod logging;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use histeq_core::{BufferLayout, Cdf, Histogram};
use histeq_gpu::{DeviceRun, Equalizer, GpuContext};
use serde::Serialize;

use args::Args;
use error::CliError;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::setup_logging(args.debug);

    match run(&args, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Run one equalization. Device identity and diagnostics tables go to `out`.
fn run(args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    let config = args.config();

    // The device is reported before the input is touched.
    let context = GpuContext::create_blocking()?;
    if args.print_device {
        writeln!(out, "Running on {}", context.describe())?;
    }

    let image = image_io::load(&args.input, config.mode, config.bit_depth)?;
    let layout = config.layout_for(&image)?;
    tracing::info!(input = %args.input.display(), %layout, "loaded input");

    let equalizer = Equalizer::new(context, config)?;
    let result = equalizer.run(&image)?;

    if args.debug {
        print_intermediates(out, &result)?;
    }
    if let Some(path) = &args.dump {
        write_dump(path, &args.input, layout, &result)?;
    }

    let output = args.output_path();
    image_io::save(&result.image, &output)?;
    tracing::info!(output = %output.display(), "wrote equalized image");
    Ok(())
}

/// Print every occupied histogram level with its count and CDF entry.
fn print_intermediates(out: &mut impl Write, result: &DeviceRun) -> io::Result<()> {
    let (Some(histogram), Some(cdf)) = (&result.histogram, &result.cdf) else {
        return Ok(());
    };
    let stages: Vec<String> = result.stages.iter().map(ToString::to_string).collect();
    writeln!(out, "Stages: {}", stages.join(" -> "))?;
    writeln!(
        out,
        "Histogram: {} levels, {} pixels, peak {}",
        histogram.levels(),
        histogram.total(),
        histogram.peak()
    )?;
    writeln!(out, "{:>7} {:>10} {:>7}", "level", "count", "cdf")?;
    for (level, count) in histogram.occupied() {
        writeln!(out, "{level:>7} {count:>10} {:>7}", cdf.map(level))?;
    }
    Ok(())
}

#[derive(Serialize)]
struct DiagnosticsDump<'a> {
    input: &'a Path,
    layout: BufferLayout,
    stages: Vec<String>,
    histogram: Option<&'a Histogram>,
    cdf: Option<&'a Cdf>,
}

fn write_dump(path: &Path, input: &Path, layout: BufferLayout, result: &DeviceRun) -> Result<(), CliError> {
    let dump = DiagnosticsDump {
        input,
        layout,
        stages: result.stages.iter().map(ToString::to_string).collect(),
        histogram: result.histogram.as_ref(),
        cdf: result.cdf.as_ref(),
    };
    let json = serde_json::to_string_pretty(&dump)?;
    std::fs::write(path, json).map_err(|source| CliError::Dump {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "wrote diagnostics dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use histeq_core::{BitDepth, ColorMode, ConfigError, Image, Samples};

    use super::*;

    fn gpu_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn has_adapter() -> bool {
        match GpuContext::create_blocking() {
            Ok(_) => true,
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                false
            }
        }
    }

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("histeq").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_config_error_keeps_its_own_variant() {
        let err = CliError::from(ConfigError::NoChannels);
        assert!(matches!(err, CliError::Config(ConfigError::NoChannels)));
        assert_eq!(err.to_string(), ConfigError::NoChannels.to_string());
    }

    #[test]
    fn test_device_is_reported_before_a_bad_input_fails() {
        let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
        if !has_adapter() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let args = parse(&["-p", "-i", missing.to_str().unwrap()]);

        let mut out = Vec::new();
        let err = run(&args, &mut out).unwrap_err();
        assert!(matches!(err, CliError::Image(image_io::ImageIoError::Decode(_))));
        assert!(String::from_utf8(out).unwrap().starts_with("Running on "));
    }

    #[test]
    fn test_run_writes_image_and_dump() {
        let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
        if !has_adapter() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ramp.png");
        let output = dir.path().join("out.png");
        let dump = dir.path().join("dump.json");
        let image = Image::new(2, 2, 1, Samples::U8(vec![0, 85, 170, 255])).unwrap();
        image_io::save(&image, &input).unwrap();

        let args = parse(&[
            "-d",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--dump",
            dump.to_str().unwrap(),
        ]);
        let mut out = Vec::new();
        run(&args, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Stages: upload -> histogram -> cdf -> lookup -> download"));

        let written = image_io::load(&output, ColorMode::Grayscale, BitDepth::U8).unwrap();
        assert_eq!(written, image);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
        assert_eq!(json["histogram"]["bins"][85], 1);
        assert_eq!(json["cdf"]["values"][170], 170);
        assert_eq!(json["stages"].as_array().map(Vec::len), Some(5));
    }
}
