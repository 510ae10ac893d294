//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use histeq_core::{BitDepth, ColorMode, EqualizeConfig};

#[derive(Debug, Parser)]
#[command(name = "histeq")]
#[command(version, about = "GPU histogram equalization", long_about = None)]
pub struct Args {
    /// Input image file
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output image file [default: <INPUT>_equalized.png]
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Color mode: grayscale, or equalize the luma of an RGB(A) image
    #[arg(short = 'c', long = "color", value_enum, default_value_t = ModeArg::Gs)]
    pub mode: ModeArg,

    /// Sample bit depth
    #[arg(short = 's', long = "bits", value_enum, default_value_t = BitsArg::Eight)]
    pub bits: BitsArg,

    /// Print the selected GPU adapter
    #[arg(short = 'p', long = "print-device")]
    pub print_device: bool,

    /// Debug logging, histogram/CDF dump and shader build messages
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Write the histogram and CDF as JSON
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Single-channel grayscale
    Gs,
    /// RGB or RGBA, luma only
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BitsArg {
    #[value(name = "8")]
    Eight,
    #[value(name = "16")]
    Sixteen,
}

impl From<ModeArg> for ColorMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Gs => ColorMode::Grayscale,
            ModeArg::Rgb => ColorMode::Color,
        }
    }
}

impl From<BitsArg> for BitDepth {
    fn from(bits: BitsArg) -> Self {
        match bits {
            BitsArg::Eight => BitDepth::U8,
            BitsArg::Sixteen => BitDepth::U16,
        }
    }
}

impl Args {
    pub fn config(&self) -> EqualizeConfig {
        EqualizeConfig {
            mode: self.mode.into(),
            bit_depth: self.bits.into(),
            diagnostics: self.debug || self.dump.is_some(),
        }
    }

    /// The explicit output path, or `<input stem>_equalized.png` beside the input.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.input.with_file_name(format!("{stem}_equalized.png"))
    }
}
