//! Configuration errors raised before any device work is issued.

use crate::image::BitDepth;
use crate::layout::{BufferLayout, ColorMode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "sample buffer holds {actual} samples but {width}x{height}x{depth}x{channels} needs {expected}"
    )]
    SampleCount {
        width: u32,
        height: u32,
        depth: u32,
        channels: u32,
        expected: usize,
        actual: usize,
    },
    #[error("{mode} mode cannot process {channels}-channel images (expected {expected})")]
    UnsupportedChannels {
        mode: ColorMode,
        channels: u32,
        expected: &'static str,
    },
    #[error("image is {actual} but the run was configured for {expected}")]
    BitDepthMismatch { expected: BitDepth, actual: BitDepth },
    #[error("buffers sized for {allocated} cannot be reused for {requested}; reallocate them")]
    BufferLayoutMismatch {
        allocated: BufferLayout,
        requested: BufferLayout,
    },
    #[error("image has no channels")]
    NoChannels,
    #[error("image dimensions overflow the addressable sample count")]
    TooLarge,
}
