//! Image representation for the equalization pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Supported sample bit depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
        }
    }

    /// Number of representable intensity levels (`2^bits`).
    pub fn levels(self) -> u32 {
        1 << self.bits()
    }

    /// Largest representable sample value.
    pub fn max_level(self) -> u32 {
        self.levels() - 1
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U16 => write!(f, "16-bit"),
        }
    }
}

/// Flat sample storage, tagged by bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl Samples {
    pub fn bit_depth(&self) -> BitDepth {
        match self {
            Self::U8(_) => BitDepth::U8,
            Self::U16(_) => BitDepth::U16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every sample to `u32`, the element type of device storage buffers.
    pub fn to_u32(&self) -> Vec<u32> {
        match self {
            Self::U8(v) => v.iter().map(|&s| u32::from(s)).collect(),
            Self::U16(v) => v.iter().map(|&s| u32::from(s)).collect(),
        }
    }

    /// Narrow `u32` values back to `depth`, saturating at the depth's maximum.
    pub fn from_u32(depth: BitDepth, values: &[u32]) -> Self {
        match depth {
            BitDepth::U8 => Self::U8(values.iter().map(|&v| v.min(255) as u8).collect()),
            BitDepth::U16 => Self::U16(values.iter().map(|&v| v.min(65535) as u16).collect()),
        }
    }
}

/// A raster image: row-major, channel-interleaved samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    depth: u32,
    channels: u32,
    samples: Samples,
}

impl Image {
    /// Build a 2-D image, checking that the sample count matches the geometry.
    pub fn new(width: u32, height: u32, channels: u32, samples: Samples) -> Result<Self, ConfigError> {
        Self::with_depth(width, height, 1, channels, samples)
    }

    /// Build an image with an explicit depth (number of slices).
    pub fn with_depth(
        width: u32,
        height: u32,
        depth: u32,
        channels: u32,
        samples: Samples,
    ) -> Result<Self, ConfigError> {
        if channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        // Both the pixel count and the sample count must fit in u32.
        let expected = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|n| n.checked_mul(u64::from(depth)))
            .filter(|&pixels| pixels <= u64::from(u32::MAX))
            .and_then(|pixels| pixels.checked_mul(u64::from(channels)))
            .filter(|&n| n <= u64::from(u32::MAX))
            .ok_or(ConfigError::TooLarge)? as usize;
        if samples.len() != expected {
            return Err(ConfigError::SampleCount {
                width,
                height,
                depth,
                channels,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.samples.bit_depth()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Number of pixels (`width * height * depth`).
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height * self.depth
    }

    /// Same geometry, new samples. The replacement must have the same length.
    pub fn with_samples(&self, samples: Samples) -> Result<Self, ConfigError> {
        Self::with_depth(self.width, self.height, self.depth, self.channels, samples)
    }
}
