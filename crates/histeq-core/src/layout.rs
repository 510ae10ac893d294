//! Color mode and the buffer layout a pipeline run is sized for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::image::{BitDepth, Image};

/// Which channel the equalization operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorMode {
    /// Single-channel image; the sample is the intensity.
    #[default]
    Grayscale,
    /// RGB or RGBA image; a derived lightness plane is equalized.
    Color,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale => write!(f, "grayscale"),
            Self::Color => write!(f, "color"),
        }
    }
}

impl ColorMode {
    /// Check that `channels` can be processed in this mode.
    pub fn check_channels(self, channels: u32) -> Result<(), ConfigError> {
        let ok = match self {
            Self::Grayscale => channels == 1,
            Self::Color => channels == 3 || channels == 4,
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::UnsupportedChannels {
                mode: self,
                channels,
                expected: match self {
                    Self::Grayscale => "1",
                    Self::Color => "3 or 4",
                },
            })
        }
    }
}

/// Everything that determines device buffer sizes for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferLayout {
    pub mode: ColorMode,
    pub bit_depth: BitDepth,
    pub pixel_count: u32,
    pub channels: u32,
}

impl BufferLayout {
    /// Derive the layout for `image` processed in `mode`.
    pub fn for_image(image: &Image, mode: ColorMode) -> Result<Self, ConfigError> {
        mode.check_channels(image.channels())?;
        Ok(Self {
            mode,
            bit_depth: image.bit_depth(),
            pixel_count: image.pixel_count(),
            channels: image.channels(),
        })
    }

    pub fn levels(&self) -> u32 {
        self.bit_depth.levels()
    }

    pub fn max_level(&self) -> u32 {
        self.bit_depth.max_level()
    }

    /// Total interleaved samples (`pixel_count * channels`).
    pub fn sample_count(&self) -> u32 {
        self.pixel_count * self.channels
    }

    /// Reject reuse of buffers sized for a different layout.
    pub fn ensure_matches(&self, requested: &BufferLayout) -> Result<(), ConfigError> {
        if self == requested {
            Ok(())
        } else {
            Err(ConfigError::BufferLayoutMismatch {
                allocated: *self,
                requested: *requested,
            })
        }
    }
}

impl fmt::Display for BufferLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} px, {} ch, {} levels)",
            self.bit_depth,
            self.mode,
            self.pixel_count,
            self.channels,
            self.levels()
        )
    }
}
