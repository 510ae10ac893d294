//! Run configuration shared by the host and device pipelines.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::image::{BitDepth, Image};
use crate::layout::{BufferLayout, ColorMode};

/// What a pipeline run is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualizeConfig {
    pub mode: ColorMode,
    pub bit_depth: BitDepth,
    /// Read back and report the histogram and CDF after the run.
    pub diagnostics: bool,
}

impl Default for EqualizeConfig {
    fn default() -> Self {
        Self {
            mode: ColorMode::Grayscale,
            bit_depth: BitDepth::U8,
            diagnostics: false,
        }
    }
}

impl EqualizeConfig {
    /// Validate `image` against this configuration and derive its buffer layout.
    pub fn layout_for(&self, image: &Image) -> Result<BufferLayout, ConfigError> {
        if image.bit_depth() != self.bit_depth {
            return Err(ConfigError::BitDepthMismatch {
                expected: self.bit_depth,
                actual: image.bit_depth(),
            });
        }
        BufferLayout::for_image(image, self.mode)
    }
}
