//! Host implementation of the full equalization pass.
//!
//! Runs the same stages as the device pipeline, in the same order, and is the
//! reference the GPU results are checked against.

use crate::cdf::Cdf;
use crate::color;
use crate::error::ConfigError;
use crate::histogram::Histogram;
use crate::image::{Image, Samples};
use crate::layout::{BufferLayout, ColorMode};

/// Result of one equalization pass with its intermediates.
#[derive(Debug, Clone)]
pub struct Equalized {
    pub image: Image,
    pub histogram: Histogram,
    pub cdf: Cdf,
}

/// Replace every sample by its CDF entry.
pub fn remap(samples: &[u32], cdf: &Cdf) -> Vec<u32> {
    samples.iter().map(|&s| cdf.map(s)).collect()
}

/// Equalize `image` on the host.
pub fn equalize(image: &Image, mode: ColorMode) -> Result<Equalized, ConfigError> {
    let layout = BufferLayout::for_image(image, mode)?;
    let n = layout.pixel_count as usize;
    let raw = image.samples().to_u32();

    let (histogram, cdf, out) = match mode {
        ColorMode::Grayscale => {
            let histogram = Histogram::compute(&raw, layout.levels());
            let cdf = Cdf::normalize(&histogram, layout.pixel_count, layout.max_level());
            let mapped = remap(&raw, &cdf);
            (histogram, cdf, mapped)
        }
        ColorMode::Color => {
            let mut planar = color::to_planar(&raw, layout.channels);
            let histogram = Histogram::compute(&planar[..n], layout.levels());
            let cdf = Cdf::normalize(&histogram, layout.pixel_count, layout.max_level());
            let mapped = remap(&planar[..n], &cdf);
            planar[..n].copy_from_slice(&mapped);
            let out = color::from_planar(&planar, layout.channels, layout.max_level());
            (histogram, cdf, out)
        }
    };

    tracing::debug!(%layout, peak = histogram.peak(), "host equalization finished");
    let image = image.with_samples(Samples::from_u32(layout.bit_depth, &out))?;
    Ok(Equalized {
        image,
        histogram,
        cdf,
    })
}
