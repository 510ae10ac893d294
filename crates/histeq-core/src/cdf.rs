//! Cumulative distribution normalized to the output intensity range.

use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

/// Monotonic lookup table mapping input level to output level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cdf {
    pub values: Vec<u32>,
}

impl Cdf {
    /// Normalize `histogram` for an image of `pixel_count` pixels.
    ///
    /// With fewer than two pixels the result is the identity table.
    pub fn normalize(histogram: &Histogram, pixel_count: u32, max_level: u32) -> Self {
        let mut running = 0u32;
        let values = histogram
            .bins
            .iter()
            .enumerate()
            .map(|(level, &count)| {
                running = running.saturating_add(count);
                scale_level(running, level as u32, pixel_count, max_level)
            })
            .collect();
        Self { values }
    }

    pub fn levels(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn is_monotonic(&self) -> bool {
        self.values.windows(2).all(|w| w[0] <= w[1])
    }

    /// Output level for `sample`. Out-of-range samples use the last entry.
    pub fn map(&self, sample: u32) -> u32 {
        let last = self.values.len().saturating_sub(1);
        self.values[(sample as usize).min(last)]
    }
}

/// Output level for one CDF entry:
/// `floor((cumulative - 1) * max_level / (pixel_count - 1))` clamped to `[0, max_level]`.
pub fn scale_level(cumulative: u32, level: u32, pixel_count: u32, max_level: u32) -> u32 {
    if pixel_count <= 1 {
        return level.min(max_level);
    }
    if cumulative == 0 {
        return 0;
    }
    let numerator = u64::from(cumulative - 1) * u64::from(max_level);
    let scaled = numerator / u64::from(pixel_count - 1);
    scaled.min(u64::from(max_level)) as u32
}
