//! Per-level frequency counts.

use serde::{Deserialize, Serialize};

/// Occurrence count per intensity level.
///
/// Bins are always `u32` regardless of sample width, so a uniform image can
/// put every pixel into one bin without overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<u32>,
}

impl Histogram {
    /// Count `samples` into `levels` bins. Values above `levels - 1` land in the last bin.
    pub fn compute(samples: &[u32], levels: u32) -> Self {
        let mut bins = vec![0u32; levels as usize];
        let last = levels.saturating_sub(1);
        for &s in samples {
            bins[s.min(last) as usize] += 1;
        }
        Self { bins }
    }

    pub fn levels(&self) -> u32 {
        self.bins.len() as u32
    }

    /// Sum of all bins.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&b| u64::from(b)).sum()
    }

    /// Largest single bin.
    pub fn peak(&self) -> u32 {
        self.bins.iter().copied().max().unwrap_or(0)
    }

    /// `(level, count)` for every non-empty bin.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(i, &c)| (i as u32, c))
    }
}
