//! Decide whether a window holds only baseline noise.
use crate::stats::{mean, median, minmax};

/// The largest relative difference between a window's mean and median for
/// which the window is still considered flat
pub const NOISE_RELATIVE_TOLERANCE: f64 = 0.005;

/// Location statistics of a window's unpadded signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStatistics {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl WindowStatistics {
    pub fn new(signal: &[f64]) -> Self {
        let (_, max) = minmax(signal);
        Self {
            mean: mean(signal),
            median: median(signal),
            max,
        }
    }

    /// A window is noise if it is flat (its mean and median agree) or if nothing
    /// in it rises above `baseline_threshold`.
    pub fn is_noise(&self, baseline_threshold: f64) -> bool {
        if self.mean == self.median {
            return true;
        }
        let relative = (self.mean - self.median).abs() / (2.0 * (self.mean + self.median));
        relative < NOISE_RELATIVE_TOLERANCE || self.max < baseline_threshold
    }
}

/// Classify `signal` as noise, see [`WindowStatistics::is_noise`]
pub fn is_noise(signal: &[f64], baseline_threshold: f64) -> bool {
    signal.is_empty() || WindowStatistics::new(signal).is_noise(baseline_threshold)
}
