use std::fmt;

use mzpeaks::{CoordinateLike, IndexType, IndexedCoordinate, IntensityMeasurement};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The dense sample identifier used while the pipeline runs. Sample ids are
/// `1..=n_samples`, in row order.
pub type SampleId = u32;

/// The chemical shift coordinate dimension, measured in parts-per-million.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChemicalShift;

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A peak found by the wavelet peak detector in one sample of a spectrum matrix.
///
/// `S` is the sample identifier type. While the detector runs this is always
/// [`SampleId`], and [`crate::PeakTable::relabel`] maps it back to the caller's
/// labels.
pub struct DetectedPeak<S = SampleId> {
    /// The 1-based column position of the peak in the spectrum matrix
    pub index: u32,
    /// The chemical shift of the peak, read from the ppm axis at `index`
    pub ppm: f64,
    /// The refined (or raw, see [`crate::WaveletPeakParams::use_raw_peak_height`]) peak height
    pub value: f64,
    /// The ratio of the peak's wavelet ridge maximum to the local wavelet noise
    pub signal_to_noise: f64,
    /// The wavelet scale at which the ridge was strongest
    pub scale: u32,
    pub sample: S,
}

impl<S> DetectedPeak<S> {
    pub fn new(index: u32, ppm: f64, value: f64, signal_to_noise: f64, scale: u32, sample: S) -> Self {
        Self {
            index,
            ppm,
            value,
            signal_to_noise,
            scale,
            sample,
        }
    }

    /// The 0-based column offset of this peak
    #[inline]
    pub fn offset(&self) -> usize {
        self.index as usize - 1
    }

    /// Replace the sample identifier, keeping every other attribute
    pub fn map_sample<T, F: FnOnce(S) -> T>(self, f: F) -> DetectedPeak<T> {
        DetectedPeak {
            index: self.index,
            ppm: self.ppm,
            value: self.value,
            signal_to_noise: self.signal_to_noise,
            scale: self.scale,
            sample: f(self.sample),
        }
    }
}

impl<S: PartialOrd> CoordinateLike<ChemicalShift> for DetectedPeak<S> {
    #[inline]
    fn coordinate(&self) -> f64 {
        self.ppm
    }
}

impl<S: PartialOrd> IndexedCoordinate<ChemicalShift> for DetectedPeak<S> {
    #[inline]
    fn get_index(&self) -> IndexType {
        self.index
    }

    #[inline]
    fn set_index(&mut self, index: IndexType) {
        self.index = index
    }
}

impl<S> IntensityMeasurement for DetectedPeak<S> {
    #[inline]
    fn intensity(&self) -> f32 {
        self.value as f32
    }
}

/// The absolute distance between two peaks along the chemical shift axis
pub fn shift_distance<P: CoordinateLike<ChemicalShift>>(a: &P, b: &P) -> f64 {
    (a.coordinate() - b.coordinate()).abs()
}

impl<S: fmt::Display> fmt::Display for DetectedPeak<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DetectedPeak({}, {}, {}, {}, {}, {})",
            self.index, self.ppm, self.value, self.signal_to_noise, self.scale, self.sample
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_coordinate_traits() {
        let mut peak = DetectedPeak::new(12, 3.251, 5400.0, 12.5, 3, 1u32);
        assert_eq!(CoordinateLike::<ChemicalShift>::coordinate(&peak), 3.251);
        assert_eq!(IndexedCoordinate::<ChemicalShift>::get_index(&peak), 12);
        assert_eq!(peak.intensity(), 5400.0f32);
        assert_eq!(peak.offset(), 11);
        IndexedCoordinate::<ChemicalShift>::set_index(&mut peak, 20);
        assert_eq!(peak.index, 20);
    }

    #[test]
    fn test_map_sample() {
        let peak = DetectedPeak::new(5, 1.2, 10.0, 3.0, 1, 2u32);
        let relabeled = peak.map_sample(|s| format!("sample-{s}"));
        assert_eq!(relabeled.sample, "sample-2");
        assert_eq!(relabeled.index, 5);
        assert_eq!(relabeled.value, 10.0);
    }

    #[test]
    fn test_shift_distance() {
        let a = DetectedPeak::new(510, 4.002, 10.0, 3.0, 1, 1u32);
        let b = DetectedPeak::new(513, 4.000, 12.0, 3.0, 1, 1u32);
        assert!((shift_distance(&a, &b) - 0.002).abs() < 1e-12);
    }
}
