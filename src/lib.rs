//! `nmrsignal` is a library for detecting peaks in one-dimensional NMR
//! spectra, turning a matrix of intensity traces (one row per sample) into a
//! sparse table of peaks per sample.
//!
//! Peaks are found with a multi-scale continuous wavelet transform run over
//! overlapping windows of each spectrum. Windows that look like flat baseline
//! are skipped, samples are processed in parallel, and the near-duplicate
//! peaks that overlapping windows produce are merged afterwards. See
//! [`WaveletPeakDetector`] for the pipeline and [`WaveletPeakParams`] for the
//! parameters that control it.
//!
//! # Usage
//! ```
//! use nmrsignal::{SpectrumMatrix, WaveletPeakDetector, WaveletPeakParams};
//!
//! let n = 2048;
//! let ppm: Vec<f64> = (0..n).map(|i| 10.0 - i as f64 * 0.005).collect();
//! let intensity: Vec<f64> = (0..n)
//!     .map(|i| {
//!         let d = (i as f64 - 1024.0) / 4.0;
//!         50.0 + 5000.0 * (-d * d / 2.0).exp()
//!     })
//!     .collect();
//!
//! let spectra = SpectrumMatrix::from_spectrum(intensity, ppm).unwrap();
//! let detector = WaveletPeakDetector::new(&WaveletPeakParams::default()).unwrap();
//! let peaks = detector.detect(&spectra).unwrap();
//! assert_eq!(peaks.len(), 1);
//! for peak in peaks.iter() {
//!     println!("{}", peak);
//! }
//! ```
//!
//! ## Features
//! - `parallelism` (default) spreads samples and duplicate resolution over a
//!   `rayon` thread pool. Without it everything runs on the calling thread and
//!   gives the same result.
//! - `serde` makes the parameters and the peak table serializable.
pub mod cwt;
pub mod duplicates;
pub mod extract;
pub mod labels;
pub mod noise;
pub mod parallel;
pub mod peak;
pub mod peak_picker;
pub mod peak_statistics;
pub mod prelude;
pub mod ridge;
pub mod spectrum;
pub mod stats;
pub mod table;
pub mod text;
pub mod window;

#[cfg(test)]
mod test_data;

pub use crate::labels::{LabelError, SampleLabels};
pub use crate::parallel::{NoProgress, ProgressObserver};
pub use crate::peak::{ChemicalShift, DetectedPeak, SampleId};
pub use crate::peak_picker::{
    detect_peaks, Concurrency, ParameterError, PeakDetectionError, WaveletPeakDetector,
    WaveletPeakParams, WaveletPeakParamsBuilder,
};
pub use crate::spectrum::{PpmAxis, SpectrumError, SpectrumMatrix};
pub use crate::table::PeakTable;
pub use crate::window::WindowWidth;
