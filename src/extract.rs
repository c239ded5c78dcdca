//! Detect peaks inside a single window and translate them into spectrum
//! coordinates.
use thiserror::Error;

use crate::cwt::cwt;
use crate::peak::{DetectedPeak, SampleId};
use crate::peak_statistics::refine_peak;
use crate::ridge::{identify_peaks, trace_ridges, RidgeParams};
use crate::window::Window;

/// The ways peak extraction can fail for one window. These never escape the
/// window, see [`WindowOutcome`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("No wavelet scales were given")]
    EmptyScales,
    #[error("The window holds {0} points, too few to detect peaks in")]
    WindowTooShort(usize),
    #[error("The window signal is not finite at position {0}")]
    NonFiniteSignal(usize),
    #[error("Spectrum point {0} has no ppm coordinate")]
    PpmOutOfRange(usize),
}

/// What happened to one window
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    /// Extraction ran, finding zero or more peaks
    Peaks(Vec<DetectedPeak>),
    /// The window was classified as baseline noise and skipped
    Noise,
    /// Extraction failed, which counts as finding no peaks
    Failed(ExtractionError),
}

impl WindowOutcome {
    pub fn into_peaks(self) -> Vec<DetectedPeak> {
        match self {
            Self::Peaks(peaks) => peaks,
            Self::Noise | Self::Failed(_) => Vec::new(),
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, Self::Noise)
    }
}

impl From<Result<Vec<DetectedPeak>, ExtractionError>> for WindowOutcome {
    fn from(value: Result<Vec<DetectedPeak>, ExtractionError>) -> Self {
        match value {
            Ok(peaks) => Self::Peaks(peaks),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Runs the multi-scale wavelet peak detector over a window and refines the
/// detected peaks against the window's signal.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPeakExtractor {
    /// The ascending wavelet scale ladder
    pub scales: Vec<u32>,
    pub ridge_params: RidgeParams,
    /// Report the sampled intensity at the apex instead of the refined height
    pub use_raw_peak_height: bool,
    /// Peaks this close to a window edge that is not also a spectrum edge are
    /// left for an overlapping window to report
    pub edge_margin: usize,
}

impl WindowPeakExtractor {
    /// Detect peaks in `window`, whose sample's ppm axis is `ppm`.
    ///
    /// The reported index is the 1-based spectrum position, with the window's
    /// start offset added and the left padding removed.
    pub fn extract(
        &self,
        window: &Window,
        ppm: &[f64],
        sample: SampleId,
    ) -> Result<Vec<DetectedPeak>, ExtractionError> {
        let signal = &window.signal;
        if self.scales.is_empty() {
            return Err(ExtractionError::EmptyScales);
        }
        if signal.len() < 3 {
            return Err(ExtractionError::WindowTooShort(signal.len()));
        }
        if let Some(position) = signal.iter().position(|v| !v.is_finite()) {
            return Err(ExtractionError::NonFiniteSignal(position));
        }

        let coefficients = cwt(signal, &self.scales);
        let ridges = trace_ridges(&coefficients, self.ridge_params.gap_threshold);
        let ridge_peaks = identify_peaks(&coefficients, &ridges, &self.ridge_params);

        let span = window.span;
        let signal_start = span.pad_left;
        let signal_end = span.pad_left + span.len();
        let left_is_interior = span.start_index > 0;
        let right_is_interior = span.end_index < ppm.len();

        let mut peaks = Vec::with_capacity(ridge_peaks.len());
        for ridge_peak in ridge_peaks {
            let radius = (ridge_peak.scale as usize).max(1);
            let (apex, height) = refine_peak(signal, ridge_peak.position, radius);

            if left_is_interior && apex < signal_start + self.edge_margin {
                continue;
            }
            if right_is_interior && apex + self.edge_margin >= signal_end {
                continue;
            }
            let Some(offset) = span.to_spectrum_offset(apex) else {
                continue;
            };
            let ppm_value = *ppm
                .get(offset)
                .ok_or(ExtractionError::PpmOutOfRange(offset))?;
            let value = if self.use_raw_peak_height {
                signal[apex]
            } else {
                height
            };
            peaks.push(DetectedPeak::new(
                offset as u32 + 1,
                ppm_value,
                value,
                ridge_peak.signal_to_noise,
                ridge_peak.scale,
                sample,
            ));
        }
        Ok(peaks)
    }

    /// Extract peaks, folding any failure into [`WindowOutcome::Failed`]
    pub fn extract_outcome(&self, window: &Window, ppm: &[f64], sample: SampleId) -> WindowOutcome {
        self.extract(window, ppm, sample).into()
    }
}
