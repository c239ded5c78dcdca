//! Sliding window wavelet peak detection over a matrix of spectra.
//!
//! Detection runs in two rounds. First every sample is cut into overlapping
//! windows for each configured split factor, windows that look like baseline
//! noise are skipped, and peaks are extracted from the rest and aggregated per
//! sample. Samples are independent and are spread over a worker pool. Second,
//! the near-duplicate peaks that overlapping windows produce are merged across
//! the whole dataset by [`DuplicateResolver`].
use std::collections::HashSet;
use std::hash::Hash;

use log::{debug, info, warn};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::duplicates::DuplicateResolver;
use crate::extract::{WindowOutcome, WindowPeakExtractor};
use crate::labels::{LabelError, SampleLabels};
use crate::noise::is_noise;
use crate::parallel::{parallel_map, NoProgress, ProgressCounter, ProgressObserver};
use crate::peak::{DetectedPeak, SampleId};
use crate::ridge::RidgeParams;
use crate::spectrum::{PpmAxis, SpectrumError, SpectrumMatrix};
use crate::table::PeakTable;
use crate::window::{validate_window_split, Window, WindowWidth, Windower, DEFAULT_WINDOW_SPLIT};

/// The fraction of the largest wavelet scale used as the signal to noise
/// threshold when none is given
pub const AUTO_SNR_SCALE_FRACTION: f64 = 0.05;

/// Duplicate detection multipliers above this are accepted with a warning
pub const MAX_RECOMMENDED_DUPLICATE_MULTIPLIER: f64 = 10.0;

/// The number of worker threads to detect peaks with
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Concurrency {
    /// All available hardware threads but one
    #[default]
    Auto,
    Workers(usize),
}

impl From<isize> for Concurrency {
    /// Zero or negative counts mean [`Concurrency::Auto`]
    fn from(value: isize) -> Self {
        if value <= 0 {
            Self::Auto
        } else {
            Self::Workers(value as usize)
        }
    }
}

impl Concurrency {
    /// The number of workers to run `n_tasks` tasks with, at least one
    pub fn resolve(&self, n_tasks: usize) -> usize {
        let requested = match self {
            Self::Auto => std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1),
            Self::Workers(n) => *n,
        };
        requested.min(n_tasks).max(1)
    }
}

/// The ways a set of [`WaveletPeakParams`] can be invalid
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("The wavelet scale ladder is empty")]
    EmptyScales,
    #[error("Wavelet scales must be positive, found 0 at position {0}")]
    ZeroScale(usize),
    #[error("Wavelet scales must be strictly ascending, position {0} is not")]
    ScalesNotAscending(usize),
    #[error("The duplicate detection multiplier must be positive and finite, found {0}")]
    InvalidDuplicateMultiplier(f64),
    #[error("The baseline threshold must be finite, found {0}")]
    InvalidBaselineThreshold(f64),
    #[error("No window split factors were given")]
    EmptyWindowSplits,
}

/// All the ways peak detection can fail
#[derive(Debug, Error)]
pub enum PeakDetectionError {
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[cfg(feature = "parallelism")]
    #[error("Failed to start the worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Sample {0} is not in the spectrum matrix")]
    SampleOutOfRange(usize),
}

/// The configuration of a [`WaveletPeakDetector`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaveletPeakParams {
    pub window_width: WindowWidth,
    /// The split factors to window each spectrum with. Every factor gives one
    /// pass over the spectrum.
    pub window_splits: Vec<usize>,
    /// The ascending wavelet scale ladder
    pub scales: Vec<u32>,
    /// Windows that never reach this intensity are skipped, and peaks must
    /// exceed it to be reported
    pub baseline_threshold: f64,
    /// The minimum ridge signal to noise ratio. Negative values select
    /// `0.05 * max(scales)`.
    pub snr_threshold: f64,
    pub concurrency: Concurrency,
    /// Keep lower signal to noise peaks on the tail of a major peak
    pub include_nearby_peaks: bool,
    /// Report the sampled intensity at the peak instead of the refined height
    pub use_raw_peak_height: bool,
    /// Scales the ppm distance within which two peaks of a sample are duplicates
    pub duplicate_detection_multiplier: f64,
    pub min_ridge_length: Option<usize>,
    pub ridge_gap_threshold: usize,
    pub peak_scale_range: u32,
    pub noise_window: usize,
    pub min_noise_level: f64,
    pub nearby_window: usize,
    /// Peaks closer than this to an interior window edge are left to an
    /// overlapping window
    pub edge_margin: usize,
}

impl Default for WaveletPeakParams {
    fn default() -> Self {
        let ridge = RidgeParams::default();
        Self {
            window_width: WindowWidth::Small,
            window_splits: vec![DEFAULT_WINDOW_SPLIT],
            scales: (1..16).step_by(2).collect(),
            baseline_threshold: 1000.0,
            snr_threshold: -1.0,
            concurrency: Concurrency::Auto,
            include_nearby_peaks: true,
            use_raw_peak_height: false,
            duplicate_detection_multiplier: 1.0,
            min_ridge_length: ridge.min_ridge_length,
            ridge_gap_threshold: ridge.gap_threshold,
            peak_scale_range: ridge.peak_scale_range,
            noise_window: ridge.noise_window,
            min_noise_level: ridge.min_noise_level,
            nearby_window: ridge.nearby_window,
            edge_margin: 50,
        }
    }
}

impl WaveletPeakParams {
    pub fn builder() -> WaveletPeakParamsBuilder {
        WaveletPeakParamsBuilder::default()
    }

    /// The signal to noise threshold after resolving the automatic sentinel
    pub fn effective_snr_threshold(&self) -> f64 {
        if self.snr_threshold < 0.0 {
            let largest = self.scales.iter().max().copied().unwrap_or_default();
            AUTO_SNR_SCALE_FRACTION * largest as f64
        } else {
            self.snr_threshold
        }
    }

    /// Check the parameters and replace out-of-range window splits, returning
    /// the parameters a detector runs with
    pub fn validate(&self) -> Result<Self, ParameterError> {
        if self.scales.is_empty() {
            return Err(ParameterError::EmptyScales);
        }
        if let Some(i) = self.scales.iter().position(|s| *s == 0) {
            return Err(ParameterError::ZeroScale(i));
        }
        if let Some(i) = self.scales.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ParameterError::ScalesNotAscending(i + 1));
        }
        let multiplier = self.duplicate_detection_multiplier;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ParameterError::InvalidDuplicateMultiplier(multiplier));
        }
        if multiplier > MAX_RECOMMENDED_DUPLICATE_MULTIPLIER {
            warn!(
                "A duplicate detection multiplier of {multiplier} exceeds {MAX_RECOMMENDED_DUPLICATE_MULTIPLIER}, distinct peaks may be merged"
            );
        }
        if !self.baseline_threshold.is_finite() {
            return Err(ParameterError::InvalidBaselineThreshold(
                self.baseline_threshold,
            ));
        }
        if self.window_splits.is_empty() {
            return Err(ParameterError::EmptyWindowSplits);
        }

        let mut window_splits: Vec<usize> = Vec::with_capacity(self.window_splits.len());
        for split in self.window_splits.iter().copied().map(validate_window_split) {
            if !window_splits.contains(&split) {
                window_splits.push(split);
            }
        }

        let mut params = self.clone();
        params.window_splits = window_splits;
        params.snr_threshold = self.effective_snr_threshold();
        Ok(params)
    }

    fn ridge_params(&self) -> RidgeParams {
        RidgeParams {
            snr_threshold: self.effective_snr_threshold(),
            min_ridge_length: self.min_ridge_length,
            gap_threshold: self.ridge_gap_threshold,
            peak_scale_range: self.peak_scale_range,
            noise_window: self.noise_window,
            min_noise_level: self.min_noise_level,
            include_nearby_peaks: self.include_nearby_peaks,
            nearby_window: self.nearby_window,
        }
    }
}

/// A builder for configuring [`WaveletPeakParams`]
#[derive(Debug, Clone, Default)]
pub struct WaveletPeakParamsBuilder {
    params: WaveletPeakParams,
}

impl WaveletPeakParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_width(&mut self, window_width: WindowWidth) -> &mut Self {
        self.params.window_width = window_width;
        self
    }

    pub fn window_splits(&mut self, window_splits: Vec<usize>) -> &mut Self {
        self.params.window_splits = window_splits;
        self
    }

    pub fn scales(&mut self, scales: Vec<u32>) -> &mut Self {
        self.params.scales = scales;
        self
    }

    pub fn baseline_threshold(&mut self, baseline_threshold: f64) -> &mut Self {
        self.params.baseline_threshold = baseline_threshold;
        self
    }

    pub fn snr_threshold(&mut self, snr_threshold: f64) -> &mut Self {
        self.params.snr_threshold = snr_threshold;
        self
    }

    pub fn concurrency(&mut self, concurrency: impl Into<Concurrency>) -> &mut Self {
        self.params.concurrency = concurrency.into();
        self
    }

    pub fn include_nearby_peaks(&mut self, include_nearby_peaks: bool) -> &mut Self {
        self.params.include_nearby_peaks = include_nearby_peaks;
        self
    }

    pub fn use_raw_peak_height(&mut self, use_raw_peak_height: bool) -> &mut Self {
        self.params.use_raw_peak_height = use_raw_peak_height;
        self
    }

    pub fn duplicate_detection_multiplier(&mut self, multiplier: f64) -> &mut Self {
        self.params.duplicate_detection_multiplier = multiplier;
        self
    }

    pub fn min_ridge_length(&mut self, min_ridge_length: Option<usize>) -> &mut Self {
        self.params.min_ridge_length = min_ridge_length;
        self
    }

    pub fn ridge_gap_threshold(&mut self, ridge_gap_threshold: usize) -> &mut Self {
        self.params.ridge_gap_threshold = ridge_gap_threshold;
        self
    }

    pub fn peak_scale_range(&mut self, peak_scale_range: u32) -> &mut Self {
        self.params.peak_scale_range = peak_scale_range;
        self
    }

    pub fn noise_window(&mut self, noise_window: usize) -> &mut Self {
        self.params.noise_window = noise_window;
        self
    }

    pub fn min_noise_level(&mut self, min_noise_level: f64) -> &mut Self {
        self.params.min_noise_level = min_noise_level;
        self
    }

    pub fn nearby_window(&mut self, nearby_window: usize) -> &mut Self {
        self.params.nearby_window = nearby_window;
        self
    }

    pub fn edge_margin(&mut self, edge_margin: usize) -> &mut Self {
        self.params.edge_margin = edge_margin;
        self
    }

    pub fn build(&self) -> Result<WaveletPeakParams, ParameterError> {
        self.params.validate()
    }
}

impl From<WaveletPeakParamsBuilder> for WaveletPeakParams {
    fn from(value: WaveletPeakParamsBuilder) -> Self {
        value.params
    }
}

/// Merge the peaks every window of one sample produced: the first peak seen
/// at an index wins, peaks not above `baseline_threshold` are dropped, and the
/// rest are sorted by index.
pub fn aggregate_sample_peaks(
    peaks: impl IntoIterator<Item = DetectedPeak>,
    baseline_threshold: f64,
) -> Vec<DetectedPeak> {
    let mut seen = HashSet::new();
    let mut kept: Vec<DetectedPeak> = peaks
        .into_iter()
        .filter(|p| seen.insert(p.index))
        .filter(|p| p.value > baseline_threshold)
        .collect();
    kept.sort_by_key(|p| p.index);
    kept
}

/// Detects peaks in every sample of a [`SpectrumMatrix`]
#[derive(Debug, Clone)]
pub struct WaveletPeakDetector {
    params: WaveletPeakParams,
    extractor: WindowPeakExtractor,
    resolver: DuplicateResolver,
}

impl WaveletPeakDetector {
    pub fn new(params: &WaveletPeakParams) -> Result<Self, ParameterError> {
        let params = params.validate()?;
        let extractor = WindowPeakExtractor {
            scales: params.scales.clone(),
            ridge_params: params.ridge_params(),
            use_raw_peak_height: params.use_raw_peak_height,
            edge_margin: params.edge_margin,
        };
        let smallest_split = params
            .window_splits
            .iter()
            .min()
            .copied()
            .unwrap_or(DEFAULT_WINDOW_SPLIT);
        let resolver = DuplicateResolver::new(
            params.window_width,
            smallest_split,
            params.duplicate_detection_multiplier,
        );
        Ok(Self {
            params,
            extractor,
            resolver,
        })
    }

    /// The validated parameters
    pub fn params(&self) -> &WaveletPeakParams {
        &self.params
    }

    pub fn extractor(&self) -> &WindowPeakExtractor {
        &self.extractor
    }

    /// Classify one window and extract its peaks if it is not noise
    pub fn process_window(&self, window: &Window, ppm: &[f64], sample: SampleId) -> WindowOutcome {
        if is_noise(window.unpadded(), self.params.baseline_threshold) {
            return WindowOutcome::Noise;
        }
        let outcome = self.extractor.extract_outcome(window, ppm, sample);
        if let WindowOutcome::Failed(err) = &outcome {
            debug!(
                "Peak extraction failed for sample {sample} in window {}..{}: {err}",
                window.start_index(),
                window.end_index()
            );
        }
        outcome
    }

    /// Detect the peaks of the sample at row `sample_index`, over every window
    /// of every split factor
    pub fn detect_sample(
        &self,
        spectra: &SpectrumMatrix,
        sample_index: usize,
    ) -> Result<Vec<DetectedPeak>, PeakDetectionError> {
        if sample_index >= spectra.n_samples() {
            return Err(PeakDetectionError::SampleOutOfRange(sample_index));
        }
        let sample = sample_index as SampleId + 1;
        let spectrum = spectra.row(sample_index);
        let ppm = spectra.ppm_row(sample_index);

        let mut n_windows = 0usize;
        let mut n_noise = 0usize;
        let mut rows = Vec::new();
        for split in self.params.window_splits.iter().copied() {
            for window in Windower::new(sample_index, spectrum, self.params.window_width, split) {
                n_windows += 1;
                match self.process_window(&window, ppm, sample) {
                    WindowOutcome::Peaks(peaks) => rows.extend(peaks),
                    WindowOutcome::Noise => n_noise += 1,
                    WindowOutcome::Failed(_) => {}
                }
            }
        }
        let peaks = aggregate_sample_peaks(rows, self.params.baseline_threshold);
        debug!(
            "Sample {sample}: {} peaks from {n_windows} windows ({n_noise} noise)",
            peaks.len()
        );
        Ok(peaks)
    }

    pub fn detect(&self, spectra: &SpectrumMatrix) -> Result<PeakTable, PeakDetectionError> {
        self.detect_with_progress(spectra, &NoProgress)
    }

    /// Detect the peaks of every sample, reporting each completed sample to
    /// `progress`.
    ///
    /// The result is sorted by sample and then index, and does not depend on
    /// the number of workers.
    pub fn detect_with_progress<P: ProgressObserver + ?Sized>(
        &self,
        spectra: &SpectrumMatrix,
        progress: &P,
    ) -> Result<PeakTable, PeakDetectionError> {
        let n_samples = spectra.n_samples();
        let workers = self.params.concurrency.resolve(n_samples);
        info!(
            "Detecting peaks in {n_samples} samples of {} points with {workers} workers",
            spectra.n_points()
        );

        let counter = ProgressCounter::new(n_samples, progress);
        let samples: Vec<usize> = (0..n_samples).collect();
        let per_sample = parallel_map(&samples, workers, |i| {
            let peaks = self.detect_sample(spectra, *i)?;
            counter.tick();
            Ok(peaks)
        })?;
        let peaks: Vec<DetectedPeak> = per_sample.into_iter().flatten().collect();
        debug!("Found {} peaks before duplicate resolution", peaks.len());

        let span_workers = self.params.concurrency.resolve(usize::MAX);
        let mut peaks = self.resolver.resolve(peaks, spectra.n_points(), span_workers)?;
        peaks.sort_by_key(|p| (p.sample, p.index));
        info!("Detected {} peaks", peaks.len());
        Ok(PeakTable::new(peaks))
    }

    /// Detect peaks and report them under the caller's sample labels, one
    /// label per row of `spectra`
    pub fn detect_labeled<L: Clone + Eq + Hash>(
        &self,
        spectra: &SpectrumMatrix,
        labels: &SampleLabels<L>,
    ) -> Result<PeakTable<L>, PeakDetectionError> {
        labels.check_count(spectra.n_samples())?;
        let table = self.detect(spectra)?;
        Ok(table.relabel(labels)?)
    }
}

/// Build a spectrum matrix from `intensities` and `ppm` and detect its peaks
/// with `params`
pub fn detect_peaks(
    intensities: Vec<Vec<f64>>,
    ppm: impl Into<PpmAxis>,
    params: &WaveletPeakParams,
) -> Result<PeakTable, PeakDetectionError> {
    let spectra = SpectrumMatrix::new(intensities, ppm)?;
    let detector = WaveletPeakDetector::new(params)?;
    detector.detect(&spectra)
}
