//! The input intensity matrix and its chemical shift axis.
//!
//! A [`SpectrumMatrix`] is validated once on construction. Structural problems
//! (ragged rows, mismatched dimensions, missing intensities) are fatal, while
//! missing ppm coordinates are repaired by dropping the affected columns from
//! both the intensity and the ppm data.
use log::{debug, warn};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All the ways a spectrum matrix can be rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    #[error("The spectrum matrix contains no samples")]
    NoSamples,
    #[error("Sample {row} has {found} points, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("The intensity matrix has {intensity_points} points per sample but the ppm axis has {ppm_points}")]
    DimensionMismatch {
        intensity_points: usize,
        ppm_points: usize,
    },
    #[error("The ppm matrix has {ppm_rows} rows but there are {samples} samples")]
    PpmRowMismatch { ppm_rows: usize, samples: usize },
    #[error("Missing intensity value in sample {sample} at point {point}")]
    MissingIntensity { sample: usize, point: usize },
    #[error("The ppm axis has no usable coordinates")]
    EmptyPpmAxis,
}

/// The chemical shift coordinates paired with a [`SpectrumMatrix`]. Missing
/// coordinates are encoded as `NaN`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PpmAxis {
    /// One axis shared by every sample
    Shared(Vec<f64>),
    /// One axis per sample, in row order
    PerSample(Vec<Vec<f64>>),
}

impl PpmAxis {
    fn rows(&self) -> Vec<&[f64]> {
        match self {
            Self::Shared(axis) => vec![axis.as_slice()],
            Self::PerSample(rows) => rows.iter().map(|r| r.as_slice()).collect(),
        }
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        let filter = |row: &mut Vec<f64>| {
            let mut it = keep.iter();
            row.retain(|_| *it.next().unwrap_or(&true));
        };
        match self {
            Self::Shared(axis) => filter(axis),
            Self::PerSample(rows) => rows.iter_mut().for_each(filter),
        }
    }
}

impl From<Vec<f64>> for PpmAxis {
    fn from(value: Vec<f64>) -> Self {
        Self::Shared(value)
    }
}

/// A validated samples-by-points intensity grid paired with its ppm axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumMatrix {
    intensities: Vec<f64>,
    n_samples: usize,
    n_points: usize,
    ppm: PpmAxis,
}

impl SpectrumMatrix {
    /// Validate and, where possible, repair a spectrum matrix.
    ///
    /// # Errors
    /// Ragged rows, a ppm axis whose length or row count does not match the
    /// intensities, and any missing (`NaN` or infinite) intensity are fatal.
    /// Columns whose ppm coordinate is missing are dropped with a warning.
    pub fn new(rows: Vec<Vec<f64>>, ppm: impl Into<PpmAxis>) -> Result<Self, SpectrumError> {
        let mut ppm = ppm.into();
        let n_samples = rows.len();
        let n_points = match rows.first() {
            Some(row) => row.len(),
            None => return Err(SpectrumError::NoSamples),
        };
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_points {
                return Err(SpectrumError::RaggedRows {
                    row,
                    expected: n_points,
                    found: values.len(),
                });
            }
        }

        if let PpmAxis::PerSample(ppm_rows) = &mut ppm {
            if ppm_rows.len() == 1 && n_samples > 1 {
                warn!(
                    "A single ppm row was given for {n_samples} samples, sharing it across all samples"
                );
                ppm = PpmAxis::Shared(ppm_rows.swap_remove(0));
            } else if ppm_rows.len() != n_samples {
                return Err(SpectrumError::PpmRowMismatch {
                    ppm_rows: ppm_rows.len(),
                    samples: n_samples,
                });
            }
        }

        for axis in ppm.rows() {
            if axis.len() != n_points {
                return Err(SpectrumError::DimensionMismatch {
                    intensity_points: n_points,
                    ppm_points: axis.len(),
                });
            }
        }

        let keep: Vec<bool> = {
            let axes = ppm.rows();
            (0..n_points)
                .map(|j| axes.iter().all(|axis| !axis[j].is_nan()))
                .collect()
        };
        let n_kept = keep.iter().filter(|k| **k).count();
        if n_kept == 0 {
            return Err(SpectrumError::EmptyPpmAxis);
        }

        // Columns about to be dropped must not hide a missing intensity
        for (sample, values) in rows.iter().enumerate() {
            if let Some(point) = values.iter().position(|v| !v.is_finite()) {
                return Err(SpectrumError::MissingIntensity { sample, point });
            }
        }

        let mut intensities = Vec::with_capacity(n_samples * n_kept);
        for values in rows.into_iter() {
            intensities.extend(
                values
                    .into_iter()
                    .zip(keep.iter())
                    .filter_map(|(value, &kept)| kept.then_some(value)),
            );
        }

        if n_kept < n_points {
            warn!(
                "Dropping {} columns with missing ppm coordinates, {} points remain",
                n_points - n_kept,
                n_kept
            );
            ppm.retain_columns(&keep);
        }
        debug!("Built a spectrum matrix with {n_samples} samples and {n_kept} points");

        Ok(Self {
            intensities,
            n_samples,
            n_points: n_kept,
            ppm,
        })
    }

    /// Build a one-sample matrix from a single spectrum
    pub fn from_spectrum(intensity: Vec<f64>, ppm: Vec<f64>) -> Result<Self, SpectrumError> {
        Self::new(vec![intensity], PpmAxis::Shared(ppm))
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn ppm_axis(&self) -> &PpmAxis {
        &self.ppm
    }

    /// The intensities of the sample at row `sample`
    pub fn row(&self, sample: usize) -> &[f64] {
        let start = sample * self.n_points;
        &self.intensities[start..start + self.n_points]
    }

    /// The ppm coordinates of the sample at row `sample`
    pub fn ppm_row(&self, sample: usize) -> &[f64] {
        match &self.ppm {
            PpmAxis::Shared(axis) => axis,
            PpmAxis::PerSample(rows) => &rows[sample],
        }
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.intensities.chunks(self.n_points.max(1))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn axis(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 - i as f64 * 0.01).collect()
    }

    #[test_log::test]
    fn test_missing_ppm_columns_are_dropped() {
        let mut ppm = axis(8);
        ppm[2] = f64::NAN;
        ppm[5] = f64::NAN;
        let rows = vec![(0..8).map(|i| i as f64).collect(), vec![1.0; 8]];
        let spectra = SpectrumMatrix::new(rows, ppm).unwrap();
        assert_eq!(spectra.n_points(), 6);
        assert_eq!(spectra.row(0), &[0.0, 1.0, 3.0, 4.0, 6.0, 7.0]);
        assert_eq!(spectra.ppm_row(1).len(), 6);
        assert!(spectra.ppm_row(0).iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_missing_intensity_is_fatal() {
        let mut row: Vec<f64> = vec![1.0; 8];
        row[3] = f64::NAN;
        let err = SpectrumMatrix::new(vec![vec![1.0; 8], row], axis(8)).unwrap_err();
        assert_eq!(err, SpectrumError::MissingIntensity { sample: 1, point: 3 });
    }

    #[test]
    fn test_missing_intensity_in_dropped_column_is_fatal() {
        let mut ppm = axis(8);
        ppm[5] = f64::NAN;
        let mut row: Vec<f64> = vec![1.0; 8];
        row[5] = f64::NAN;
        let err = SpectrumMatrix::new(vec![vec![1.0; 8], row], ppm).unwrap_err();
        assert_eq!(err, SpectrumError::MissingIntensity { sample: 1, point: 5 });
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = SpectrumMatrix::new(vec![vec![1.0; 8]], axis(7)).unwrap_err();
        assert_eq!(
            err,
            SpectrumError::DimensionMismatch {
                intensity_points: 8,
                ppm_points: 7
            }
        );
        let err = SpectrumMatrix::new(vec![vec![1.0; 8], vec![1.0; 6]], axis(8)).unwrap_err();
        assert!(matches!(err, SpectrumError::RaggedRows { row: 1, .. }));
    }

    #[test_log::test]
    fn test_per_sample_ppm() {
        let rows = vec![vec![1.0; 4], vec![2.0; 4]];
        let single = PpmAxis::PerSample(vec![axis(4)]);
        let spectra = SpectrumMatrix::new(rows.clone(), single).unwrap();
        assert_eq!(spectra.ppm_axis(), &PpmAxis::Shared(axis(4)));

        let shifted: Vec<f64> = axis(4).into_iter().map(|v| v + 0.5).collect();
        let spectra =
            SpectrumMatrix::new(rows.clone(), PpmAxis::PerSample(vec![axis(4), shifted.clone()]))
                .unwrap();
        assert_eq!(spectra.ppm_row(1), shifted.as_slice());

        let err = SpectrumMatrix::new(
            vec![vec![1.0; 4], vec![2.0; 4], vec![3.0; 4]],
            PpmAxis::PerSample(vec![axis(4), axis(4)]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SpectrumError::PpmRowMismatch {
                ppm_rows: 2,
                samples: 3
            }
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(
            SpectrumMatrix::new(Vec::new(), axis(3)).unwrap_err(),
            SpectrumError::NoSamples
        );
        assert_eq!(
            SpectrumMatrix::from_spectrum(vec![1.0, 2.0], vec![f64::NAN, f64::NAN]).unwrap_err(),
            SpectrumError::EmptyPpmAxis
        );
    }
}
