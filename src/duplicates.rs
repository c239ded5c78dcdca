//! Merge near-duplicate peaks produced by overlapping windows.
//!
//! Windows at different offsets may each detect the same peak a few points
//! apart. The resolver lays down the window grid of the smallest split factor
//! and, inside the span of every pair of adjacent windows, removes the smaller
//! of any two peaks of the same sample lying within the merge distance of each
//! other. The span tasks are independent and their deletions are unioned.
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use log::{debug, trace};

use crate::parallel::parallel_map;
use crate::peak::{shift_distance, DetectedPeak, SampleId};
use crate::peak_picker::PeakDetectionError;
use crate::window::{window_spans, WindowWidth};

/// Peaks of one sample closer than this many ppm are duplicates, before
/// scaling by the duplicate detection multiplier
pub const DUPLICATE_DISTANCE_PPM: f64 = 0.005;

/// Identifies a peak within the dataset-wide table
pub type PeakKey = (SampleId, u32);

fn key_of(peak: &DetectedPeak) -> PeakKey {
    (peak.sample, peak.index)
}

/// Of two duplicate peaks, the one to delete. The larger value survives and
/// equal values keep the lower index.
fn loser<'a>(a: &'a DetectedPeak, b: &'a DetectedPeak) -> &'a DetectedPeak {
    match a.value.total_cmp(&b.value) {
        std::cmp::Ordering::Greater => b,
        std::cmp::Ordering::Less => a,
        std::cmp::Ordering::Equal => {
            if a.index <= b.index {
                b
            } else {
                a
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateResolver {
    width: usize,
    split: usize,
    multiplier: f64,
}

impl DuplicateResolver {
    /// `split` should be the smallest configured split factor, which gives the
    /// coarsest window grid
    pub fn new(width: WindowWidth, split: usize, multiplier: f64) -> Self {
        Self {
            width: width.points(),
            split,
            multiplier,
        }
    }

    pub fn merge_distance(&self) -> f64 {
        DUPLICATE_DISTANCE_PPM * self.multiplier
    }

    /// The 0-based column ranges covered by each pair of adjacent windows. A
    /// grid of a single window yields that window's range.
    pub fn spans(&self, n_points: usize) -> Vec<Range<usize>> {
        let grid = window_spans(n_points, self.width, self.split);
        if grid.len() < 2 {
            grid.iter().map(|w| w.range()).collect()
        } else {
            grid.windows(2)
                .map(|pair| pair[0].start_index..pair[1].end_index)
                .collect()
        }
    }

    /// Find the peaks to delete inside `span`. `peaks` must be sorted by index.
    pub fn duplicates_in_span(&self, peaks: &[DetectedPeak], span: &Range<usize>) -> Vec<PeakKey> {
        let lo = peaks.partition_point(|p| p.offset() < span.start);
        let hi = peaks.partition_point(|p| p.offset() < span.end);
        let distance = self.merge_distance();

        let mut by_sample: BTreeMap<SampleId, Vec<&DetectedPeak>> = BTreeMap::new();
        for peak in peaks[lo..hi].iter() {
            by_sample.entry(peak.sample).or_default().push(peak);
        }

        let mut deletions = Vec::new();
        for members in by_sample.values() {
            for (i, a) in members.iter().enumerate() {
                for b in members[i + 1..].iter() {
                    if shift_distance(*a, *b) <= distance {
                        let dropped = loser(a, b);
                        if log::log_enabled!(log::Level::Trace) {
                            trace!(
                                "Sample {}: peaks at {} and {} are {:.5} ppm apart, dropping {}",
                                a.sample,
                                a.index,
                                b.index,
                                shift_distance(*a, *b),
                                dropped.index
                            );
                        }
                        deletions.push(key_of(dropped));
                    }
                }
            }
        }
        deletions
    }

    /// Remove near-duplicate peaks from the dataset-wide table of a spectrum
    /// matrix with `n_points` columns, spreading the spans over `workers`
    /// threads. The result is sorted by index, then sample.
    pub fn resolve(
        &self,
        mut peaks: Vec<DetectedPeak>,
        n_points: usize,
        workers: usize,
    ) -> Result<Vec<DetectedPeak>, PeakDetectionError> {
        peaks.sort_by_key(|p| (p.index, p.sample));
        let spans = self.spans(n_points);
        let table = peaks.as_slice();
        let deletions: BTreeSet<PeakKey> =
            parallel_map(&spans, workers, |span| Ok(self.duplicates_in_span(table, span)))?
                .into_iter()
                .flatten()
                .collect();
        debug!(
            "Removing {} duplicate peaks from {} across {} spans",
            deletions.len(),
            peaks.len(),
            spans.len()
        );
        peaks.retain(|p| !deletions.contains(&key_of(p)));
        Ok(peaks)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::test_data::ppm_axis_with_step;

    fn resolver() -> DuplicateResolver {
        DuplicateResolver::new(WindowWidth::Small, 4, 1.0)
    }

    fn peak_at(ppm: &[f64], index: u32, value: f64, sample: SampleId) -> DetectedPeak {
        DetectedPeak::new(index, ppm[index as usize - 1], value, 10.0, 5, sample)
    }

    #[test]
    fn test_spans() {
        let spans = resolver().spans(2048);
        assert_eq!(spans.len(), 12);
        assert_eq!(spans[0], 0..640);
        assert_eq!(spans.last(), Some(&(1408..2048)));
        assert_eq!(resolver().spans(300), vec![0..300]);
        assert!(resolver().spans(0).is_empty());
    }

    #[test_log::test]
    fn test_overlapping_windows_duplicate() {
        // Two windows report the same peak three points apart, 0.002 ppm
        let ppm = ppm_axis_with_step(2048, 0.002 / 3.0);
        let peaks = vec![
            peak_at(&ppm, 510, 2800.0, 1),
            peak_at(&ppm, 513, 3100.0, 1),
        ];
        assert!((peaks[0].ppm - peaks[1].ppm - 0.002).abs() < 1e-9);
        let kept = resolver().resolve(peaks, 2048, 2).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].index, 513);
        assert_eq!(kept[0].value, 3100.0);
    }

    #[test]
    fn test_samples_are_independent() {
        let ppm = ppm_axis_with_step(2048, 0.001);
        let peaks = vec![
            peak_at(&ppm, 700, 2000.0, 1),
            peak_at(&ppm, 701, 1500.0, 2),
            peak_at(&ppm, 900, 1500.0, 1),
        ];
        let kept = resolver().resolve(peaks.clone(), 2048, 1).unwrap();
        assert_eq!(kept.len(), 3);

        let narrow = DuplicateResolver::new(WindowWidth::Small, 4, 0.1);
        let close = vec![peak_at(&ppm, 700, 2000.0, 1), peak_at(&ppm, 701, 1500.0, 1)];
        assert_eq!(narrow.resolve(close.clone(), 2048, 1).unwrap().len(), 2);
        assert_eq!(resolver().resolve(close, 2048, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_equal_values_keep_lower_index() {
        let ppm = ppm_axis_with_step(2048, 0.001);
        let peaks = vec![
            peak_at(&ppm, 1201, 1500.0, 3),
            peak_at(&ppm, 1200, 1500.0, 3),
        ];
        let kept = resolver().resolve(peaks, 2048, 1).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].index, 1200);
    }

    #[test]
    fn test_single_window_grid() {
        let ppm = ppm_axis_with_step(300, 0.001);
        let peaks = vec![peak_at(&ppm, 150, 1500.0, 1), peak_at(&ppm, 152, 1800.0, 1)];
        let kept = resolver().resolve(peaks, 300, 1).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].index, 152);
    }

    #[test]
    fn test_worker_count_invariance() {
        let ppm = ppm_axis_with_step(4096, 0.0015);
        let peaks: Vec<DetectedPeak> = (0..400u32)
            .map(|i| {
                let index = 5 + i * 10 + (i % 3);
                peak_at(&ppm, index, 1000.0 + ((i * 37) % 11) as f64 * 100.0, 1 + i % 4)
            })
            .collect();
        let one = resolver().resolve(peaks.clone(), 4096, 1).unwrap();
        let many = resolver().resolve(peaks, 4096, 6).unwrap();
        assert_eq!(one, many);
    }
}
