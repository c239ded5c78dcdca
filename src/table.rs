//! The table of peaks produced by the detector.
use std::hash::Hash;
use std::ops::Index;

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::labels::{LabelError, SampleLabels};
use crate::peak::{DetectedPeak, SampleId};

/// Every peak detected across a spectrum matrix, ordered by sample and then by
/// spectrum position.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakTable<S = SampleId> {
    peaks: Vec<DetectedPeak<S>>,
}

impl<S> PeakTable<S> {
    pub fn new(peaks: Vec<DetectedPeak<S>>) -> Self {
        Self { peaks }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectedPeak<S>> {
        self.peaks.iter()
    }

    pub fn as_slice(&self) -> &[DetectedPeak<S>] {
        &self.peaks
    }

    pub fn into_inner(self) -> Vec<DetectedPeak<S>> {
        self.peaks
    }
}

impl<S: PartialEq> PeakTable<S> {
    /// The peaks of one sample
    pub fn for_sample<'a>(&'a self, sample: &'a S) -> impl Iterator<Item = &'a DetectedPeak<S>> + 'a {
        self.peaks.iter().filter(move |p| p.sample == *sample)
    }
}

impl<S: Clone + PartialEq> PeakTable<S> {
    /// The number of peaks of each sample, in the order samples first appear
    pub fn sample_counts(&self) -> Vec<(S, usize)> {
        let mut counts: Vec<(S, usize)> = Vec::new();
        for peak in self.peaks.iter() {
            match counts.iter_mut().find(|(s, _)| *s == peak.sample) {
                Some((_, n)) => *n += 1,
                None => counts.push((peak.sample.clone(), 1)),
            }
        }
        counts
    }
}

impl PeakTable<SampleId> {
    /// Restore the caller's sample labels
    pub fn relabel<L: Clone + Eq + Hash>(
        self,
        labels: &SampleLabels<L>,
    ) -> Result<PeakTable<L>, LabelError> {
        debug!("Relabeling {} peaks over {} samples", self.len(), labels.len());
        let peaks = self
            .peaks
            .into_iter()
            .map(|peak| {
                let label = labels
                    .label_of(peak.sample)
                    .cloned()
                    .ok_or(LabelError::UnknownSample(peak.sample))?;
                Ok(peak.map_sample(|_| label))
            })
            .collect::<Result<Vec<_>, LabelError>>()?;
        Ok(PeakTable::new(peaks))
    }
}

impl<S> Index<usize> for PeakTable<S> {
    type Output = DetectedPeak<S>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.peaks[index]
    }
}

impl<S> FromIterator<DetectedPeak<S>> for PeakTable<S> {
    fn from_iter<T: IntoIterator<Item = DetectedPeak<S>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<S> IntoIterator for PeakTable<S> {
    type Item = DetectedPeak<S>;
    type IntoIter = std::vec::IntoIter<DetectedPeak<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.into_iter()
    }
}

impl<'a, S> IntoIterator for &'a PeakTable<S> {
    type Item = &'a DetectedPeak<S>;
    type IntoIter = std::slice::Iter<'a, DetectedPeak<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> PeakTable {
        PeakTable::new(vec![
            DetectedPeak::new(10, 9.9, 1500.0, 5.0, 3, 1),
            DetectedPeak::new(40, 9.6, 2500.0, 8.0, 5, 1),
            DetectedPeak::new(12, 9.88, 1800.0, 6.0, 3, 2),
        ])
    }

    #[test]
    fn test_queries() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.for_sample(&1).count(), 2);
        assert_eq!(table.sample_counts(), vec![(1, 2), (2, 1)]);
        assert_eq!(table[2].index, 12);
    }

    #[test]
    fn test_relabel() {
        let labels = SampleLabels::new(vec!["a".to_string(), "b".to_string()]).unwrap();
        let relabeled = table().relabel(&labels).unwrap();
        let samples: Vec<&str> = relabeled.iter().map(|p| p.sample.as_str()).collect();
        assert_eq!(samples, vec!["a", "a", "b"]);

        let short = SampleLabels::new(vec!["a".to_string()]).unwrap();
        assert_eq!(
            table().relabel(&short).unwrap_err(),
            LabelError::UnknownSample(2)
        );
    }

    #[test]
    fn test_relabel_integer_labels() {
        let labels = SampleLabels::new(vec![7u32, 3]).unwrap();
        let relabeled = table().relabel(&labels).unwrap();
        let samples: Vec<u32> = relabeled.iter().map(|p| p.sample).collect();
        assert_eq!(samples, vec![7, 7, 3]);

        let positions = SampleLabels::new(vec![1u32, 2]).unwrap();
        assert_eq!(table().relabel(&positions).unwrap(), table());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() {
        let table = table();
        let text = serde_json::to_string(&table).unwrap();
        let dup: PeakTable = serde_json::from_str(&text).unwrap();
        assert_eq!(table, dup);
    }
}
