//! A bijection between caller-supplied sample labels and the dense sample ids
//! used while detecting peaks.
use std::collections::HashMap;
use std::hash::Hash;

use thiserror::Error;

use crate::peak::SampleId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("{labels} sample labels were given for {samples} samples")]
    CountMismatch { labels: usize, samples: usize },
    #[error("The sample labels at positions {first} and {second} are the same")]
    DuplicateLabel { first: usize, second: usize },
    #[error("Sample id {0} has no label")]
    UnknownSample(SampleId),
}

/// Maps the label of every row of a spectrum matrix to the sample id
/// `1..=n` of that row, and back.
#[derive(Debug, Clone)]
pub struct SampleLabels<L> {
    labels: Vec<L>,
    ids: HashMap<L, SampleId>,
}

impl<L: Clone + Eq + Hash> SampleLabels<L> {
    /// Build the mapping from one label per row, in row order.
    ///
    /// # Errors
    /// Labels must be distinct, otherwise the mapping would not be invertible.
    pub fn new(labels: Vec<L>) -> Result<Self, LabelError> {
        let mut ids = HashMap::with_capacity(labels.len());
        for (position, label) in labels.iter().enumerate() {
            if let Some(previous) = ids.insert(label.clone(), position as SampleId + 1) {
                return Err(LabelError::DuplicateLabel {
                    first: previous as usize - 1,
                    second: position,
                });
            }
        }
        Ok(Self { labels, ids })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn id_of(&self, label: &L) -> Option<SampleId> {
        self.ids.get(label).copied()
    }

    pub fn label_of(&self, id: SampleId) -> Option<&L> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.labels.get(i))
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Require exactly one label per sample
    pub fn check_count(&self, samples: usize) -> Result<(), LabelError> {
        if self.len() != samples {
            Err(LabelError::CountMismatch {
                labels: self.len(),
                samples,
            })
        } else {
            Ok(())
        }
    }
}
