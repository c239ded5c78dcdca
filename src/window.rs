//! Partition a spectrum into overlapping fixed-length windows.
//!
//! Windows advance by `width / split` points. The last window is aligned to the
//! end of the spectrum so every point is covered, and spectra shorter than one
//! window are zero-padded symmetrically.
use std::ops::Range;

use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The split factors a window may be divided into
pub const WINDOW_SPLITS: [usize; 5] = [2, 4, 16, 32, 64];

/// The split factor used when a configured one is not in [`WINDOW_SPLITS`]
pub const DEFAULT_WINDOW_SPLIT: usize = 4;

/// The length of a detection window in points
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowWidth {
    /// 512 points
    #[default]
    Small,
    /// 1024 points
    Large,
}

impl WindowWidth {
    pub const fn points(&self) -> usize {
        match self {
            Self::Small => 512,
            Self::Large => 1024,
        }
    }
}

/// Check `split` against [`WINDOW_SPLITS`], substituting [`DEFAULT_WINDOW_SPLIT`]
/// with a warning when it is not one of them
pub fn validate_window_split(split: usize) -> usize {
    if WINDOW_SPLITS.contains(&split) {
        split
    } else {
        warn!(
            "Window split {split} is not one of {WINDOW_SPLITS:?}, using {DEFAULT_WINDOW_SPLIT}"
        );
        DEFAULT_WINDOW_SPLIT
    }
}

/// The placement of one window over a spectrum, without its signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    /// The first spectrum point covered, inclusive
    pub start_index: usize,
    /// The last spectrum point covered, exclusive
    pub end_index: usize,
    /// Zeros added before the spectrum signal
    pub pad_left: usize,
    /// Zeros added after the spectrum signal
    pub pad_right: usize,
}

impl WindowSpan {
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The length of the window signal including padding
    pub fn padded_len(&self) -> usize {
        self.pad_left + self.len() + self.pad_right
    }

    /// Translate a position in the padded window signal into a 0-based
    /// spectrum offset, or `None` if it falls in the padding
    pub fn to_spectrum_offset(&self, local_index: usize) -> Option<usize> {
        let offset = local_index.checked_sub(self.pad_left)?;
        if offset < self.len() {
            Some(self.start_index + offset)
        } else {
            None
        }
    }
}

/// Compute the window placements covering a spectrum of `length` points.
pub fn window_spans(length: usize, width: usize, split: usize) -> Vec<WindowSpan> {
    if length == 0 {
        return Vec::new();
    }
    if length < width {
        let pad_left = (width - length) / 2;
        return vec![WindowSpan {
            start_index: 0,
            end_index: length,
            pad_left,
            pad_right: width - length - pad_left,
        }];
    }

    let stride = (width / split.max(1)).max(1);
    let shifts = (length as isize - width as isize) / stride as isize;
    if shifts <= 0 {
        return vec![WindowSpan {
            start_index: 0,
            end_index: length,
            pad_left: 0,
            pad_right: 0,
        }];
    }

    let mut spans: Vec<WindowSpan> = (0..=shifts as usize)
        .map(|i| WindowSpan {
            start_index: i * stride,
            end_index: i * stride + width,
            pad_left: 0,
            pad_right: 0,
        })
        .collect();
    if spans.last().map(|s| s.end_index) != Some(length) {
        spans.push(WindowSpan {
            start_index: length - width,
            end_index: length,
            pad_left: 0,
            pad_right: 0,
        });
    }
    spans
}

/// A window over one sample's spectrum, holding its (possibly padded) signal.
#[derive(Debug, Clone)]
pub struct Window {
    /// The 0-based row of the sample this window was cut from
    pub sample_index: usize,
    pub span: WindowSpan,
    pub signal: Vec<f64>,
}

impl Window {
    pub fn new(sample_index: usize, spectrum: &[f64], span: WindowSpan) -> Self {
        let mut signal = Vec::with_capacity(span.padded_len());
        signal.resize(span.pad_left, 0.0);
        signal.extend_from_slice(&spectrum[span.range()]);
        signal.resize(span.padded_len(), 0.0);
        Self {
            sample_index,
            span,
            signal,
        }
    }

    /// The signal without the zero padding
    pub fn unpadded(&self) -> &[f64] {
        &self.signal[self.span.pad_left..self.span.pad_left + self.span.len()]
    }

    pub fn start_index(&self) -> usize {
        self.span.start_index
    }

    pub fn end_index(&self) -> usize {
        self.span.end_index
    }
}

/// Yields each [`Window`] of one sample's spectrum in order
pub struct Windower<'a> {
    sample_index: usize,
    spectrum: &'a [f64],
    spans: std::vec::IntoIter<WindowSpan>,
}

impl<'a> Windower<'a> {
    pub fn new(sample_index: usize, spectrum: &'a [f64], width: WindowWidth, split: usize) -> Self {
        let spans = window_spans(spectrum.len(), width.points(), split);
        Self {
            sample_index,
            spectrum,
            spans: spans.into_iter(),
        }
    }
}

impl Iterator for Windower<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        self.spans
            .next()
            .map(|span| Window::new(self.sample_index, self.spectrum, span))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.spans.size_hint()
    }
}
