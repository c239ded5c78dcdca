pub use crate::labels::SampleLabels;
pub use crate::parallel::ProgressObserver;
pub use crate::peak::{ChemicalShift, DetectedPeak};
pub use crate::peak_picker::{Concurrency, WaveletPeakDetector, WaveletPeakParams};
pub use crate::spectrum::{PpmAxis, SpectrumMatrix};
pub use crate::table::PeakTable;
pub use crate::window::WindowWidth;
pub use mzpeaks::{CoordinateLike, IndexedCoordinate, IntensityMeasurement};
