//! Run independent tasks over a bounded worker pool and report progress.
use std::sync::Mutex;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::peak_picker::PeakDetectionError;

/// Receives the number of completed samples while peaks are detected.
///
/// Calls are serialized, and `completed` increases by one with every call.
pub trait ProgressObserver: Sync {
    fn samples_completed(&self, completed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Sync,
{
    fn samples_completed(&self, completed: usize, total: usize) {
        (self)(completed, total)
    }
}

/// A [`ProgressObserver`] that ignores all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn samples_completed(&self, _completed: usize, _total: usize) {}
}

/// Counts completed tasks on behalf of a [`ProgressObserver`]
pub(crate) struct ProgressCounter<'a, P: ProgressObserver + ?Sized> {
    completed: Mutex<usize>,
    total: usize,
    observer: &'a P,
}

impl<'a, P: ProgressObserver + ?Sized> ProgressCounter<'a, P> {
    pub(crate) fn new(total: usize, observer: &'a P) -> Self {
        Self {
            completed: Mutex::new(0),
            total,
            observer,
        }
    }

    pub(crate) fn tick(&self) {
        let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
        *completed += 1;
        self.observer.samples_completed(*completed, self.total);
    }
}

fn sequential_map<T, R, F>(items: &[T], f: F) -> Result<Vec<R>, PeakDetectionError>
where
    F: Fn(&T) -> Result<R, PeakDetectionError>,
{
    items.iter().map(f).collect()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallelism")] {
        /// Apply `f` to every item on a pool of `workers` threads, returning the
        /// results in item order or the first error.
        ///
        /// The pool lives only as long as this call.
        pub(crate) fn parallel_map<T, R, F>(
            items: &[T],
            workers: usize,
            f: F,
        ) -> Result<Vec<R>, PeakDetectionError>
        where
            T: Sync,
            R: Send,
            F: Fn(&T) -> Result<R, PeakDetectionError> + Sync,
        {
            let workers = workers.min(items.len());
            if workers <= 1 {
                return sequential_map(items, f);
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("nmrsignal-worker-{i}"))
                .build()?;
            pool.install(|| items.par_iter().map(|item| f(item)).collect())
        }
    } else {
        pub(crate) fn parallel_map<T, R, F>(
            items: &[T],
            _workers: usize,
            f: F,
        ) -> Result<Vec<R>, PeakDetectionError>
        where
            F: Fn(&T) -> Result<R, PeakDetectionError>,
        {
            sequential_map(items, f)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parallel_map_preserves_order() {
        let items: Vec<usize> = (0..100).collect();
        for workers in [1, 2, 8] {
            let squares = parallel_map(&items, workers, |i| Ok(i * i)).unwrap();
            assert_eq!(squares, items.iter().map(|i| i * i).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_parallel_map_error() {
        let items: Vec<usize> = (0..10).collect();
        let result = parallel_map(&items, 4, |i| {
            if *i == 7 {
                Err(PeakDetectionError::SampleOutOfRange(*i))
            } else {
                Ok(*i)
            }
        });
        assert!(matches!(result, Err(PeakDetectionError::SampleOutOfRange(7))));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let seen = Mutex::new(Vec::new());
        let observer = |completed: usize, total: usize| {
            assert_eq!(total, 32);
            seen.lock().unwrap().push(completed);
        };
        let counter = ProgressCounter::new(32, &observer);
        let items: Vec<usize> = (0..32).collect();
        parallel_map(&items, 4, |_| {
            counter.tick();
            Ok(())
        })
        .unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, (1..=32).collect::<Vec<_>>());
    }
}
