//! Summary statistics over intensity slices.
use num_traits::{Float, ToPrimitive};

/// Linearly interpolated percentile of `values`, which must already be sorted
/// in ascending order. `percent` is a fraction in `[0, 1]`.
pub fn percentile<T: Float + ToPrimitive>(values: &[T], percent: f64) -> T {
    if values.is_empty() {
        return T::nan();
    }
    let k = (values.len() - 1) as f64 * percent;
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return values[k as usize];
    }
    let d0 = values[f as usize] * T::from(c - k).unwrap_or_else(T::zero);
    let d1 = values[c as usize] * T::from(k - f).unwrap_or_else(T::zero);
    d0 + d1
}

/// Sort a copy of `values` and take its [`percentile`]
pub fn percentile_of<T: Float + ToPrimitive>(values: &[T], percent: f64) -> T {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile(&sorted, percent)
}

pub fn median<T: Float + ToPrimitive>(values: &[T]) -> T {
    percentile_of(values, 0.5)
}

pub fn mean<T: Float>(values: &[T]) -> T {
    if values.is_empty() {
        return T::nan();
    }
    let total = values.iter().fold(T::zero(), |acc, v| acc + *v);
    total / T::from(values.len()).unwrap_or_else(T::one)
}

pub fn minmax<T: Float>(values: &[T]) -> (T, T) {
    let mut max = -T::infinity();
    let mut min = T::infinity();

    for v in values.iter() {
        if *v > max {
            max = *v;
        }
        if *v < min {
            min = *v
        }
    }
    (min, max)
}
