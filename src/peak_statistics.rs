use num_traits::{Float, FromPrimitive};

pub fn _isclose<T>(x: T, y: T, rtol: T, atol: T) -> bool
where
    T: Float,
{
    (x - y).abs() <= (atol + rtol * y.abs())
}

pub fn isclose<T>(x: T, y: T) -> bool
where
    T: Float + FromPrimitive,
{
    match (T::from_f64(1e-5), T::from_f64(1e-8)) {
        (Some(rtol), Some(atol)) => _isclose(x, y, rtol, atol),
        _ => x == y,
    }
}

pub fn aboutzero<T>(x: T) -> bool
where
    T: Float + FromPrimitive,
{
    isclose(x, T::zero())
}

/// Find the most intense point of `intensity_array` within `radius` points of
/// `index`. Ties resolve to the point closest to `index`, then the leftmost.
pub fn local_apex<T: Float>(intensity_array: &[T], index: usize, radius: usize) -> usize {
    let n = intensity_array.len();
    if n == 0 {
        return 0;
    }
    let index = index.min(n - 1);
    let lo = index.saturating_sub(radius);
    let hi = (index + radius).min(n - 1);
    let mut best = index;
    for i in lo..=hi {
        let value = intensity_array[i];
        let current = intensity_array[best];
        if value > current || (value == current && i.abs_diff(index) < best.abs_diff(index)) {
            best = i;
        }
    }
    best
}

/// Fit a parabola through the point at `index` and its two neighbors.
///
/// Returns the vertex offset relative to `index` (in points) and the vertex
/// height. When the neighbors are missing or the three points are collinear,
/// the sampled point itself is returned.
pub fn quadratic_apex(intensity_array: &[f64], index: usize) -> (f64, f64) {
    let n = intensity_array.len();
    if index == 0 || index + 1 >= n {
        return (0.0, intensity_array.get(index).copied().unwrap_or_default());
    }
    let y1 = intensity_array[index - 1];
    let y2 = intensity_array[index];
    let y3 = intensity_array[index + 1];
    let d = y1 - 2.0 * y2 + y3;
    if aboutzero(d) || d > 0.0 {
        return (0.0, y2);
    }
    let offset = 0.5 * (y1 - y3) / d;
    if offset.abs() > 1.0 {
        return (0.0, y2);
    }
    let height = y2 - 0.25 * (y1 - y3) * offset;
    (offset, height.max(y2))
}

/// Refine a detected peak position against the raw signal: move to the local
/// apex within `radius` points, then estimate the apex height.
pub fn refine_peak(intensity_array: &[f64], index: usize, radius: usize) -> (usize, f64) {
    let apex = local_apex(intensity_array, index, radius);
    let (_, height) = quadratic_apex(intensity_array, apex);
    (apex, height)
}
