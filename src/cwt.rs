//! A continuous wavelet transform over a Mexican hat (Ricker) wavelet family.
use num_traits::{Float, FromPrimitive};

/// Sample a Ricker wavelet of width `a` over `points` points centered on the
/// middle point.
pub fn ricker_wavelet<F: Float + FromPrimitive>(points: usize, a: F) -> Vec<F> {
    if points == 0 {
        return Vec::new();
    }
    let pi = F::from_f64(std::f64::consts::PI).unwrap_or_else(F::zero);
    let two = F::one() + F::one();
    let three = two + F::one();
    let quarter = F::from_f64(0.25).unwrap_or_else(F::zero);
    let half = F::from_f64(0.5).unwrap_or_else(F::zero);

    let norm = two / ((three * a).sqrt() * pi.powf(quarter));
    let center = F::from_usize(points - 1).unwrap_or_else(F::zero) * half;

    (0..points)
        .map(|i| {
            let x = F::from_usize(i).unwrap_or_else(F::zero) - center;
            let xa = x / a;
            norm * (F::one() - xa * xa) * (-(x * x) / (two * a * a)).exp()
        })
        .collect()
}

/// Mirror an out-of-bounds position back into `0..n` without repeating the edge
fn reflect(index: isize, n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let mut i = index.rem_euclid(period);
    if i >= n as isize {
        i = period - i;
    }
    i as usize
}

/// Convolve `x` with the symmetric kernel `h`, producing an output the same
/// length as `x` and reflecting the signal at its boundaries.
pub fn convolve_reflect<F: Float>(x: &[F], h: &[F]) -> Vec<F> {
    if x.is_empty() || h.is_empty() {
        return Vec::new();
    }
    let n = x.len();
    let half = (h.len() / 2) as isize;
    (0..n)
        .map(|i| {
            h.iter().enumerate().fold(F::zero(), |acc, (j, w)| {
                let k = reflect(i as isize + j as isize - half, n);
                acc + x[k] * *w
            })
        })
        .collect()
}

/// The wavelet coefficients of a signal, one row per scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CwtMatrix<F> {
    pub scales: Vec<u32>,
    pub rows: Vec<Vec<F>>,
}

impl<F: Float> CwtMatrix<F> {
    pub fn n_scales(&self) -> usize {
        self.scales.len()
    }

    pub fn n_points(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or_default()
    }

    pub fn row(&self, level: usize) -> &[F] {
        &self.rows[level]
    }

    pub fn coefficient(&self, level: usize, position: usize) -> F {
        self.rows[level][position]
    }
}

/// Transform `signal` at each of `scales`.
///
/// The wavelet for scale `a` spans `10a + 1` points, capped at twice the signal
/// length.
pub fn cwt<F: Float + FromPrimitive>(signal: &[F], scales: &[u32]) -> CwtMatrix<F> {
    let rows = scales
        .iter()
        .map(|&scale| {
            let scale = scale.max(1);
            let points = (10 * scale as usize + 1).min(2 * signal.len() + 1).max(3);
            let wavelet = ricker_wavelet(points, F::from_u32(scale).unwrap_or_else(F::one));
            convolve_reflect(signal, &wavelet)
        })
        .collect();
    CwtMatrix {
        scales: scales.to_vec(),
        rows,
    }
}

/// Find the positions in `row` holding a positive value that is the largest in
/// the surrounding `radius` points. Ties resolve to the leftmost position and
/// the two array ends are never reported.
pub fn local_maxima<F: Float>(row: &[F], radius: usize) -> Vec<usize> {
    let n = row.len();
    if n < 3 {
        return Vec::new();
    }
    (1..n - 1)
        .filter(|&i| {
            let value = row[i];
            if value <= F::zero() {
                return false;
            }
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(n - 1);
            row[lo..i].iter().all(|v| *v < value) && row[i + 1..=hi].iter().all(|v| *v <= value)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ricker_is_symmetric() {
        let w = ricker_wavelet(31, 3.0f64);
        assert_eq!(w.len(), 31);
        for i in 0..15 {
            assert!((w[i] - w[30 - i]).abs() < 1e-12);
        }
        let apex = w.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(apex, w[15]);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(6, 5), 2);
        assert_eq!(reflect(3, 5), 3);
        assert_eq!(reflect(7, 1), 0);
    }

    #[test]
    fn test_cwt_shape() {
        let x: Vec<f64> = (0..64).map(|i| (i as f64 / 4.0).sin()).collect();
        let m = cwt(&x, &[1, 2, 4, 8]);
        assert_eq!(m.n_scales(), 4);
        assert_eq!(m.n_points(), 64);
        assert!(m.rows.iter().all(|r| r.len() == 64));
    }

    #[test]
    fn test_cwt_localizes_gaussian() {
        let x: Vec<f64> = (0..256)
            .map(|i| {
                let d = (i as f64 - 100.0) / 5.0;
                1000.0 * (-d * d / 2.0).exp()
            })
            .collect();
        let m = cwt(&x, &[1, 3, 5, 7]);
        for (level, scale) in m.scales.iter().enumerate() {
            let maxima = local_maxima(m.row(level), *scale as usize);
            assert!(
                maxima.iter().any(|p| p.abs_diff(100) <= 1),
                "scale {scale} maxima {maxima:?}"
            );
        }
    }

    #[test]
    fn test_local_maxima_ties() {
        let row = [0.0, 1.0, 3.0, 3.0, 1.0, 0.0, 2.0, 0.0];
        assert_eq!(local_maxima(&row, 2), vec![2, 6]);
        assert!(local_maxima(&[5.0, 1.0, 5.0], 1).is_empty());
        assert!(local_maxima(&[-1.0, -0.5, -2.0], 1).is_empty());
    }
}
