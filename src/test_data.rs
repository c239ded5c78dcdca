//! Deterministic synthetic spectra for tests.

/// A spectrum of `n` points holding Gaussian lines given as
/// `(center, sigma, height)` over a flat `baseline`
pub fn gaussian_spectrum(n: usize, lines: &[(f64, f64, f64)], baseline: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            baseline
                + lines
                    .iter()
                    .map(|(center, sigma, height)| {
                        let d = (x - center) / sigma;
                        height * (-d * d / 2.0).exp()
                    })
                    .sum::<f64>()
        })
        .collect()
}

/// A descending ppm axis starting at 10 ppm with a fixed spacing
pub fn ppm_axis_with_step(n: usize, step: f64) -> Vec<f64> {
    (0..n).map(|i| 10.0 - i as f64 * step).collect()
}

/// A descending ppm axis spanning 10 ppm to 0 ppm
pub fn ppm_axis(n: usize) -> Vec<f64> {
    ppm_axis_with_step(n, 10.0 / n as f64)
}

/// Uniform pseudo-random noise in `[-amplitude, amplitude)` from a linear
/// congruential generator, so tests see the same noise on every run
pub fn pseudo_noise(n: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            (unit * 2.0 - 1.0) * amplitude
        })
        .collect()
}
