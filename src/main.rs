use std::io;
use std::time::Instant;

use nmrsignal::text::write_peak_table;
use nmrsignal::{SampleLabels, SpectrumMatrix, WaveletPeakDetector, WaveletPeakParams};

const N_POINTS: usize = 8192;

fn lorentzian(x: f64, center: f64, width: f64, height: f64) -> f64 {
    let d = (x - center) / width;
    height / (1.0 + d * d)
}

fn synthetic_sample(shift: f64, scale: f64, seed: u64) -> Vec<f64> {
    let lines = [
        (900.0, 3.0, 12000.0),
        (2500.0, 4.0, 8000.0),
        (2540.0, 4.0, 6500.0),
        (4100.0, 2.5, 20000.0),
        (6200.0, 5.0, 4000.0),
        (7300.0, 3.0, 9000.0),
    ];
    let mut state = seed;
    (0..N_POINTS)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 20.0;
            let x = i as f64;
            let signal: f64 = lines
                .iter()
                .map(|(c, w, h)| lorentzian(x, c + shift, *w, h * scale))
                .sum();
            100.0 + signal + noise
        })
        .collect()
}

fn main() -> io::Result<()> {
    let ppm: Vec<f64> = (0..N_POINTS)
        .map(|i| 10.0 - i as f64 * 10.0 / N_POINTS as f64)
        .collect();
    let rows: Vec<Vec<f64>> = (0..6)
        .map(|i| synthetic_sample(i as f64 * 0.5, 1.0 + i as f64 * 0.1, i + 1))
        .collect();
    let spectra = SpectrumMatrix::new(rows, ppm).map_err(io::Error::other)?;
    let labels = SampleLabels::new(
        ["control-1", "control-2", "control-3", "treated-1", "treated-2", "treated-3"].to_vec(),
    )
    .map_err(io::Error::other)?;

    let params = WaveletPeakParams::builder()
        .window_splits(vec![4, 16])
        .build()
        .map_err(io::Error::other)?;
    let detector = WaveletPeakDetector::new(&params).map_err(io::Error::other)?;

    let start = Instant::now();
    let peaks = detector
        .detect_labeled(&spectra, &labels)
        .map_err(io::Error::other)?;
    eprintln!(
        "Detected {} peaks in {} samples in {} milliseconds",
        peaks.len(),
        spectra.n_samples(),
        (Instant::now() - start).as_millis()
    );
    for (label, count) in peaks.sample_counts() {
        eprintln!("\t{label}: {count}");
    }
    write_peak_table(&peaks, io::stdout().lock())
}
