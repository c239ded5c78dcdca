use criterion::Criterion;

use nmrsignal::cwt::cwt;
use nmrsignal::{Concurrency, SpectrumMatrix, WaveletPeakDetector, WaveletPeakParams};

fn spectrum(n: usize, offset: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let signal: f64 = [(0.1, 3.0, 6000.0), (0.35, 4.0, 9000.0), (0.7, 2.5, 12000.0)]
                .iter()
                .map(|(c, s, h)| {
                    let d = (x - c * n as f64 - offset) / s;
                    h * (-d * d / 2.0).exp()
                })
                .sum();
            80.0 + signal + ((i * 7919) % 13) as f64
        })
        .collect()
}

fn matrix(samples: usize, n: usize) -> SpectrumMatrix {
    let ppm: Vec<f64> = (0..n).map(|i| 10.0 - i as f64 * 10.0 / n as f64).collect();
    let rows = (0..samples).map(|i| spectrum(n, i as f64)).collect();
    SpectrumMatrix::new(rows, ppm).unwrap()
}

fn transform(c: &mut Criterion) {
    let signal = spectrum(512, 0.0);
    let scales: Vec<u32> = (1..16).step_by(2).collect();
    c.bench_function("cwt_512", |b| b.iter(|| cwt(&signal, &scales)));
}

fn detection(c: &mut Criterion) {
    let spectra = matrix(16, 16384);
    let sequential = WaveletPeakDetector::new(&WaveletPeakParams {
        concurrency: Concurrency::Workers(1),
        ..Default::default()
    })
    .unwrap();
    c.bench_function("detect_sample", |b| {
        b.iter(|| sequential.detect_sample(&spectra, 0).unwrap())
    });
    c.bench_function("detect_sequential", |b| {
        b.iter(|| sequential.detect(&spectra).unwrap())
    });
    let parallel = WaveletPeakDetector::new(&WaveletPeakParams::default()).unwrap();
    c.bench_function("detect_parallel", |b| {
        b.iter(|| parallel.detect(&spectra).unwrap())
    });
}

criterion::criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = transform, detection
}
criterion::criterion_main!(benches);
