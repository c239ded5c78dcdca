//! Link wavelet coefficient maxima across scales into ridges and select the
//! ridges that describe peaks.
//!
//! Ridges are traced from the coarsest scale towards the finest. A peak is a
//! ridge that persists over enough scales and whose strongest coefficient stands
//! out from the local noise at the finest scale.
use log::trace;
use num_traits::{Float, ToPrimitive};

use crate::cwt::{local_maxima, CwtMatrix};
use crate::stats::{minmax, percentile_of};

/// The smallest neighborhood used to find maxima and link ridges
pub const MIN_RIDGE_WINDOW: usize = 2;

/// The signal to noise ratio a satellite peak must reach to be kept next to a major peak
pub const NEARBY_PEAK_MIN_SNR: f64 = 1.0;

/// The quantile of the finest-scale coefficients taken as the local noise level
const NOISE_QUANTILE: f64 = 0.95;

/// Parameters controlling which ridges become peaks
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeParams {
    pub snr_threshold: f64,
    /// The minimum number of scales a ridge must span, `None` for half the ladder
    pub min_ridge_length: Option<usize>,
    /// Scale levels a ridge may skip before it is closed
    pub gap_threshold: usize,
    /// The smallest scale considered when locating a ridge's strongest coefficient
    pub peak_scale_range: u32,
    /// Half-width of the neighborhood used to estimate local noise
    pub noise_window: usize,
    /// Noise floor, as a fraction of the largest finest-scale coefficient
    pub min_noise_level: f64,
    pub include_nearby_peaks: bool,
    /// How far a satellite peak may be from a major peak
    pub nearby_window: usize,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self {
            snr_threshold: 3.0,
            min_ridge_length: None,
            gap_threshold: 3,
            peak_scale_range: 5,
            noise_window: 500,
            min_noise_level: 0.001,
            include_nearby_peaks: true,
            nearby_window: 100,
        }
    }
}

/// A chain of coefficient maxima linked across scales
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ridge {
    /// `(scale level, position)` pairs ordered from the coarsest scale down
    pub points: Vec<(usize, usize)>,
    gap: usize,
    active: bool,
}

impl Ridge {
    fn new(level: usize, position: usize) -> Self {
        Self {
            points: vec![(level, position)],
            gap: 0,
            active: true,
        }
    }

    /// The position of the ridge at the finest scale it reached
    pub fn position(&self) -> usize {
        self.points.last().map(|(_, p)| *p).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn extend(&mut self, level: usize, position: usize) {
        self.points.push((level, position));
        self.gap = 0;
    }

    fn skip(&mut self, gap_threshold: usize) {
        self.gap += 1;
        if self.gap > gap_threshold {
            self.active = false;
        }
    }
}

/// Trace every ridge through the coefficient matrix
pub fn trace_ridges<F: Float>(cwt: &CwtMatrix<F>, gap_threshold: usize) -> Vec<Ridge> {
    let mut ridges: Vec<Ridge> = Vec::new();
    for level in (0..cwt.n_scales()).rev() {
        let radius = (cwt.scales[level] as usize).max(MIN_RIDGE_WINDOW);
        let maxima = local_maxima(cwt.row(level), radius);
        let mut claimed = vec![false; maxima.len()];

        for ridge in ridges.iter_mut().filter(|r| r.active) {
            let position = ridge.position();
            let nearest = maxima
                .iter()
                .enumerate()
                .filter(|(k, m)| !claimed[*k] && m.abs_diff(position) <= radius)
                .min_by_key(|(_, m)| m.abs_diff(position));
            match nearest {
                Some((k, m)) => {
                    claimed[k] = true;
                    ridge.extend(level, *m);
                }
                None => ridge.skip(gap_threshold),
            }
        }

        ridges.extend(
            maxima
                .iter()
                .zip(claimed.iter())
                .filter(|(_, c)| !**c)
                .map(|(m, _)| Ridge::new(level, *m)),
        );
    }
    ridges
}

/// A ridge selected as a peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgePeak {
    /// The ridge position at its finest scale
    pub position: usize,
    /// The scale of the strongest coefficient on the ridge
    pub scale: u32,
    /// The strongest coefficient on the ridge
    pub strength: f64,
    pub signal_to_noise: f64,
    pub ridge_length: usize,
}

fn local_noise<F: Float + ToPrimitive>(
    finest: &[F],
    position: usize,
    noise_window: usize,
    floor: f64,
) -> f64 {
    let lo = position.saturating_sub(noise_window);
    let hi = (position + noise_window + 1).min(finest.len());
    let magnitudes: Vec<f64> = finest[lo..hi]
        .iter()
        .map(|v| v.abs().to_f64().unwrap_or_default())
        .collect();
    percentile_of(&magnitudes, NOISE_QUANTILE).max(floor)
}

fn strongest<'a, F: Float + ToPrimitive>(
    cwt: &CwtMatrix<F>,
    points: impl Iterator<Item = &'a (usize, usize)>,
) -> Option<(u32, f64)> {
    points
        .map(|(level, position)| {
            let value = cwt.coefficient(*level, *position).to_f64().unwrap_or_default();
            (cwt.scales[*level], value)
        })
        .fold(None, |best: Option<(u32, f64)>, (scale, value)| match best {
            Some((_, v)) if v >= value => best,
            _ => Some((scale, value)),
        })
}

fn strongest_point<F: Float + ToPrimitive>(
    cwt: &CwtMatrix<F>,
    ridge: &Ridge,
    peak_scale_range: u32,
) -> Option<(u32, f64)> {
    let in_range = ridge
        .points
        .iter()
        .filter(|(level, _)| cwt.scales[*level] >= peak_scale_range);
    strongest(cwt, in_range).or_else(|| strongest(cwt, ridge.points.iter()))
}

/// Score every ridge and keep those describing peaks, sorted by position.
pub fn identify_peaks<F: Float + ToPrimitive>(
    cwt: &CwtMatrix<F>,
    ridges: &[Ridge],
    params: &RidgeParams,
) -> Vec<RidgePeak> {
    if cwt.n_scales() == 0 || cwt.n_points() == 0 {
        return Vec::new();
    }
    let min_ridge_length = params
        .min_ridge_length
        .unwrap_or_else(|| cwt.n_scales().div_ceil(2))
        .clamp(1, cwt.n_scales());

    let finest: Vec<f64> = cwt
        .row(0)
        .iter()
        .map(|v| v.to_f64().unwrap_or_default())
        .collect();
    let (lowest, highest) = minmax(&finest);
    let noise_floor = params.min_noise_level * lowest.abs().max(highest.abs());

    let mut candidates: Vec<RidgePeak> = ridges
        .iter()
        .filter(|ridge| ridge.len() >= min_ridge_length)
        .filter_map(|ridge| {
            let (scale, strength) = strongest_point(cwt, ridge, params.peak_scale_range)?;
            if strength <= 0.0 {
                return None;
            }
            let position = ridge.position();
            let noise = local_noise(&finest, position, params.noise_window, noise_floor);
            let signal_to_noise = if noise > 0.0 { strength / noise } else { 0.0 };
            Some(RidgePeak {
                position,
                scale,
                strength,
                signal_to_noise,
                ridge_length: ridge.len(),
            })
        })
        .collect();

    let major: Vec<usize> = candidates
        .iter()
        .filter(|c| c.signal_to_noise >= params.snr_threshold)
        .map(|c| c.position)
        .collect();

    candidates.retain(|c| {
        if c.signal_to_noise >= params.snr_threshold {
            true
        } else if params.include_nearby_peaks && c.signal_to_noise >= NEARBY_PEAK_MIN_SNR {
            major
                .iter()
                .any(|m| m.abs_diff(c.position) <= params.nearby_window)
        } else {
            false
        }
    });

    // Several ridges may converge onto the same position, keep the strongest
    candidates.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| b.signal_to_noise.total_cmp(&a.signal_to_noise))
    });
    candidates.dedup_by_key(|c| c.position);
    if log::log_enabled!(log::Level::Trace) {
        trace!(
            "Selected {} of {} ridges (minimum length {min_ridge_length})",
            candidates.len(),
            ridges.len()
        );
    }
    candidates
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cwt::cwt;

    fn gaussian(n: usize, center: f64, sigma: f64, height: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let d = (i as f64 - center) / sigma;
                height * (-d * d / 2.0).exp()
            })
            .collect()
    }

    fn ladder() -> Vec<u32> {
        (1..16).step_by(2).collect()
    }

    #[test]
    fn test_single_ridge() {
        let signal = gaussian(512, 200.0, 4.0, 5000.0);
        let m = cwt(&signal, &ladder());
        let ridges = trace_ridges(&m, 3);
        let long: Vec<_> = ridges
            .iter()
            .filter(|r| r.len() == ladder().len() && r.position() == 200)
            .collect();
        assert_eq!(long.len(), 1);
        let peaks = identify_peaks(&m, &ridges, &RidgeParams::default());
        assert_eq!(peaks.len(), 1, "{peaks:?}");
        assert_eq!(peaks[0].position, 200);
        assert_eq!(long[0].points.first().unwrap().0, ladder().len() - 1);
    }

    #[test]
    fn test_identify_two_peaks() {
        let a = gaussian(512, 150.0, 3.0, 4000.0);
        let b = gaussian(512, 350.0, 5.0, 2500.0);
        let signal: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| 50.0 + x + y).collect();
        let m = cwt(&signal, &ladder());
        let ridges = trace_ridges(&m, 3);
        let peaks = identify_peaks(&m, &ridges, &RidgeParams::default());
        let positions: Vec<usize> = peaks.iter().map(|p| p.position).collect();
        assert_eq!(peaks.len(), 2, "{peaks:?}");
        assert!(positions[0].abs_diff(150) <= 1);
        assert!(positions[1].abs_diff(350) <= 1);
        assert!(peaks.iter().all(|p| p.scale >= 5));
        assert!(peaks.iter().all(|p| p.signal_to_noise >= 3.0));
    }

    #[test]
    fn test_flat_signal_has_no_peaks() {
        let signal = vec![50.0; 256];
        let m = cwt(&signal, &ladder());
        let ridges = trace_ridges(&m, 3);
        let peaks = identify_peaks(&m, &ridges, &RidgeParams::default());
        assert!(peaks.is_empty(), "{peaks:?}");
    }

    fn major_with_satellite(satellite: f64) -> CwtMatrix<f64> {
        let major = gaussian(512, 200.0, 4.0, 10000.0);
        let minor = gaussian(512, satellite, 4.0, 400.0);
        let signal: Vec<f64> = major.iter().zip(minor.iter()).map(|(x, y)| x + y).collect();
        cwt(&signal, &ladder())
    }

    fn near(peaks: &[RidgePeak], position: usize) -> bool {
        peaks.iter().any(|p| p.position.abs_diff(position) <= 1)
    }

    #[test]
    fn test_nearby_peaks() {
        let m = major_with_satellite(240.0);
        let ridges = trace_ridges(&m, 3);
        // The satellite's signal to noise ratio sits between the nearby floor and this threshold
        let params = RidgeParams {
            snr_threshold: 20.0,
            ..Default::default()
        };
        let with_nearby = identify_peaks(&m, &ridges, &params);
        let satellite = with_nearby
            .iter()
            .find(|p| p.position.abs_diff(240) <= 1)
            .copied();
        let satellite = satellite.expect("satellite kept next to the major peak");
        assert!(satellite.signal_to_noise >= NEARBY_PEAK_MIN_SNR);
        assert!(satellite.signal_to_noise < params.snr_threshold);
        assert!(near(&with_nearby, 200));

        let without_nearby = identify_peaks(
            &m,
            &ridges,
            &RidgeParams {
                include_nearby_peaks: false,
                ..params.clone()
            },
        );
        assert!(near(&without_nearby, 200));
        assert!(!near(&without_nearby, 240), "{without_nearby:?}");

        let strict = RidgeParams {
            snr_threshold: f64::INFINITY,
            ..params
        };
        // Nothing passes an infinite threshold, so there is no major peak to attach to
        assert!(identify_peaks(&m, &ridges, &strict).is_empty());
    }

    #[test]
    fn test_distant_satellite_is_dropped() {
        let m = major_with_satellite(400.0);
        let ridges = trace_ridges(&m, 3);
        let params = RidgeParams {
            snr_threshold: 20.0,
            include_nearby_peaks: true,
            nearby_window: 100,
            ..Default::default()
        };
        let peaks = identify_peaks(&m, &ridges, &params);
        assert!(near(&peaks, 200));
        assert!(!near(&peaks, 400), "{peaks:?}");

        let wide = identify_peaks(
            &m,
            &ridges,
            &RidgeParams {
                nearby_window: 250,
                ..params
            },
        );
        assert!(near(&wide, 400), "{wide:?}");
    }
}
