//! Spectral peak picking
//!
//! A peak is a spectrogram cell whose magnitude exceeds the configured
//! threshold and is strictly greater than every in-bounds neighbour in its
//! Moore neighbourhood. Peaks are emitted in row-major order (frame, then
//! bin), which downstream pairing relies on.

use std::collections::HashSet;

use rustfft::num_complex::Complex;

use crate::config::DspConfig;
use crate::dsp::spectrogram::Spectrogram;

/// A spectral peak
#[derive(Debug, Clone, Copy)]
pub struct Peak {
    /// Frame index
    pub frame: usize,
    /// Frequency bin index, within the positive-frequency half
    pub bin: usize,
    /// Magnitude of the FFT coefficient
    pub magnitude: f32,
    /// The complex coefficient itself
    pub coeff: Complex<f32>,
    /// Frame time in milliseconds at the spectrogram's effective rate
    pub time_ms: u32,
}

/// Extract peaks from a spectrogram
///
/// Only bins in the positive-frequency half are scanned. Cells on the edge
/// of the matrix compare against their in-bounds neighbours only. Candidates
/// whose coefficient prints to the same real part (ten decimal places) as an
/// earlier candidate are dropped, keeping the first in row-major order.
pub fn pick(spectrogram: &Spectrogram, config: &DspConfig) -> Vec<Peak> {
    let frames = spectrogram.frames();
    let bins = spectrogram.bins();
    if frames == 0 || bins == 0 {
        return Vec::new();
    }

    let window_size = spectrogram.rows[0].len();
    let radius = config.neighborhood_size as isize;

    // magnitudes of the interpreted half only
    let magnitudes: Vec<Vec<f32>> = spectrogram
        .rows
        .iter()
        .map(|row| row[..bins].iter().map(|c| c.norm()).collect())
        .collect();

    let mut seen = HashSet::new();
    let mut peaks = Vec::new();

    for t in 0..frames {
        for k in 0..bins {
            let magnitude = magnitudes[t][k];
            if magnitude <= config.peak_threshold {
                continue;
            }
            if !is_local_maximum(&magnitudes, t, k, radius) {
                continue;
            }

            let coeff = spectrogram.rows[t][k];
            if !seen.insert(format!("{:.10}", coeff.re)) {
                continue;
            }

            let time_ms =
                (t as u64 * window_size as u64 * 1000 / spectrogram.sample_rate as u64) as u32;
            peaks.push(Peak {
                frame: t,
                bin: k,
                magnitude,
                coeff,
                time_ms,
            });
        }
    }

    log::debug!(
        "Picked {} peaks from {} frames ({} bins each)",
        peaks.len(),
        frames,
        bins
    );

    peaks
}

/// Strict local-maximum test over the in-bounds Moore neighbourhood
fn is_local_maximum(magnitudes: &[Vec<f32>], t: usize, k: usize, radius: isize) -> bool {
    let frames = magnitudes.len() as isize;
    let bins = magnitudes[0].len() as isize;
    let value = magnitudes[t][k];

    for dt in -radius..=radius {
        for dk in -radius..=radius {
            if dt == 0 && dk == 0 {
                continue;
            }
            let tt = t as isize + dt;
            let kk = k as isize + dk;
            if tt < 0 || tt >= frames || kk < 0 || kk >= bins {
                continue;
            }
            if value <= magnitudes[tt as usize][kk as usize] {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spectrogram with the given magnitudes placed in the real component
    fn spectrogram_from(mags: &[[f32; 4]], sample_rate: u32) -> Spectrogram {
        let rows = mags
            .iter()
            .map(|row| {
                // mirror into a full-width row so bins() sees half of it
                let mut full: Vec<Complex<f32>> = row
                    .iter()
                    .map(|&m| Complex { re: m, im: 0.0 })
                    .collect();
                full.extend(row.iter().map(|&m| Complex { re: m, im: 0.0 }));
                full
            })
            .collect();
        Spectrogram { rows, sample_rate }
    }

    fn config() -> DspConfig {
        DspConfig::default()
    }

    #[test]
    fn test_zero_spectrogram_has_no_peaks() {
        let spec = spectrogram_from(&[[0.0; 4]; 3], 22_050);
        assert!(pick(&spec, &config()).is_empty());
    }

    #[test]
    fn test_single_interior_peak_found() {
        let spec = spectrogram_from(
            &[
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 5.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
            ],
            22_050,
        );
        let peaks = pick(&spec, &config());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].frame, 1);
        assert_eq!(peaks[0].bin, 1);
        assert!((peaks[0].magnitude - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_strict() {
        // exactly at the threshold does not qualify
        let spec = spectrogram_from(&[[0.0, 0.2, 0.0, 0.0]], 22_050);
        assert!(pick(&spec, &config()).is_empty());

        let spec = spectrogram_from(&[[0.0, 0.21, 0.0, 0.0]], 22_050);
        assert_eq!(pick(&spec, &config()).len(), 1);
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        // two equal neighbours: neither strictly exceeds the other
        let spec = spectrogram_from(&[[0.0, 3.0, 3.0, 0.0]], 22_050);
        assert!(pick(&spec, &config()).is_empty());
    }

    #[test]
    fn test_corner_cell_compares_in_bounds_only() {
        let spec = spectrogram_from(
            &[[7.0, 1.0, 0.0, 0.0], [1.0, 1.0, 0.0, 0.0]],
            22_050,
        );
        let peaks = pick(&spec, &config());
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].frame, peaks[0].bin), (0, 0));
    }

    #[test]
    fn test_row_major_order_and_time_ms() {
        let spec = spectrogram_from(
            &[
                [0.0, 9.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 7.0],
            ],
            1000,
        );
        let peaks = pick(&spec, &config());
        assert_eq!(peaks.len(), 2);
        assert!(peaks[0].frame < peaks[1].frame);
        // time_ms = frame * row_width * 1000 / rate; rows are 8 wide here
        assert_eq!(peaks[0].time_ms, 0);
        assert_eq!(peaks[1].time_ms, 2 * 8 * 1000 / 1000);
    }

    #[test]
    fn test_duplicate_real_part_keeps_first() {
        // two isolated candidates with identical coefficients
        let spec = spectrogram_from(
            &[
                [0.0, 5.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 5.0],
            ],
            22_050,
        );
        let peaks = pick(&spec, &config());
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].frame, peaks[0].bin), (0, 1));
    }

    #[test]
    fn test_larger_neighborhood_suppresses_nearby_peak() {
        // 4.0 at (0, 1) and 5.0 at (2, 1) are separated under radius 1 but
        // collide under radius 2
        let spec = spectrogram_from(
            &[
                [0.0, 4.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 5.0, 0.0, 0.0],
            ],
            22_050,
        );
        assert_eq!(pick(&spec, &config()).len(), 2);

        let wide = DspConfig {
            neighborhood_size: 2,
            ..Default::default()
        };
        let peaks = pick(&spec, &wide);
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].magnitude - 5.0).abs() < 1e-6);
    }
}
