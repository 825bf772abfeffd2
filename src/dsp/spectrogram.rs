//! Short-time Fourier transform spectrogram
//!
//! Builds the time-frequency matrix the peak picker operates on:
//!
//! 1. Low-pass the signal (anti-alias, see [`crate::dsp::filter`])
//! 2. Decimate to `sample_rate / downsample_ratio`
//! 3. Frame into overlapping windows, apply the Hamming window, run the FFT
//!
//! Rows are the full complex FFT output; only the first half of each row
//! carries positive-frequency information.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::DspConfig;
use crate::dsp::{filter, resample, window};
use crate::error::EngineError;

/// Complex time-frequency matrix plus the rate it was computed at
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// One row per frame, each of length `window_size`
    pub rows: Vec<Vec<Complex<f32>>>,
    /// Effective sample rate after decimation, in Hz
    pub sample_rate: u32,
}

impl Spectrogram {
    /// Number of frames
    pub fn frames(&self) -> usize {
        self.rows.len()
    }

    /// Number of interpreted (positive-frequency) bins per frame
    pub fn bins(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len() / 2)
    }
}

/// Build the spectrogram of a mono sample stream
///
/// # Arguments
///
/// * `samples` - Mono samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Source sample rate in Hz
/// * `config` - Pipeline tuning parameters
///
/// # Errors
///
/// * `EngineError::Config` if the window size is not a power of two or the
///   decimation ratio is zero
/// * `EngineError::InvalidSampleRate` if the rate conversion is impossible
/// * `EngineError::SpectrogramEmpty` if the processed stream is shorter than
///   one full window
pub fn build(
    samples: &[f32],
    sample_rate: u32,
    config: &DspConfig,
) -> Result<Spectrogram, EngineError> {
    if !config.window_size.is_power_of_two() {
        return Err(EngineError::Config(format!(
            "fft_window_size must be a power of two, got {}",
            config.window_size
        )));
    }
    if config.downsample_ratio == 0 {
        return Err(EngineError::Config(
            "downsample_ratio must be at least 1".to_string(),
        ));
    }

    log::debug!(
        "Building spectrogram: {} samples at {} Hz, window={}, hop={}, ratio={}",
        samples.len(),
        sample_rate,
        config.window_size,
        config.hop(),
        config.downsample_ratio
    );

    let filtered = filter::low_pass(samples, config.window_size);
    let target_rate = sample_rate / config.downsample_ratio;
    let processed = resample::downsample(&filtered, sample_rate, target_rate)?;

    let w = config.window_size;
    let hop = config.hop();
    if processed.len() < w {
        return Err(EngineError::SpectrogramEmpty);
    }

    let hamming = window::hamming(w);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(w);

    let num_frames = (processed.len() - w) / hop + 1;
    let mut rows = Vec::with_capacity(num_frames);
    let mut frame = vec![0.0f32; w];

    for t in 0..num_frames {
        let start = t * hop;
        frame.copy_from_slice(&processed[start..start + w]);
        window::apply(&mut frame, &hamming);

        let mut buffer: Vec<Complex<f32>> =
            frame.iter().map(|&v| Complex { re: v, im: 0.0 }).collect();
        fft.process(&mut buffer);
        rows.push(buffer);
    }

    log::debug!(
        "Spectrogram built: {} frames at {} Hz effective rate",
        rows.len(),
        target_rate
    );

    Ok(Spectrogram {
        rows,
        sample_rate: target_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_decimation() -> DspConfig {
        DspConfig {
            downsample_ratio: 1,
            ..Default::default()
        }
    }

    fn sine(freq: f32, seconds: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_exactly_one_window_yields_one_frame() {
        let samples = vec![0.1f32; 1024];
        let spec = build(&samples, 44_100, &no_decimation()).unwrap();
        assert_eq!(spec.frames(), 1);
        assert_eq!(spec.rows[0].len(), 1024);
    }

    #[test]
    fn test_partial_trailing_frame_is_dropped() {
        // one hop short of a second full window
        let samples = vec![0.1f32; 1024 + 511];
        let spec = build(&samples, 44_100, &no_decimation()).unwrap();
        assert_eq!(spec.frames(), 1);

        let samples = vec![0.1f32; 1024 + 512];
        let spec = build(&samples, 44_100, &no_decimation()).unwrap();
        assert_eq!(spec.frames(), 2);
    }

    #[test]
    fn test_all_rows_are_window_sized() {
        let samples = sine(440.0, 1.0, 44_100, 0.5);
        let spec = build(&samples, 44_100, &no_decimation()).unwrap();
        assert!(spec.frames() > 1);
        for row in &spec.rows {
            assert_eq!(row.len(), 1024);
        }
        assert_eq!(spec.bins(), 512);
    }

    #[test]
    fn test_short_input_is_empty() {
        let samples = vec![0.1f32; 1023];
        assert!(matches!(
            build(&samples, 44_100, &no_decimation()),
            Err(EngineError::SpectrogramEmpty)
        ));
    }

    #[test]
    fn test_decimation_halves_effective_rate() {
        let samples = vec![0.1f32; 4096];
        let config = DspConfig::default(); // ratio 2
        let spec = build(&samples, 44_100, &config).unwrap();
        assert_eq!(spec.sample_rate, 22_050);
        // 4096 samples decimate to 2048, which frames to 3 windows
        assert_eq!(spec.frames(), 3);
    }

    #[test]
    fn test_sine_energy_lands_near_expected_bin() {
        let samples = sine(1000.0, 2.0, 44_100, 0.5);
        let spec = build(&samples, 44_100, &no_decimation()).unwrap();

        // scan an interior frame so the filter's zeroed boundary is avoided
        let mid = spec.frames() / 2;
        let row = &spec.rows[mid];
        let dominant = (0..512)
            .max_by(|&a, &b| row[a].norm().partial_cmp(&row[b].norm()).unwrap())
            .unwrap();

        let expected = (1000.0_f64 * 1024.0 / 44_100.0).round() as usize;
        assert!(
            dominant.abs_diff(expected) <= 2,
            "dominant bin {} too far from expected {}",
            dominant,
            expected
        );
    }

    #[test]
    fn test_non_power_of_two_window_rejected() {
        let config = DspConfig {
            window_size: 1000,
            ..Default::default()
        };
        assert!(matches!(
            build(&[0.0; 4096], 44_100, &config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_zero_ratio_rejected() {
        let config = DspConfig {
            downsample_ratio: 0,
            ..Default::default()
        };
        assert!(matches!(
            build(&[0.0; 4096], 44_100, &config),
            Err(EngineError::Config(_))
        ));
    }
}
