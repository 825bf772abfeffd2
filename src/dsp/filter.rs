//! Moving-average low-pass pre-filter
//!
//! A cumulative-sum moving average used as a cheap anti-alias filter before
//! decimation. Samples whose averaging window would run past either end of
//! the signal are left at zero.

/// Apply a centred moving-average filter of width `window_size`
///
/// # Arguments
///
/// * `samples` - Input signal
/// * `window_size` - Averaging window width in samples
///
/// # Returns
///
/// Filtered signal of the same length. Positions outside
/// `[window_size / 2, len - window_size / 2)` are zero.
pub fn low_pass(samples: &[f32], window_size: usize) -> Vec<f32> {
    let mut filtered = vec![0.0f32; samples.len()];
    if window_size == 0 || samples.is_empty() {
        return filtered;
    }

    // prefix sums in f64 to keep long signals from drifting
    let mut cumulative = vec![0.0f64; samples.len() + 1];
    for (i, &s) in samples.iter().enumerate() {
        cumulative[i + 1] = cumulative[i] + s as f64;
    }

    let half = window_size / 2;
    if samples.len() < window_size {
        return filtered;
    }
    for i in half..samples.len() - half {
        let sum = cumulative[i + half + 1] - cumulative[i - half];
        filtered[i] = (sum / window_size as f64) as f32;
    }

    filtered
}
