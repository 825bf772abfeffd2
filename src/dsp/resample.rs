//! Integer-ratio decimation

use crate::error::EngineError;

/// Downsample a signal by the integer ratio `original_rate / target_rate`
///
/// Each output sample is the arithmetic mean of `ratio` consecutive input
/// samples; a trailing partial block is averaged over its actual length.
///
/// # Arguments
///
/// * `input` - Signal at `original_rate`
/// * `original_rate` - Source sample rate in Hz
/// * `target_rate` - Desired sample rate in Hz
///
/// # Errors
///
/// Returns `EngineError::InvalidSampleRate` if either rate is non-positive
/// or the target exceeds the original.
pub fn downsample(
    input: &[f32],
    original_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, EngineError> {
    if original_rate == 0 || target_rate == 0 {
        return Err(EngineError::InvalidSampleRate(
            "sample rates must be positive".to_string(),
        ));
    }
    if target_rate > original_rate {
        return Err(EngineError::InvalidSampleRate(format!(
            "target rate {} Hz exceeds original rate {} Hz",
            target_rate, original_rate
        )));
    }

    let ratio = (original_rate / target_rate) as usize;

    let mut resampled = Vec::with_capacity(input.len() / ratio + 1);
    let mut i = 0;
    while i < input.len() {
        let end = (i + ratio).min(input.len());
        let sum: f32 = input[i..end].iter().sum();
        resampled.push(sum / (end - i) as f32);
        i += ratio;
    }

    Ok(resampled)
}
