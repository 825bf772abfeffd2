//! Hamming window

use std::f32::consts::PI;

/// Compute the Hamming window coefficients for a frame of length `n`
///
/// `w[i] = 0.54 - 0.46 * cos(2π·i / (n - 1))`
///
/// The first and last coefficients are ~0.08, the midpoint is ~1.0.
pub fn hamming(n: usize) -> Vec<f32> {
    if n == 1 {
        // the formula divides by n - 1
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / (n as f32 - 1.0)).cos())
        .collect()
}

/// Apply a precomputed window to a frame in place
///
/// The frame and window must have the same length.
pub fn apply(frame: &mut [f32], window: &[f32]) {
    debug_assert_eq!(frame.len(), window.len());
    for (sample, w) in frame.iter_mut().zip(window.iter()) {
        *sample *= *w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_endpoints_and_midpoint() {
        let w = hamming(1024);
        assert_eq!(w.len(), 1024);
        assert!((w[0] - 0.08).abs() < 1e-3, "left endpoint, got {}", w[0]);
        assert!(
            (w[1023] - 0.08).abs() < 1e-3,
            "right endpoint, got {}",
            w[1023]
        );
        // midpoint of an even-length window straddles the maximum
        assert!(w[511] > 0.999 && w[512] > 0.999);
    }

    #[test]
    fn test_hamming_symmetry() {
        let w = hamming(1024);
        for i in 0..512 {
            assert!(
                (w[i] - w[1023 - i]).abs() < 1e-5,
                "asymmetry at index {}",
                i
            );
        }
    }

    #[test]
    fn test_apply_scales_in_place() {
        let mut frame = vec![1.0f32; 8];
        let w = hamming(8);
        apply(&mut frame, &w);
        assert_eq!(frame, w);
    }

    #[test]
    fn test_hamming_length_one() {
        assert_eq!(hamming(1), vec![1.0]);
    }
}
