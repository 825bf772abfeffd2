//! Constellation pairing
//!
//! Pairs each anchor peak with a bounded fan of later peaks and encodes each
//! pair as a pipe-delimited landmark hash. The fan bound keeps index growth
//! linear in the number of peaks while leaving enough redundancy for noisy
//! retrieval.

use crate::config::DspConfig;
use crate::dsp::peaks::Peak;

/// A landmark hash anchored at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// `"{anchor_freq}|{target_freq}|{delta_ms}"` in decimal
    pub hash: String,
    /// Anchor time in milliseconds
    pub offset: u32,
}

/// Pair peaks into fingerprints
///
/// Peaks must arrive in the order the picker produced them (row-major).
/// For each anchor `i`, targets are taken from `i + 1` through
/// `i + fan_value - 1`, clipped to the end of the list. Pairs whose time gap
/// falls outside `(min_hash_time_delta, max_hash_time_delta]` are skipped.
/// Fingerprints come out in strict anchor order.
pub fn pair(peaks: &[Peak], config: &DspConfig) -> Vec<Fingerprint> {
    let mut fingerprints = Vec::new();
    if config.fan_value < 2 {
        return fingerprints;
    }

    for (i, anchor) in peaks.iter().enumerate() {
        let fan_end = (i + config.fan_value - 1).min(peaks.len().saturating_sub(1));
        for target in &peaks[i + 1..=fan_end] {
            let delta_ms = target.time_ms.saturating_sub(anchor.time_ms);
            if delta_ms <= config.min_hash_time_delta || delta_ms > config.max_hash_time_delta {
                continue;
            }

            let anchor_freq = anchor.coeff.re.trunc() as i64;
            let target_freq = target.coeff.re.trunc() as i64;
            fingerprints.push(Fingerprint {
                hash: format!("{}|{}|{}", anchor_freq, target_freq, delta_ms),
                offset: anchor.time_ms,
            });
        }
    }

    log::debug!(
        "Paired {} peaks into {} fingerprints (fan={})",
        peaks.len(),
        fingerprints.len(),
        config.fan_value
    );

    fingerprints
}
