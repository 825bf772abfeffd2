//! Canonical WAV parsing
//!
//! Reads the PCM-16 RIFF/WAVE files the decoder produces. The parser is
//! deliberately strict: it accepts exactly the canonical 44-byte header
//! layout and rejects anything that is not integer PCM at 16 bits per
//! sample.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::EngineError;

/// Minimum file size: the canonical header alone
const HEADER_BYTES: usize = 44;

/// PCM audio format tag in the `fmt ` chunk
const FORMAT_PCM: u16 = 1;

/// Parsed WAV file contents
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Channel count from the header
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Raw PCM payload bytes (everything after the header)
    pub data: Vec<u8>,
    /// Decoded samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Payload duration in seconds
    pub duration_secs: f64,
    /// SHA-256 of the file on disk, lowercase hex
    pub file_sha256: String,
}

/// Read and validate a canonical PCM-16 WAV file
///
/// # Errors
///
/// Returns `EngineError::InvalidWav` when the file is too small, the RIFF or
/// WAVE magic is missing, the format is not integer PCM, the bit depth is
/// not 16, or the payload length is odd. I/O failures surface as
/// `EngineError::Io`.
pub fn read_wav_info(path: &Path) -> Result<WavInfo, EngineError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < HEADER_BYTES {
        return Err(EngineError::InvalidWav(format!(
            "file is {} bytes, smaller than a WAV header",
            bytes.len()
        )));
    }

    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(EngineError::InvalidWav(
            "missing RIFF/WAVE magic".to_string(),
        ));
    }

    let audio_format = u16::from_le_bytes([bytes[20], bytes[21]]);
    let channels = u16::from_le_bytes([bytes[22], bytes[23]]);
    let sample_rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
    let bits_per_sample = u16::from_le_bytes([bytes[34], bytes[35]]);

    if audio_format != FORMAT_PCM {
        return Err(EngineError::InvalidWav(format!(
            "audio format {} is not PCM",
            audio_format
        )));
    }
    if bits_per_sample != 16 {
        return Err(EngineError::InvalidWav(format!(
            "unsupported bit depth: {}",
            bits_per_sample
        )));
    }
    if channels == 0 || sample_rate == 0 {
        return Err(EngineError::InvalidWav(
            "header declares zero channels or zero sample rate".to_string(),
        ));
    }

    let data = bytes[HEADER_BYTES..].to_vec();
    let samples = bytes_to_samples(&data)?;
    let duration_secs = data.len() as f64 / (channels as f64 * 2.0 * sample_rate as f64);
    let file_sha256 = hex::encode(Sha256::digest(&bytes));

    log::debug!(
        "Read WAV {}: {} ch, {} Hz, {} samples, {:.2} s",
        path.display(),
        channels,
        sample_rate,
        samples.len(),
        duration_secs
    );

    Ok(WavInfo {
        channels,
        sample_rate,
        data,
        samples,
        duration_secs,
        file_sha256,
    })
}

/// Decode a 16-bit little-endian PCM payload into normalized floats
fn bytes_to_samples(input: &[u8]) -> Result<Vec<f32>, EngineError> {
    if input.len() % 2 != 0 {
        return Err(EngineError::InvalidWav(
            "PCM payload has an odd byte length".to_string(),
        ));
    }

    Ok(input
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}
