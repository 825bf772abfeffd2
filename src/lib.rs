//! # Waveprint
//!
//! An audio fingerprinting and identification engine in the Shazam
//! tradition. Given an audio file, it produces a compact set of
//! landmark-pair hashes that identify the recording under noise and
//! persists them in a relational store keyed by song identity.
//!
//! ## Pipeline
//!
//! ```text
//! Audio file → Decode (mono PCM-16 WAV) → Spectrogram → Peaks → Hashes → Store
//! ```
//!
//! - **Decode**: MP3, FLAC or WAV is canonicalised to a mono PCM-16 WAV at
//!   the source rate, folding stereo by averaging.
//! - **Spectrogram**: a low-passed, decimated short-time Fourier transform
//!   with a Hamming window and 50% overlap.
//! - **Peaks**: strict 2-D local maxima above a magnitude threshold.
//! - **Hashes**: each anchor peak pairs with a bounded fan of later peaks;
//!   pairs encode as `"anchorFreq|targetFreq|deltaMs"`.
//! - **Store**: MySQL or PostgreSQL, with content-hash idempotent song
//!   inserts and a fingerprinted flag that flips only after every hash is
//!   durable.
//!
//! ## Quick start
//!
//! ```no_run
//! use waveprint::{fingerprint_samples, DspConfig};
//!
//! // Mono samples, normalized to [-1.0, 1.0]
//! let samples: Vec<f32> = vec![0.0; 44_100 * 2];
//! let fingerprints = fingerprint_samples(&samples, 44_100, &DspConfig::default())?;
//! println!("{} fingerprints", fingerprints.len());
//! # Ok::<(), waveprint::EngineError>(())
//! ```
//!
//! Store-backed ingest goes through [`Engine`], which owns the database
//! connection for the duration of a run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod io;
pub mod store;

// Re-export main types
pub use config::{Config, DatabaseConfig, Driver, DspConfig};
pub use dsp::hashing::Fingerprint;
pub use dsp::peaks::Peak;
pub use dsp::spectrogram::Spectrogram;
pub use engine::{CleanupReport, Engine, IngestObserver, IngestReport, NoopObserver};
pub use error::EngineError;
pub use io::wav::WavInfo;
pub use store::{SongRow, Store};

/// Fingerprint a mono sample stream
///
/// Runs the in-memory half of the pipeline: spectrogram, peak picking and
/// constellation pairing. Store interaction is left to [`Engine`].
///
/// # Arguments
///
/// * `samples` - Mono samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Pipeline tuning parameters
///
/// # Errors
///
/// Returns `EngineError::SpectrogramEmpty` when the stream is shorter than
/// one analysis window, and configuration or rate errors from the DSP
/// stages.
pub fn fingerprint_samples(
    samples: &[f32],
    sample_rate: u32,
    config: &DspConfig,
) -> Result<Vec<Fingerprint>, EngineError> {
    let spectrogram = dsp::spectrogram::build(samples, sample_rate, config)?;
    let peaks = dsp::peaks::pick(&spectrogram, config);
    Ok(dsp::hashing::pair(&peaks, config))
}
