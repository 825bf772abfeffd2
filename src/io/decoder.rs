//! Audio decoding and canonicalisation
//!
//! Turns an MP3, FLAC or WAV input into the one shape the rest of the
//! pipeline understands: a PCM-16 mono WAV on disk at the source sample
//! rate. Stereo inputs are folded to mono by averaging the channels
//! sample for sample.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::EngineError;

/// File extensions the decoder accepts
const SUPPORTED_EXTENSIONS: [&str; 3] = ["mp3", "flac", "wav"];

/// Decode an audio file and write it as canonical PCM-16 mono WAV
///
/// # Arguments
///
/// * `input` - Path to an `.mp3`, `.flac` or `.wav` file
/// * `output` - Where to write the canonical WAV
///
/// # Returns
///
/// The output path, for chaining into the WAV reader.
///
/// # Errors
///
/// Returns `EngineError::UnsupportedFormat` for unknown extensions, undecodable
/// streams, or channel layouts other than mono and stereo. I/O failures
/// surface as `EngineError::Io`.
pub fn decode_to_wav(input: &Path, output: &Path) -> Result<PathBuf, EngineError> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(EngineError::UnsupportedFormat(format!(
            "extension '{}' (expected mp3, flac or wav)",
            ext
        )));
    }

    let (samples, sample_rate, channels) = decode_samples(input, &ext)?;

    let mono = match channels {
        1 => samples,
        2 => fold_to_mono(&samples),
        n => {
            return Err(EngineError::UnsupportedFormat(format!(
                "{} channels (expected mono or stereo)",
                n
            )))
        }
    };

    log::debug!(
        "Decoded {}: {} Hz, {} ch, {} mono samples",
        input.display(),
        sample_rate,
        channels,
        mono.len()
    );

    write_pcm16_wav(output, &mono, sample_rate)?;
    Ok(output.to_path_buf())
}

/// Decode interleaved f32 samples plus stream parameters via symphonia
fn decode_samples(input: &Path, ext: &str) -> Result<(Vec<f32>, u32, usize), EngineError> {
    let file = File::open(input)?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(ext);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            EngineError::UnsupportedFormat(format!("cannot probe {}: {}", input.display(), e))
        })?;
    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| {
        EngineError::UnsupportedFormat(format!("no audio track in {}", input.display()))
    })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params.sample_rate.ok_or_else(|| {
        EngineError::UnsupportedFormat("stream does not declare a sample rate".to_string())
    })?;
    let channels = codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| {
            EngineError::UnsupportedFormat("stream does not declare a channel layout".to_string())
        })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::UnsupportedFormat(format!("no decoder: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // end of stream or a malformed tail; keep what was decoded
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buffer =
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // recoverable decode errors skip the packet
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => {
                return Err(EngineError::UnsupportedFormat(format!(
                    "decode failed: {}",
                    e
                )))
            }
        }
    }

    Ok((samples, sample_rate, channels))
}

/// Average interleaved stereo pairs into a mono stream
fn fold_to_mono(interleaved: &[f32]) -> Vec<f32> {
    interleaved
        .chunks(2)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Write normalized samples as a PCM-16 mono WAV
fn write_pcm16_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), EngineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::wav::read_wav_info;

    fn write_stereo_wav(path: &Path, left: &[i16], right: &[i16], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for (&l, &r) in left.iter().zip(right.iter()) {
            writer.write_sample(l).unwrap();
            writer.write_sample(r).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = decode_to_wav(Path::new("song.ogg"), Path::new("out.wav")).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_extension_rejected() {
        let err = decode_to_wav(Path::new("song"), Path::new("out.wav")).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_stereo_wav_folds_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stereo.wav");
        let output = dir.path().join("mono.wav");

        // opposite-phase channels cancel to silence when averaged
        let left = vec![10_000i16; 4096];
        let right = vec![-10_000i16; 4096];
        write_stereo_wav(&input, &left, &right, 44_100);

        decode_to_wav(&input, &output).unwrap();

        let info = read_wav_info(&output).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.samples.len(), 4096);
        assert!(info.samples.iter().all(|&s| s.abs() < 1e-3));
    }

    #[test]
    fn test_mono_wav_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mono_in.wav");
        let output = dir.path().join("mono_out.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..2048i32 {
            writer.write_sample(((i % 64) * 256) as i16).unwrap();
        }
        writer.finalize().unwrap();

        decode_to_wav(&input, &output).unwrap();

        let info = read_wav_info(&output).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 22_050);
        assert_eq!(info.samples.len(), 2048);
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.mp3");
        std::fs::write(&input, b"this is not audio at all").unwrap();

        let err = decode_to_wav(&input, &dir.path().join("out.wav")).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }
}
