//! Error types for the fingerprinting engine

use std::fmt;

/// Errors that can occur while fingerprinting audio or talking to the store
#[derive(Debug)]
pub enum EngineError {
    /// Input file has an extension, codec or channel layout the decoder
    /// cannot canonicalise
    UnsupportedFormat(String),

    /// WAV file failed header validation or sample extraction
    InvalidWav(String),

    /// Downsampling was asked for an impossible rate conversion
    InvalidSampleRate(String),

    /// The processed stream was shorter than one analysis window
    SpectrogramEmpty,

    /// Ingest was pointed at a directory instead of a file
    PathIsDirectory(String),

    /// Configuration file could not be read or parsed
    Config(String),

    /// Underlying filesystem error
    Io(std::io::Error),

    /// Database error (connect, query, constraint)
    Store(sqlx::Error),

    /// A song id was not present in the store
    NotFound(String),

    /// Spectrogram image could not be encoded
    Render(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnsupportedFormat(msg) => write!(f, "unsupported format: {}", msg),
            EngineError::InvalidWav(msg) => write!(f, "invalid WAV file: {}", msg),
            EngineError::InvalidSampleRate(msg) => write!(f, "invalid sample rate: {}", msg),
            EngineError::SpectrogramEmpty => {
                write!(f, "audio is shorter than one analysis window")
            }
            EngineError::PathIsDirectory(path) => {
                write!(f, "path is a directory, expected a file: {}", path)
            }
            EngineError::Config(msg) => write!(f, "configuration error: {}", msg),
            EngineError::Io(err) => write!(f, "I/O error: {}", err),
            EngineError::Store(err) => write!(f, "store error: {}", err),
            EngineError::NotFound(msg) => write!(f, "not found: {}", msg),
            EngineError::Render(msg) => write!(f, "render error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(err) => Some(err),
            EngineError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err)
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(err)
    }
}

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => EngineError::Io(io),
            other => EngineError::InvalidWav(other.to_string()),
        }
    }
}
