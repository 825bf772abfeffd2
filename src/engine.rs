//! Ingest orchestration
//!
//! The engine is the only component that touches both the DSP stack and the
//! store. An ingest runs strictly left to right:
//!
//! ```text
//! stat → decode → WAV read → spectrogram → peaks → fingerprints
//!      → insert song → insert hashes → mark fingerprinted
//! ```
//!
//! The store protocol is crash-safe: dying between the song insert and the
//! final flag flip leaves a row at `fingerprinted = 0` that a re-run
//! completes (content-hash idempotence plus conflict-free hash inserts) or
//! that [`Engine::cleanup`] reclaims.

use std::path::Path;

use sha1::{Digest, Sha1};

use crate::config::Config;
use crate::dsp::{hashing, peaks, render, spectrogram};
use crate::error::EngineError;
use crate::io::{decoder, wav};
use crate::store::{SongRow, Store};

/// Progress callbacks for the fingerprint storage phase
///
/// All methods default to no-ops; install an implementation to drive a
/// progress display.
pub trait IngestObserver {
    /// Called once with the number of fingerprints about to be stored
    fn on_fingerprints_total(&self, _total: usize) {}
    /// Called after each fingerprint row is persisted
    fn on_fingerprint_stored(&self, _stored: usize) {}
}

/// Observer that reports nothing
pub struct NoopObserver;

impl IngestObserver for NoopObserver {}

/// What a cleanup pass reclaimed
#[derive(Debug, Clone, Copy)]
pub struct CleanupReport {
    /// Song rows removed
    pub songs_removed: u64,
    /// Fingerprint rows removed
    pub fingerprints_removed: u64,
}

/// Summary of a completed ingest
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Store-assigned song id
    pub song_id: u32,
    /// Song title derived from the file name
    pub name: String,
    /// Artist derived from the file name, may be empty
    pub artist: String,
    /// Number of spectral peaks found
    pub peaks: usize,
    /// Number of fingerprints persisted
    pub fingerprints: usize,
}

/// Fingerprinting engine bound to a store
pub struct Engine {
    config: Config,
    store: Store,
}

impl Engine {
    /// Connect to the configured store and make sure the schema exists
    pub async fn connect(config: Config) -> Result<Engine, EngineError> {
        let store = Store::connect(&config.database).await?;
        store.setup().await?;
        Ok(Engine { config, store })
    }

    /// Fingerprint one audio file and persist it
    ///
    /// When `image` is given, the spectrogram (with peaks marked) is also
    /// rendered to that path.
    ///
    /// # Errors
    ///
    /// Any pipeline or store failure aborts the ingest; see
    /// [`EngineError`] for the kinds. A failure after the song insert
    /// leaves the row at `fingerprinted = 0`, which a re-run repairs.
    pub async fn ingest(
        &self,
        path: &Path,
        image: Option<&Path>,
        observer: &dyn IngestObserver,
    ) -> Result<IngestReport, EngineError> {
        let metadata = std::fs::metadata(path)?;
        if metadata.is_dir() {
            return Err(EngineError::PathIsDirectory(path.display().to_string()));
        }

        log::info!("Processing audio file: {}", path.display());

        let scratch = tempfile::tempdir()?;
        let wav_path = scratch.path().join("canonical.wav");
        decoder::decode_to_wav(path, &wav_path)?;

        let info = wav::read_wav_info(&wav_path)?;
        if info.sample_rate != self.config.dsp.sampling_rate {
            log::warn!(
                "Source rate {} Hz differs from configured {} Hz",
                info.sample_rate,
                self.config.dsp.sampling_rate
            );
        }

        let mut samples = info.samples;
        if self.config.dsp.fingerprint_limit >= 0 {
            let cap = self.config.dsp.fingerprint_limit as u64 * info.sample_rate as u64;
            if (samples.len() as u64) > cap {
                log::debug!("Capping ingest at {} s of audio", self.config.dsp.fingerprint_limit);
                samples.truncate(cap as usize);
            }
        }

        let spectrogram = spectrogram::build(&samples, info.sample_rate, &self.config.dsp)?;
        let peaks = peaks::pick(&spectrogram, &self.config.dsp);
        log::info!("Found {} peaks in spectrogram", peaks.len());

        let fingerprints = hashing::pair(&peaks, &self.config.dsp);
        log::info!("Generated {} fingerprints", fingerprints.len());

        if let Some(image_path) = image {
            render::to_png(&spectrogram, &peaks, image_path)?;
        }

        // song identity comes from the original input, not the canonical WAV
        let file_hash = file_sha1(path)?;
        let (name, artist) = derive_song_identity(path);

        let song_id = self
            .store
            .insert_song(&name, &artist, &file_hash, fingerprints.len() as u32)
            .await?;

        log::info!("Storing fingerprints for song id {}", song_id);
        observer.on_fingerprints_total(fingerprints.len());
        for (stored, fingerprint) in fingerprints.iter().enumerate() {
            self.store
                .insert_fingerprint(&fingerprint.hash, song_id, fingerprint.offset)
                .await?;
            observer.on_fingerprint_stored(stored + 1);
        }

        // the flag flips only after every hash is durable
        self.store.update_song_fingerprinted(song_id).await?;
        log::info!("Successfully processed {}", name);

        Ok(IngestReport {
            song_id,
            name,
            artist,
            peaks: peaks.len(),
            fingerprints: fingerprints.len(),
        })
    }

    /// All songs in the store
    pub async fn list(&self) -> Result<Vec<SongRow>, EngineError> {
        self.store.list_songs().await
    }

    /// One song by id, if present
    pub async fn song(&self, song_id: u32) -> Result<Option<SongRow>, EngineError> {
        self.store.song_by_id(song_id).await
    }

    /// Delete a song and its fingerprints
    pub async fn delete(&self, song_id: u32) -> Result<(), EngineError> {
        if let Some(song) = self.store.song_by_id(song_id).await? {
            log::info!("Deleting song {} ('{}')", song_id, song.name);
        }
        self.store.delete_song(song_id).await
    }

    /// Reclaim orphaned store rows, reporting how many were removed
    pub async fn cleanup(&self) -> Result<CleanupReport, EngineError> {
        let songs_before = self.store.count_songs().await?;
        let fingerprints_before = self.store.count_fingerprints().await?;

        self.store.cleanup().await?;

        let report = CleanupReport {
            songs_removed: songs_before.saturating_sub(self.store.count_songs().await?),
            fingerprints_removed: fingerprints_before
                .saturating_sub(self.store.count_fingerprints().await?),
        };
        log::info!(
            "Cleanup removed {} songs and {} fingerprints",
            report.songs_removed,
            report.fingerprints_removed
        );
        Ok(report)
    }

    /// Close the store connection
    pub async fn close(&self) {
        self.store.close().await;
    }
}

/// SHA-1 of a file's bytes as 40 lowercase hex characters
pub fn file_sha1(path: &Path) -> Result<String, EngineError> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha1::digest(&bytes)))
}

/// Derive `(name, artist)` from a file name of the form
/// `"Artist -- rest.ext"` split on the first `--`
///
/// Without the separator the whole stem becomes the name and the artist is
/// empty.
pub fn derive_song_identity(path: &Path) -> (String, String) {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match file_name.split_once("--") {
        Some((artist, rest)) => {
            let song = rest.trim();
            let song = Path::new(song)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(song);
            (song.trim().to_string(), artist.trim().to_string())
        }
        None => {
            let stem = Path::new(file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file_name);
            (stem.to_string(), String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_with_separator() {
        let (name, artist) = derive_song_identity(Path::new("/music/Artist Name--Song Title.wav"));
        assert_eq!(name, "Song Title");
        assert_eq!(artist, "Artist Name");
    }

    #[test]
    fn test_identity_trims_whitespace() {
        let (name, artist) = derive_song_identity(Path::new("  The Band -- A Song .flac"));
        assert_eq!(name, "A Song");
        assert_eq!(artist, "The Band");
    }

    #[test]
    fn test_identity_without_separator() {
        let (name, artist) = derive_song_identity(Path::new("/music/NoSeparator.mp3"));
        assert_eq!(name, "NoSeparator");
        assert_eq!(artist, "");
    }

    #[test]
    fn test_identity_splits_on_first_separator_only() {
        let (name, artist) = derive_song_identity(Path::new("A--B--C.wav"));
        assert_eq!(artist, "A");
        assert_eq!(name, "B--C");
    }

    #[test]
    fn test_identity_keeps_interior_dots() {
        let (name, _) = derive_song_identity(Path::new("X--Mr. Blue Sky.mp3"));
        assert_eq!(name, "Mr. Blue Sky");
    }

    #[test]
    fn test_file_sha1_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha1(&path).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_file_sha1_missing_file() {
        assert!(matches!(
            file_sha1(Path::new("/no/such/input.mp3")),
            Err(EngineError::Io(_))
        ));
    }
}
