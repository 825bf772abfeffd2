//! Song and fingerprint persistence
//!
//! Two SQL dialects implement one dialect-agnostic contract. [`Store`] is
//! the variant the orchestrator talks to; construction picks the backend
//! from the database configuration.
//!
//! The write protocol is two-phase: a song row is inserted in state
//! `fingerprinted = 0`, its hashes are bulk-inserted, and only then is the
//! flag flipped to 1. Rows stuck at 0 are garbage that [`Store::cleanup`]
//! reclaims. Re-ingesting a file is idempotent: the song is found again by
//! its content hash and duplicate fingerprint rows are ignored by the
//! uniqueness constraint.

pub mod mysql;
pub mod postgres;

use crate::config::{DatabaseConfig, Driver};
use crate::error::EngineError;

pub use mysql::MySqlStore;
pub use postgres::PostgresStore;

/// A song row as returned by listing
#[derive(Debug, Clone)]
pub struct SongRow {
    /// Store-assigned id
    pub id: u32,
    /// Song title
    pub name: String,
    /// Artist, may be empty
    pub artist: String,
    /// Whether all hashes for this song were persisted
    pub fingerprinted: bool,
    /// Number of hashes counted at insert time
    pub total_hashes: u32,
    /// Creation timestamp, formatted by the backend
    pub date_created: String,
}

/// Dialect-dispatched store handle
#[derive(Debug)]
pub enum Store {
    /// MySQL / MariaDB backend
    MySql(MySqlStore),
    /// PostgreSQL backend
    Postgres(PostgresStore),
}

impl Store {
    /// Connect to the backend named by the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Store, EngineError> {
        match config.driver {
            Driver::Mysql => Ok(Store::MySql(MySqlStore::connect(config).await?)),
            Driver::Postgres => Ok(Store::Postgres(PostgresStore::connect(config).await?)),
        }
    }

    /// Create tables, indexes and constraints if absent
    pub async fn setup(&self) -> Result<(), EngineError> {
        match self {
            Store::MySql(s) => s.setup().await,
            Store::Postgres(s) => s.setup().await,
        }
    }

    /// Insert a song, or return the existing id when the content hash is
    /// already present. New rows start with `fingerprinted = 0`.
    pub async fn insert_song(
        &self,
        name: &str,
        artist: &str,
        file_hash: &str,
        total_hashes: u32,
    ) -> Result<u32, EngineError> {
        match self {
            Store::MySql(s) => s.insert_song(name, artist, file_hash, total_hashes).await,
            Store::Postgres(s) => s.insert_song(name, artist, file_hash, total_hashes).await,
        }
    }

    /// Insert one fingerprint row; duplicates are silently ignored
    pub async fn insert_fingerprint(
        &self,
        hash: &str,
        song_id: u32,
        offset: u32,
    ) -> Result<(), EngineError> {
        match self {
            Store::MySql(s) => s.insert_fingerprint(hash, song_id, offset).await,
            Store::Postgres(s) => s.insert_fingerprint(hash, song_id, offset).await,
        }
    }

    /// Transition a song to `fingerprinted = 1`
    ///
    /// # Errors
    ///
    /// `EngineError::NotFound` if the id is not in the store.
    pub async fn update_song_fingerprinted(&self, song_id: u32) -> Result<(), EngineError> {
        match self {
            Store::MySql(s) => s.update_song_fingerprinted(song_id).await,
            Store::Postgres(s) => s.update_song_fingerprinted(song_id).await,
        }
    }

    /// All songs, ordered by id
    pub async fn list_songs(&self) -> Result<Vec<SongRow>, EngineError> {
        match self {
            Store::MySql(s) => s.list_songs().await,
            Store::Postgres(s) => s.list_songs().await,
        }
    }

    /// One song by id, if present
    pub async fn song_by_id(&self, song_id: u32) -> Result<Option<SongRow>, EngineError> {
        match self {
            Store::MySql(s) => s.song_by_id(song_id).await,
            Store::Postgres(s) => s.song_by_id(song_id).await,
        }
    }

    /// Number of song rows
    pub async fn count_songs(&self) -> Result<u64, EngineError> {
        match self {
            Store::MySql(s) => s.count_songs().await,
            Store::Postgres(s) => s.count_songs().await,
        }
    }

    /// Number of fingerprint rows
    pub async fn count_fingerprints(&self) -> Result<u64, EngineError> {
        match self {
            Store::MySql(s) => s.count_fingerprints().await,
            Store::Postgres(s) => s.count_fingerprints().await,
        }
    }

    /// Delete a song; its fingerprints go with it via the cascade
    ///
    /// # Errors
    ///
    /// `EngineError::NotFound` if the id is not in the store.
    pub async fn delete_song(&self, song_id: u32) -> Result<(), EngineError> {
        match self {
            Store::MySql(s) => s.delete_song(song_id).await,
            Store::Postgres(s) => s.delete_song(song_id).await,
        }
    }

    /// Reclaim garbage, in order: unfingerprinted duplicates of finished
    /// songs, then all unfingerprinted songs, then orphaned fingerprints
    pub async fn cleanup(&self) -> Result<(), EngineError> {
        match self {
            Store::MySql(s) => s.cleanup().await,
            Store::Postgres(s) => s.cleanup().await,
        }
    }

    /// Close the connection pool
    pub async fn close(&self) {
        match self {
            Store::MySql(s) => s.close().await,
            Store::Postgres(s) => s.close().await,
        }
    }
}

/// Decode the 40-char hex content hash into the 20 raw bytes the schema
/// stores
pub(crate) fn decode_file_hash(file_hash: &str) -> Result<Vec<u8>, EngineError> {
    let bytes = hex::decode(file_hash)
        .map_err(|e| EngineError::Config(format!("file hash is not hex: {}", e)))?;
    if bytes.len() != 20 {
        return Err(EngineError::Config(format!(
            "file hash must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
