//! PostgreSQL store backend

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::error::EngineError;
use crate::store::{decode_file_hash, SongRow};

const CREATE_SONGS: &str = r#"
CREATE TABLE IF NOT EXISTS songs (
    id SERIAL PRIMARY KEY,
    name VARCHAR(250) NOT NULL,
    artist VARCHAR(250) NOT NULL DEFAULT '',
    fingerprinted SMALLINT NOT NULL DEFAULT 0,
    file_sha1 BYTEA NOT NULL UNIQUE,
    total_hashes BIGINT NOT NULL DEFAULT 0,
    date_created TIMESTAMPTZ NOT NULL DEFAULT now(),
    date_modified TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_FINGERPRINTS: &str = r#"
CREATE TABLE IF NOT EXISTS fingerprints (
    hash VARCHAR(64) NOT NULL,
    song_id INTEGER NOT NULL REFERENCES songs (id) ON DELETE CASCADE,
    offset_ms BIGINT NOT NULL,
    date_created TIMESTAMPTZ NOT NULL DEFAULT now(),
    date_modified TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (hash, song_id, offset_ms)
)
"#;

const CREATE_HASH_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_fingerprints_hash ON fingerprints (hash)";

/// PostgreSQL-backed song and fingerprint store
#[derive(Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Open a connection pool against the configured server
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EngineError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&config.url())
            .await?;
        log::debug!("Connected to PostgreSQL at {}:{}", config.host, config.port);
        Ok(Self { pool })
    }

    /// Create both tables and the hash index if absent
    pub async fn setup(&self) -> Result<(), EngineError> {
        sqlx::query(CREATE_SONGS).execute(&self.pool).await?;
        sqlx::query(CREATE_FINGERPRINTS).execute(&self.pool).await?;
        sqlx::query(CREATE_HASH_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// Content-hash idempotent song insert
    pub async fn insert_song(
        &self,
        name: &str,
        artist: &str,
        file_hash: &str,
        total_hashes: u32,
    ) -> Result<u32, EngineError> {
        let sha = decode_file_hash(file_hash)?;

        if let Some(row) = sqlx::query("SELECT id FROM songs WHERE file_sha1 = $1")
            .bind(&sha)
            .fetch_optional(&self.pool)
            .await?
        {
            let id: i32 = row.try_get(0)?;
            log::debug!("Song with hash {} already present as id {}", file_hash, id);
            return Ok(id as u32);
        }

        let inserted = sqlx::query(
            "INSERT INTO songs (name, artist, fingerprinted, file_sha1, total_hashes) \
             VALUES ($1, $2, 0, $3, $4) RETURNING id",
        )
        .bind(name)
        .bind(artist)
        .bind(&sha)
        .bind(total_hashes as i64)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => {
                let id: i32 = row.try_get(0)?;
                Ok(id as u32)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // a concurrent ingest of the same file won the insert race
                let row = sqlx::query("SELECT id FROM songs WHERE file_sha1 = $1")
                    .bind(&sha)
                    .fetch_one(&self.pool)
                    .await?;
                let id: i32 = row.try_get(0)?;
                Ok(id as u32)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert one fingerprint row, ignoring duplicates
    pub async fn insert_fingerprint(
        &self,
        hash: &str,
        song_id: u32,
        offset: u32,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO fingerprints (hash, song_id, offset_ms) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(hash)
        .bind(song_id as i32)
        .bind(offset as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Flip `fingerprinted` to 1
    pub async fn update_song_fingerprinted(&self, song_id: u32) -> Result<(), EngineError> {
        let done = sqlx::query(
            "UPDATE songs SET fingerprinted = 1, date_modified = now() WHERE id = $1",
        )
        .bind(song_id as i32)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("song id {}", song_id)));
        }
        Ok(())
    }

    /// All songs ordered by id
    pub async fn list_songs(&self) -> Result<Vec<SongRow>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, name, artist, fingerprinted, total_hashes, \
             to_char(date_created, 'YYYY-MM-DD HH24:MI:SS') AS date_created \
             FROM songs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            songs.push(SongRow {
                id: row.try_get::<i32, _>("id")? as u32,
                name: row.try_get("name")?,
                artist: row.try_get("artist")?,
                fingerprinted: row.try_get::<i16, _>("fingerprinted")? != 0,
                total_hashes: row.try_get::<i64, _>("total_hashes")? as u32,
                date_created: row.try_get("date_created")?,
            });
        }
        Ok(songs)
    }

    /// One song by id, if present
    pub async fn song_by_id(&self, song_id: u32) -> Result<Option<SongRow>, EngineError> {
        let row = sqlx::query(
            "SELECT id, name, artist, fingerprinted, total_hashes, \
             to_char(date_created, 'YYYY-MM-DD HH24:MI:SS') AS date_created \
             FROM songs WHERE id = $1",
        )
        .bind(song_id as i32)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(SongRow {
                id: row.try_get::<i32, _>("id")? as u32,
                name: row.try_get("name")?,
                artist: row.try_get("artist")?,
                fingerprinted: row.try_get::<i16, _>("fingerprinted")? != 0,
                total_hashes: row.try_get::<i64, _>("total_hashes")? as u32,
                date_created: row.try_get("date_created")?,
            })),
            None => Ok(None),
        }
    }

    /// Number of song rows
    pub async fn count_songs(&self) -> Result<u64, EngineError> {
        let row = sqlx::query("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)? as u64)
    }

    /// Number of fingerprint rows
    pub async fn count_fingerprints(&self) -> Result<u64, EngineError> {
        let row = sqlx::query("SELECT COUNT(*) FROM fingerprints")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)? as u64)
    }

    /// Delete a song; fingerprints follow via the cascade
    pub async fn delete_song(&self, song_id: u32) -> Result<(), EngineError> {
        let done = sqlx::query("DELETE FROM songs WHERE id = $1")
            .bind(song_id as i32)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("song id {}", song_id)));
        }
        Ok(())
    }

    /// Reclaim garbage rows
    pub async fn cleanup(&self) -> Result<(), EngineError> {
        // unfingerprinted duplicates of a finished song go first, so the
        // finished copy survives
        sqlx::query(
            "DELETE FROM songs s1 USING songs s2 \
             WHERE s1.file_sha1 = s2.file_sha1 AND s1.id <> s2.id \
             AND s1.fingerprinted = 0 AND s2.fingerprinted = 1",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM songs WHERE fingerprinted = 0")
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM fingerprints WHERE song_id NOT IN (SELECT id FROM songs)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
