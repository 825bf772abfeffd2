//! MySQL store backend

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::error::EngineError;
use crate::store::{decode_file_hash, SongRow};

const CREATE_SONGS: &str = r#"
CREATE TABLE IF NOT EXISTS songs (
    id INT UNSIGNED NOT NULL AUTO_INCREMENT,
    name VARCHAR(250) NOT NULL,
    artist VARCHAR(250) NOT NULL DEFAULT '',
    fingerprinted TINYINT NOT NULL DEFAULT 0,
    file_sha1 BINARY(20) NOT NULL,
    total_hashes INT UNSIGNED NOT NULL DEFAULT 0,
    date_created DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    date_modified DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    PRIMARY KEY (id),
    UNIQUE KEY uq_songs_file_sha1 (file_sha1)
) ENGINE=InnoDB
"#;

const CREATE_FINGERPRINTS: &str = r#"
CREATE TABLE IF NOT EXISTS fingerprints (
    hash VARCHAR(64) NOT NULL,
    song_id INT UNSIGNED NOT NULL,
    offset_ms INT UNSIGNED NOT NULL,
    date_created DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    date_modified DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    UNIQUE KEY uq_fingerprints (hash, song_id, offset_ms),
    KEY idx_fingerprints_hash (hash),
    CONSTRAINT fk_fingerprints_song
        FOREIGN KEY (song_id) REFERENCES songs (id) ON DELETE CASCADE
) ENGINE=InnoDB
"#;

/// MySQL-backed song and fingerprint store
#[derive(Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Open a connection pool against the configured server
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EngineError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .connect(&config.url())
            .await?;
        log::debug!("Connected to MySQL at {}:{}", config.host, config.port);
        Ok(Self { pool })
    }

    /// Create both tables if absent
    pub async fn setup(&self) -> Result<(), EngineError> {
        sqlx::query(CREATE_SONGS).execute(&self.pool).await?;
        sqlx::query(CREATE_FINGERPRINTS).execute(&self.pool).await?;
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

        if let Some(row) = sqlx::query("SELECT id FROM songs WHERE file_sha1 = ?")
            .bind(&sha)
            .fetch_optional(&self.pool)
            .await?
        {
            let id: u32 = row.try_get(0)?;
            log::debug!("Song with hash {} already present as id {}", file_hash, id);
            return Ok(id);
        }

        let inserted = sqlx::query(
            "INSERT INTO songs (name, artist, fingerprinted, file_sha1, total_hashes) \
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(name)
        .bind(artist)
        .bind(&sha)
        .bind(total_hashes)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(done) => Ok(done.last_insert_id() as u32),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // a concurrent ingest of the same file won the insert race
                let row = sqlx::query("SELECT id FROM songs WHERE file_sha1 = ?")
                    .bind(&sha)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(row.try_get(0)?)
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
        sqlx::query("INSERT IGNORE INTO fingerprints (hash, song_id, offset_ms) VALUES (?, ?, ?)")
            .bind(hash)
            .bind(song_id)
            .bind(offset)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flip `fingerprinted` to 1
    pub async fn update_song_fingerprinted(&self, song_id: u32) -> Result<(), EngineError> {
        let done = sqlx::query(
            "UPDATE songs SET fingerprinted = 1, date_modified = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(song_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            // MySQL reports zero affected rows for a no-change update, so a
            // song that is already marked must not be treated as missing
            let exists = sqlx::query("SELECT 1 FROM songs WHERE id = ?")
                .bind(song_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(EngineError::NotFound(format!("song id {}", song_id)));
            }
        }
        Ok(())
    }

    /// All songs ordered by id
    pub async fn list_songs(&self) -> Result<Vec<SongRow>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, name, artist, fingerprinted, total_hashes, \
             CAST(date_created AS CHAR) AS date_created \
             FROM songs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            songs.push(SongRow {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                artist: row.try_get("artist")?,
                fingerprinted: row.try_get::<i8, _>("fingerprinted")? != 0,
                total_hashes: row.try_get("total_hashes")?,
                date_created: row.try_get("date_created")?,
            });
        }
        Ok(songs)
    }

    /// One song by id, if present
    pub async fn song_by_id(&self, song_id: u32) -> Result<Option<SongRow>, EngineError> {
        let row = sqlx::query(
            "SELECT id, name, artist, fingerprinted, total_hashes, \
             CAST(date_created AS CHAR) AS date_created \
             FROM songs WHERE id = ?",
        )
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(SongRow {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                artist: row.try_get("artist")?,
                fingerprinted: row.try_get::<i8, _>("fingerprinted")? != 0,
                total_hashes: row.try_get("total_hashes")?,
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
        let done = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(song_id)
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
            "DELETE s1 FROM songs s1 \
             INNER JOIN songs s2 ON s1.file_sha1 = s2.file_sha1 AND s1.id <> s2.id \
             WHERE s1.fingerprinted = 0 AND s2.fingerprinted = 1",
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
