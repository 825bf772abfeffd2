//! Command-line front-end for the fingerprinting engine
//!
//! One executable with mutually exclusive commands: ingest a file, list the
//! stored songs, delete a song by id, or clean up orphaned rows.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, CommandFactory, Parser};

use waveprint::engine::{Engine, IngestObserver};
use waveprint::Config;

#[derive(Parser)]
#[command(name = "waveprint")]
#[command(about = "Audio fingerprinting and identification engine")]
#[command(group = ArgGroup::new("command").args(["file", "list", "cleanup", "delete"]).multiple(false))]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml", value_name = "PATH")]
    config: PathBuf,

    /// Ingest one audio file (mp3, flac or wav)
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Also render the spectrogram (with peaks) to a PNG; only with --file
    #[arg(long, value_name = "PATH", requires = "file")]
    image: Option<PathBuf>,

    /// Print all songs in the database
    #[arg(long)]
    list: bool,

    /// Clean up orphaned songs and fingerprints
    #[arg(long)]
    cleanup: bool,

    /// Delete a song by its id
    #[arg(long, value_name = "ID")]
    delete: Option<u32>,
}

/// Logs coarse progress while fingerprints stream into the store
struct LogObserver;

impl IngestObserver for LogObserver {
    fn on_fingerprints_total(&self, total: usize) {
        log::info!("Storing {} fingerprints in database", total);
    }

    fn on_fingerprint_stored(&self, stored: usize) {
        if stored % 5000 == 0 {
            log::info!("Stored {} fingerprints", stored);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.file.is_none() && !cli.list && !cli.cleanup && cli.delete.is_none() {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), waveprint::EngineError> {
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::warn!(
            "Configuration file {} not found, using defaults",
            cli.config.display()
        );
        Config::default()
    };

    let engine = Engine::connect(config).await?;

    let result = dispatch(&engine, cli).await;
    engine.close().await;
    result
}

async fn dispatch(engine: &Engine, cli: Cli) -> Result<(), waveprint::EngineError> {
    if let Some(id) = cli.delete {
        engine.delete(id).await?;
        println!("Deleted song {}", id);
        return Ok(());
    }

    if cli.cleanup {
        let report = engine.cleanup().await?;
        println!(
            "Cleanup complete: removed {} songs and {} fingerprints",
            report.songs_removed, report.fingerprints_removed
        );
        return Ok(());
    }

    if cli.list {
        let songs = engine.list().await?;
        if songs.is_empty() {
            println!("No songs found in the database");
            return Ok(());
        }
        for song in songs {
            println!(
                "ID: {} | Name: {} | Artist: {} | Fingerprinted: {} | Hashes: {} | Created: {}",
                song.id,
                song.name,
                song.artist,
                song.fingerprinted,
                song.total_hashes,
                song.date_created
            );
        }
        return Ok(());
    }

    if let Some(path) = cli.file {
        let report = engine
            .ingest(&path, cli.image.as_deref(), &LogObserver)
            .await?;
        println!(
            "Ingested '{}' (id {}): {} peaks, {} fingerprints",
            report.name, report.song_id, report.peaks, report.fingerprints
        );
    }
    Ok(())
}
