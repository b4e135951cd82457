//! Open ScreenStudio Viewer - browse and play back captured recordings.
//!
//! This is the library crate behind the viewer. It reads the local record
//! store the capture application writes into, materializes playable media
//! and manages the lifetime of the handles it hands out.

pub mod commands;
pub mod config;
pub mod library;
pub mod media;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use clap::{Parser, Subcommand};
use commands::library::{self as library_commands, ExportOutcome, LibraryState};
use commands::session;
use config::ViewerConfig;
use media::ResolvedReference;
use std::path::PathBuf;
use store::Recording;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "screenstudio-viewer", version, about = "Browse recordings in the local store")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the store directory
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Password, if the library is protected
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List recordings, most recent first
    List {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recording
    Delete { id: String },
    /// Write a recording's media to a file
    Export { id: String, output: PathBuf },
    /// Upsert recordings from a JSON file (object or array)
    Import { file: PathBuf },
}

/// Run the viewer CLI
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screenstudio_viewer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(store_dir) = cli.store_dir.clone() {
        config.store_dir = store_dir;
    }

    tracing::debug!("Starting viewer v{} with {:?}", env!("CARGO_PKG_VERSION"), config.store_dir);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(cli, config))
}

async fn execute(cli: Cli, config: ViewerConfig) -> anyhow::Result<()> {
    let state = LibraryState::from_config(&config);

    if let Some(password) = &cli.password {
        session::login(&state, password).await?;
    }

    let command = cli.command.unwrap_or(Command::List { json: false });
    let result = dispatch(&state, command).await;

    library_commands::teardown(&state).await;
    result
}

async fn dispatch(state: &LibraryState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { json } => list(state, json).await,
        Command::Delete { id } => {
            if library_commands::request_delete(state, &id).await? {
                println!("deleted {}", id);
            } else {
                println!("{} was not in the store", id);
            }
            Ok(())
        }
        Command::Export { id, output } => {
            match library_commands::export_recording(state, &id, &output).await? {
                ExportOutcome::Written { path, bytes, media_type } => {
                    println!("wrote {} bytes of {} to {}", bytes, media_type, path.display());
                }
                ExportOutcome::Remote { url } => println!("{} is hosted at {}", id, url),
            }
            Ok(())
        }
        Command::Import { file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let recordings = parse_recordings(&content)?;
            let written = library_commands::import_recordings(state, recordings).await?;
            println!("imported {} recordings", written);
            Ok(())
        }
    }
}

async fn list(state: &LibraryState, json: bool) -> anyhow::Result<()> {
    let snapshot = library_commands::request_refresh(state).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    for recording in &snapshot.records {
        let playback = match snapshot.reference(&recording.id) {
            Some(ResolvedReference::Remote { url }) => url.clone(),
            Some(ResolvedReference::Local(handle)) => {
                format!("{} ({}, {} bytes)", handle.url, handle.media_type, handle.size)
            }
            Some(ResolvedReference::Unavailable) | None => "unavailable".to_string(),
        };
        println!(
            "{}\t{}\t{}s\t{}B\t{}\t{}",
            recording.id,
            recording.created_at.to_rfc3339(),
            recording.duration,
            recording.size,
            recording.platform,
            playback
        );
    }
    if snapshot.records.is_empty() {
        println!("no recordings");
    }
    Ok(())
}

/// Parse either a single recording or an array of recordings
fn parse_recordings(content: &str) -> serde_json::Result<Vec<Recording>> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|recording| vec![recording])
    }
}
