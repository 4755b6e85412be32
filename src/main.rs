//! # mixchain
//!
//! Command-line front end of the chain search.
//!
//! ## Usage
//!
//! ```bash
//! # Chains from track 1042 to track 877, BPM-aware, 5% tolerance
//! mixchain --collection ~/Music/tracks.db search 1042 877
//!
//! # Key only, as JSON
//! mixchain search 1042 877 --key-only --json
//!
//! # Describe a key
//! mixchain key 8A
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::io;
use std::path::Path;

use mixchain::collection::{open_collection, Collection};
use mixchain::config::{self, Settings};
use mixchain::index::{CandidateIndex, TrackFilter};
use mixchain::key::KeyNode;
use mixchain::playlist::Playlist;
use mixchain::search::{ChainSearch, SearchMode, SearchRequest};
use mixchain::{cli, completion, report};

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn load_collection(settings: &Settings, cli_path: Option<&Path>) -> Result<Collection> {
    let path = settings.resolve_collection(cli_path)?;
    let source = open_collection(&path)?;
    info!("Loading collection from {}", source.describe());
    source.load()
}

fn parse_key(label: &str) -> Result<KeyNode> {
    label
        .parse()
        .with_context(|| format!("Cannot read `{label}` as a key"))
}

/// Main entry point for mixchain.
///
/// Initializes logging, parses command-line arguments, loads the settings
/// and routes the command.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug mixchain search 1 2` - Search decisions
/// - `RUST_LOG=mixchain::search=trace mixchain search 1 2` - Per-hop detail
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let settings = load_settings(args.settings.as_deref())?;
    debug!("Settings: {settings:?}");

    match args.command {
        cli::Command::Search {
            source,
            target,
            key_only,
            tolerance,
            bpm,
            artist,
            title,
            album,
            query,
            strict_key,
            max_length,
            limit,
            json,
            save,
        } => {
            let collection = load_collection(&settings, args.collection.as_deref())?;
            let index = CandidateIndex::new(collection);

            let mode = if key_only { SearchMode::KeyOnly } else { settings.mode };
            let request = SearchRequest::new(source, target)
                .mode(mode)
                .tolerance(tolerance.unwrap_or(settings.tolerance_pct))
                .current_bpm(bpm)
                .filter(TrackFilter { artist, title, album, query })
                .max_chain_length(max_length.unwrap_or(settings.max_chain_length))
                .strict_key(strict_key);

            let outcome = ChainSearch::new(&index).run(&request)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome).context("Failed to serialize search result")?);
            } else {
                println!("{}", report::format_outcome(&outcome, limit));
            }

            if let Some(requested) = save.filter(|_| !outcome.is_empty()) {
                let playlist = Playlist::from_chain(&outcome, 0, &[])?;
                let path = settings.resolve_playlist_path(&requested)?;
                playlist.save(&path)?;
                if !json {
                    println!("\nSaved playlist to {}", path.display());
                }
            }
        }
        cli::Command::Key { key } => {
            println!("{}", report::format_key(parse_key(&key)?));
        }
        cli::Command::List { key } => {
            let collection = load_collection(&settings, args.collection.as_deref())?;
            let wanted = key.as_deref().map(parse_key).transpose()?;
            let tracks = collection
                .iter()
                .filter(|track| wanted.map_or(true, |k| track.key_node() == Some(k)));
            let listing = report::format_tracks(tracks);
            if listing.is_empty() {
                println!("No tracks");
            } else {
                println!("{listing}");
            }
        }
        cli::Command::Init { force } => {
            let path = match args.settings {
                Some(path) => path,
                None => config::settings_path()?,
            };
            if path.exists() && !force {
                bail!("{} already exists, pass --force to overwrite it", path.display());
            }

            let mut settings = settings;
            if let Some(collection) = args.collection.as_deref() {
                settings.collection = Some(settings.resolve_collection(Some(collection))?);
            }
            settings.save(&path)?;
            println!("Wrote settings to {}", path.display());
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
        cli::Command::CompleteTracks => {
            // Completion must stay quiet when no collection is configured
            if let Ok(collection) = load_collection(&settings, args.collection.as_deref()) {
                completion::write_track_completions(&collection, &mut io::stdout().lock())?;
            }
        }
    }

    Ok(())
}
