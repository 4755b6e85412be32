//! # Command-Line Interface Module
//!
//! Defines the mixchain command line with Clap derive macros.
//!
//! ## Commands
//!
//! - `search`: find key chains between two tracks of the collection
//! - `key`: show the labels of a key and its compatible keys
//! - `list`: list the collection, optionally restricted to one key
//! - `completion`: generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! mixchain --collection ~/Music/tracks.db search 1042 877
//! mixchain search 1042 877 --key-only --json
//! mixchain search 1042 877 -t 3 --bpm 126 --save warmup.json
//! mixchain key 8A
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Global options pick the collection and the settings file; everything else
/// is accessed through a subcommand.
#[derive(Parser, Debug)]
#[command(name = "mixchain")]
#[command(about = "mixchain: harmonic transition chains between the tracks of a DJ collection")]
#[command(version)]
pub struct Args {
    /// Collection file to search (.json, or a SQLite .db)
    ///
    /// Overrides the `collection` entry of the settings file.
    #[arg(long, global = true, env = "MIXCHAIN_COLLECTION", value_hint = clap::ValueHint::FilePath)]
    pub collection: Option<PathBuf>,

    /// Settings file to use instead of the platform default
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub settings: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find chains of compatible keys between two tracks
    ///
    /// Walks the shortest paths of the key compatibility graph from the
    /// source track's key to the target track's key and fills every
    /// intermediate key with tracks from the collection. In BPM-aware mode
    /// (the default) each intermediate track must sit within the tolerance
    /// of the anchor tempo: the --bpm value if given, else the source BPM.
    ///
    /// Chains are listed shortest first, then by the total BPM offset of the
    /// best track of each hop.
    Search {
        /// Id of the track currently playing
        #[arg(value_hint = clap::ValueHint::Other)]
        source: String,

        /// Id of the track to arrive at
        #[arg(value_hint = clap::ValueHint::Other)]
        target: String,

        /// Match on key only and ignore tempo
        #[arg(long)]
        key_only: bool,

        /// BPM tolerance in percent
        ///
        /// Defaults to the settings file value, 5.0 if unset.
        #[arg(short, long, value_name = "PCT")]
        tolerance: Option<f64>,

        /// Tempo currently playing, used as the anchor instead of the source BPM
        #[arg(long, value_name = "BPM")]
        bpm: Option<f64>,

        /// Only use intermediate tracks whose artist contains this text
        #[arg(long)]
        artist: Option<String>,

        /// Only use intermediate tracks whose title contains this text
        #[arg(long)]
        title: Option<String>,

        /// Only use intermediate tracks whose album contains this text
        #[arg(long)]
        album: Option<String>,

        /// Only use intermediate tracks matching every word of this query
        ///
        /// Each word must appear somewhere in "artist title album".
        #[arg(short, long)]
        query: Option<String>,

        /// Drop tracks whose key moves off the hop key at the anchor tempo
        #[arg(long)]
        strict_key: bool,

        /// Longest chain considered, in key changes (at most 7)
        #[arg(long, value_name = "N")]
        max_length: Option<usize>,

        /// Show at most this many chains
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Save the best chain as a playlist
        ///
        /// Bare file names are placed in the playlist directory of the
        /// settings file, or the platform data directory.
        #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
        save: Option<PathBuf>,
    },

    /// Describe a key
    ///
    /// Accepts an Open Key label (8m, 1d), a Camelot label (5A, 8B), a note
    /// name (C, F#m, Bb minor) or a raw index 0-23. Prints every notation of
    /// the key and the keys it can move to in one step.
    Key {
        /// Key label or index
        key: String,
    },

    /// List tracks in the collection
    List {
        /// Only list tracks in this key
        #[arg(long)]
        key: Option<String>,
    },

    /// Write a settings file
    ///
    /// Stores the current settings, with the collection given by
    /// --collection if any, so later commands can omit it.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: mixchain completion bash > ~/.local/share/bash-completion/completions/mixchain
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List track ids for completion (hidden command)
    #[command(hide = true)]
    CompleteTracks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let args = Args::try_parse_from([
            "mixchain", "--collection", "tracks.json", "search", "a", "b", "-t", "3", "--key-only", "--limit", "2",
        ])
        .expect("arguments should parse");

        assert_eq!(args.collection, Some(PathBuf::from("tracks.json")));
        match args.command {
            Command::Search { source, target, tolerance, key_only, limit, json, .. } => {
                assert_eq!(source, "a");
                assert_eq!(target, "b");
                assert_eq!(tolerance, Some(3.0));
                assert!(key_only);
                assert_eq!(limit, Some(2));
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_collection_after_subcommand() {
        let args = Args::try_parse_from(["mixchain", "list", "--collection", "x.db"])
            .expect("arguments should parse");
        assert_eq!(args.collection, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn test_parse_init() {
        let args = Args::try_parse_from(["mixchain", "init", "--force"]).expect("arguments should parse");
        assert!(matches!(args.command, Command::Init { force: true }));
    }

    #[test]
    fn test_search_needs_both_ids() {
        assert!(Args::try_parse_from(["mixchain", "search", "only-one"]).is_err());
    }
}
