//! Harmonic transition chains between the tracks of a DJ collection.
//!
//! Given the track playing now and the track to arrive at, mixchain finds
//! every shortest path through the graph of compatible keys and fills each
//! intermediate key with tracks that can be mixed in, optionally within a
//! BPM tolerance of the tempo currently playing.
//!
//! Core modules:
//! - [`key`] - The 24 musical keys and their Open Key, Camelot and note labels
//! - [`graph`] - Key compatibility graph and shortest path enumeration
//! - [`bpm`] - BPM tolerance windows and tempo-induced key shifts
//! - [`collection`] - Tracks, collection snapshots and their JSON/SQLite sources
//! - [`index`] - Per-key candidate lookup with tag filters
//! - [`search`] - The chain search itself
//! - [`result`] - Search results, serializable to JSON
//! - [`error`] - Search errors
//!
//! ### Supporting Modules
//!
//! - [`config`] - Settings file and data directory management
//! - [`playlist`] - Saving a chosen chain as a playlist
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`report`] - Plain-text rendering for the command line
//!
//! ## Quick Start Example
//!
//! ```
//! use mixchain::collection::{Collection, Track};
//! use mixchain::index::CandidateIndex;
//! use mixchain::key::{KeyNode, Mode};
//! use mixchain::search::{search, SearchRequest};
//!
//! let c_major = KeyNode::from_parts(0, Mode::Major);
//! let d_major = KeyNode::from_parts(2, Mode::Major);
//! let index = CandidateIndex::new(Collection::new(vec![
//!     Track::new("1", "Artist", "Opener").with_bpm(124.0).with_key(c_major),
//!     Track::new("2", "Artist", "Bridge").with_bpm(125.0).with_key(c_major.transpose(1)),
//!     Track::new("3", "Artist", "Closer").with_bpm(126.0).with_key(d_major),
//! ]));
//!
//! let outcome = search(&index, &SearchRequest::new("1", "3"))?;
//! let best = outcome.best().expect("one chain through C# major");
//! assert_eq!(best.length(), 2);
//! assert_eq!(best.hops[0].candidates[0].track.id.as_str(), "2");
//! # Ok::<(), mixchain::error::SearchError>(())
//! ```
//!
//! ## Compatibility Rules
//!
//! A track can follow another when its key is the same, a semitone up or
//! down in the same mode, or the relative major/minor. In BPM-aware mode
//! every intermediate track must sit within the tolerance of one anchor
//! tempo: the override if given, else the source track's BPM.

pub mod bpm;
pub mod cli;
pub mod collection;
pub mod completion;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod key;
pub mod playlist;
pub mod report;
pub mod result;
pub mod search;

pub use collection::{Collection, Track, TrackId};
pub use error::SearchError;
pub use index::{CandidateIndex, TrackFilter};
pub use key::{describe_key, KeyNode};
pub use result::SearchOutcome;
pub use search::{search, search_batch, ChainSearch, SearchMode, SearchRequest};
