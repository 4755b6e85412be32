//! # Collection Module
//!
//! Track records and the immutable collection snapshot the engine searches.
//!
//! A [`Collection`] is built once per session from a [`CollectionSource`] and
//! never changes afterwards. It is reference counted, so cloning it is cheap
//! and many searches can share one snapshot across threads. Reloading means
//! building a new snapshot; searches already holding the old one keep it.
//!
//! ## Sources
//!
//! - [`JsonCollection`]: a JSON array of tracks, or an object with a
//!   `tracks` array (the shape of a DJ software export)
//! - [`SqliteCollection`]: a `tracks` table in an SQLite database

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::key::KeyNode;
use crate::result::TrackSummary;

/// Stable identity of a track within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A track as supplied by the collection provider.
///
/// `bpm` and `key` hold the metadata exactly as provided. Use
/// [`Track::bpm_value`] and [`Track::key_node`] for the validated values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackRecord")]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Key index `pitch_class * 2 + mode`, see [`KeyNode`]
    #[serde(default)]
    pub key: Option<i64>,
}

/// Serialized form of a [`Track`]. Exports that carry a Traktor
/// `musical_key` instead of `key` are converted on load.
#[derive(Deserialize)]
struct TrackRecord {
    id: TrackId,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    bpm: Option<f64>,
    #[serde(default)]
    key: Option<i64>,
    #[serde(default)]
    musical_key: Option<i64>,
}

impl From<TrackRecord> for Track {
    fn from(record: TrackRecord) -> Self {
        // out-of-range values stay as supplied and read as missing
        let traktor = record
            .musical_key
            .map(|raw| KeyNode::from_traktor(raw).map_or(raw, |key| i64::from(key.index())));
        Self {
            id: record.id,
            artist: record.artist,
            title: record.title,
            album: record.album,
            bpm: record.bpm,
            key: record.key.or(traktor),
        }
    }
}

impl Track {
    pub fn new(id: impl Into<TrackId>, artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            artist: artist.into(),
            title: title.into(),
            album: String::new(),
            bpm: None,
            key: None,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    #[must_use]
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: KeyNode) -> Self {
        self.key = Some(i64::from(key.index()));
        self
    }

    /// BPM when known and usable (finite and positive)
    #[must_use]
    pub fn bpm_value(&self) -> Option<f64> {
        self.bpm.filter(|bpm| bpm.is_finite() && *bpm > 0.0)
    }

    /// True when a BPM is present but cannot be a tempo (negative, NaN, infinite)
    #[must_use]
    pub fn has_malformed_bpm(&self) -> bool {
        matches!(self.bpm, Some(bpm) if !(bpm.is_finite() && bpm >= 0.0))
    }

    /// Key when known and in range
    #[must_use]
    pub fn key_node(&self) -> Option<KeyNode> {
        self.key.and_then(KeyNode::from_raw)
    }

    /// `Artist - Title`, or whichever half is present
    #[must_use]
    pub fn display_name(&self) -> String {
        TrackSummary::from(self).display_name()
    }
}

/// Read-only snapshot of a track collection
#[derive(Debug, Clone)]
pub struct Collection {
    tracks: Arc<[Track]>,
    positions: Arc<HashMap<TrackId, usize>>,
}

impl Collection {
    /// Build a snapshot. When an id repeats, the first track with it wins.
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        let mut kept = Vec::with_capacity(tracks.len());
        let mut positions = HashMap::with_capacity(tracks.len());

        for track in tracks {
            if positions.contains_key(&track.id) {
                warn!("Duplicate track id `{}` ignored", track.id);
                continue;
            }
            positions.insert(track.id.clone(), kept.len());
            kept.push(track);
        }

        Self {
            tracks: kept.into(),
            positions: Arc::new(positions),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    #[must_use]
    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.position(id).map(|pos| &self.tracks[pos])
    }

    /// Index of a track in snapshot order
    #[must_use]
    pub fn position(&self, id: &TrackId) -> Option<usize> {
        self.positions.get(id).copied()
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FromIterator<Track> for Collection {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Something that can produce a collection snapshot
pub trait CollectionSource {
    /// Load every track into a fresh snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read or parsed
    fn load(&self) -> Result<Collection>;

    /// Human readable origin, for logs and messages
    fn describe(&self) -> String;
}

/// Collection stored as a JSON document
#[derive(Debug, Clone)]
pub struct JsonCollection {
    path: PathBuf,
}

impl JsonCollection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonExport {
    Bare(Vec<Track>),
    Wrapped { tracks: Vec<Track> },
}

impl CollectionSource for JsonCollection {
    fn load(&self) -> Result<Collection> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read collection file {}", self.path.display()))?;
        let export: JsonExport = serde_json::from_str(&raw)
            .with_context(|| format!("Collection file {} is not a valid track list", self.path.display()))?;

        let tracks = match export {
            JsonExport::Bare(tracks) | JsonExport::Wrapped { tracks } => tracks,
        };
        info!("Loaded {} tracks from {}", tracks.len(), self.describe());
        Ok(Collection::new(tracks))
    }

    fn describe(&self) -> String {
        format!("JSON collection {}", self.path.display())
    }
}

/// Collection stored in the `tracks` table of an SQLite database.
///
/// Expected columns: `id` (text or integer), `artist`, `title`, `album`,
/// `bpm` (real, nullable) and `key` (integer, nullable).
#[derive(Debug, Clone)]
pub struct SqliteCollection {
    path: PathBuf,
}

impl SqliteCollection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Id column as text whatever its storage class
fn id_from_ref(value: ValueRef<'_>) -> rusqlite::Result<TrackId> {
    match value {
        ValueRef::Integer(i) => Ok(TrackId::new(i.to_string())),
        ValueRef::Text(t) => Ok(TrackId::new(String::from_utf8_lossy(t))),
        other => Err(rusqlite::Error::InvalidColumnType(
            0,
            "id".to_string(),
            other.data_type(),
        )),
    }
}

impl CollectionSource for SqliteCollection {
    fn load(&self) -> Result<Collection> {
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open collection database {}", self.path.display()))?;

        let mut stmt = conn
            .prepare("SELECT id, artist, title, album, bpm, key FROM tracks ORDER BY rowid")
            .context("Collection database has no usable `tracks` table")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Track {
                    id: id_from_ref(row.get_ref(0)?)?,
                    artist: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    album: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    bpm: row.get(4)?,
                    key: row.get(5)?,
                })
            })
            .context("Failed to query tracks")?;

        let mut tracks = Vec::new();
        for track in rows {
            tracks.push(track.context("Failed to read track row")?);
        }

        info!("Loaded {} tracks from {}", tracks.len(), self.describe());
        Ok(Collection::new(tracks))
    }

    fn describe(&self) -> String {
        format!("SQLite collection {}", self.path.display())
    }
}

/// Pick a source for `path` from its extension
///
/// # Errors
///
/// Returns an error for extensions that name no known collection format
pub fn open_collection(path: &Path) -> Result<Box<dyn CollectionSource>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    debug!("Opening collection {} (.{extension})", path.display());
    match extension.as_str() {
        "json" => Ok(Box::new(JsonCollection::new(path))),
        "db" | "db3" | "sqlite" | "sqlite3" => Ok(Box::new(SqliteCollection::new(path))),
        _ => bail!(
            "Unsupported collection file {}: expected .json or an SQLite database (.db, .sqlite)",
            path.display()
        ),
    }
}
