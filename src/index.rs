//! # Candidate Index
//!
//! Read-only lookup from a key (and, for BPM-aware searches, a tempo window)
//! to the tracks that can fill a hop.
//!
//! The index buckets a [`Collection`] snapshot by key once, at construction.
//! Queries never mutate it, so one index can serve any number of concurrent
//! searches. Tracks without a usable key are left out of every bucket, and
//! tracks with an unusable BPM never enter a BPM-aware result; neither is
//! ever treated as a wildcard.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::bpm::{adjusted_key, BpmWindow};
use crate::collection::{Collection, Track};
use crate::key::{KeyNode, KEY_COUNT};
use crate::result::{Candidate, TrackSummary};

/// Optional substring filters on track tags, all case-insensitive.
///
/// Empty or whitespace-only fields do not filter. `query` is split on
/// whitespace and every word must occur in "artist title album".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFilter {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub query: Option<String>,
}

fn needle(field: Option<&String>) -> Option<String> {
    field
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

impl TrackFilter {
    /// True when no field restricts anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.artist, &self.title, &self.album, &self.query]
            .into_iter()
            .all(|field| needle(field.as_ref()).is_none())
    }

    #[must_use]
    pub fn matches(&self, track: &Track) -> bool {
        let contains = |haystack: &str, field: Option<&String>| {
            needle(field).map_or(true, |n| haystack.to_lowercase().contains(&n))
        };

        if !contains(&track.artist, self.artist.as_ref())
            || !contains(&track.title, self.title.as_ref())
            || !contains(&track.album, self.album.as_ref())
        {
            return false;
        }

        match needle(self.query.as_ref()) {
            Some(query) => {
                let combined = format!("{} {} {}", track.artist, track.title, track.album).to_lowercase();
                query.split_whitespace().all(|word| combined.contains(word))
            }
            None => true,
        }
    }
}

/// How a hop's candidates are selected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criteria {
    /// Key match only
    KeyOnly,
    /// Key match plus a BPM window around the search anchor
    Bpm {
        window: BpmWindow,
        /// Drop tracks whose tempo-shifted key leaves the hop key
        strict_key: bool,
    },
}

/// Tracks of one snapshot bucketed by key
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    collection: Collection,
    by_key: Vec<Vec<usize>>,
}

impl CandidateIndex {
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        let mut by_key = vec![Vec::new(); usize::from(KEY_COUNT)];
        let mut keyless = 0usize;

        for (position, track) in collection.iter().enumerate() {
            match track.key_node() {
                Some(key) => by_key[usize::from(key.index())].push(position),
                None => keyless += 1,
            }
        }

        debug!(
            "Indexed {} tracks, {keyless} without a usable key",
            collection.len()
        );
        Self { collection, by_key }
    }

    /// The snapshot this index was built from
    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Number of indexed tracks in `key`, before any filtering
    #[must_use]
    pub fn count(&self, key: KeyNode) -> usize {
        self.by_key[usize::from(key.index())].len()
    }

    /// Tracks that can fill a hop in `key`.
    ///
    /// BPM-aware results are ordered by offset magnitude, then by snapshot
    /// order; key-only results keep snapshot order. Malformed tracks are
    /// skipped. An empty result is a normal outcome.
    #[must_use]
    pub fn query(&self, key: KeyNode, criteria: &Criteria, filter: &TrackFilter) -> Vec<Candidate> {
        let tracks = self.collection.tracks();
        let mut candidates: Vec<Candidate> = self.by_key[usize::from(key.index())]
            .iter()
            .map(|&position| &tracks[position])
            .filter(|track| filter.matches(track))
            .filter_map(|track| annotate(track, key, criteria))
            .collect();

        if matches!(criteria, Criteria::Bpm { .. }) {
            candidates.sort_by(|a, b| a.offset_magnitude().total_cmp(&b.offset_magnitude()));
        }

        trace!("{} candidates in {key}", candidates.len());
        candidates
    }
}

/// Candidate for `track` in a hop at `key`, `None` if it does not qualify
fn annotate(track: &Track, key: KeyNode, criteria: &Criteria) -> Option<Candidate> {
    if track.has_malformed_bpm() {
        debug!("Skipping `{}`: malformed BPM {:?}", track.id, track.bpm);
        return None;
    }

    match *criteria {
        Criteria::KeyOnly => Some(Candidate {
            track: TrackSummary::from(track),
            original_bpm: track.bpm_value(),
            original_key: key,
            adjusted_bpm: track.bpm_value(),
            bpm_offset_pct: None,
            adjusted_key: key,
            adjusted_key_labels: key.labels(),
        }),
        Criteria::Bpm { window, strict_key } => {
            let bpm = track.bpm_value()?;
            if !window.contains(bpm) {
                return None;
            }
            let shifted = adjusted_key(key, bpm, window.anchor);
            if strict_key && shifted != key {
                trace!("Skipping `{}`: plays in {shifted} at {:.1} BPM", track.id, window.anchor);
                return None;
            }
            Some(Candidate {
                track: TrackSummary::from(track),
                original_bpm: Some(bpm),
                original_key: key,
                adjusted_bpm: Some(window.anchor),
                bpm_offset_pct: Some(window.offset_pct(bpm)),
                adjusted_key: shifted,
                adjusted_key_labels: shifted.labels(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(index: i64) -> KeyNode {
        KeyNode::wrapping(index)
    }

    fn sample_index() -> CandidateIndex {
        CandidateIndex::new(Collection::new(vec![
            Track::new("a", "Daft Punk", "Around the World").with_album("Homework").with_bpm(121.0).with_key(key(2)),
            Track::new("b", "Justice", "Genesis").with_album("Cross").with_bpm(128.0).with_key(key(2)),
            Track::new("c", "Moderat", "A New Error").with_bpm(132.0).with_key(key(2)),
            Track::new("d", "Burial", "Archangel").with_key(key(2)),
            Track::new("e", "Broken", "Negative").with_bpm(-5.0).with_key(key(2)),
            Track { key: Some(99), ..Track::new("f", "Bad", "Key").with_bpm(125.0) },
            Track::new("g", "Other", "Key").with_bpm(125.0).with_key(key(3)),
        ]))
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.track.id.as_str()).collect()
    }

    #[test]
    fn test_buckets_skip_unusable_keys() {
        let index = sample_index();
        assert_eq!(index.count(key(2)), 5);
        assert_eq!(index.count(key(3)), 1);
        let total: usize = KeyNode::all().map(|k| index.count(k)).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_key_only_query_keeps_snapshot_order() {
        let index = sample_index();
        let found = index.query(key(2), &Criteria::KeyOnly, &TrackFilter::default());
        // negative BPM is malformed and skipped, missing BPM is fine here
        assert_eq!(ids(&found), vec!["a", "b", "c", "d"]);
        assert!(found.iter().all(|c| c.bpm_offset_pct.is_none()));
        assert_eq!(found[0].adjusted_bpm, Some(121.0));
    }

    #[test]
    fn test_bpm_window_and_ordering() {
        let index = sample_index();
        let criteria = Criteria::Bpm {
            window: BpmWindow::new(125.0, 5.0),
            strict_key: false,
        };
        let found = index.query(key(2), &criteria, &TrackFilter::default());

        // 132 is 5.6% off, 121 is 3.2% off, 128 is 2.4% off
        assert_eq!(ids(&found), vec!["b", "a"]);
        let offset = found[0].bpm_offset_pct.expect("BPM-aware candidates carry an offset");
        assert!((offset - 2.4).abs() < 1e-9);
        assert_eq!(found[0].adjusted_bpm, Some(125.0));
    }

    #[test]
    fn test_zero_tolerance_needs_exact_bpm() {
        let index = sample_index();
        let criteria = Criteria::Bpm {
            window: BpmWindow::new(128.0, 0.0),
            strict_key: false,
        };
        assert_eq!(ids(&index.query(key(2), &criteria, &TrackFilter::default())), vec!["b"]);
    }

    #[test]
    fn test_strict_key_drops_shifted_tracks() {
        let index = CandidateIndex::new(Collection::new(vec![
            Track::new("near", "A", "Near").with_bpm(124.0).with_key(key(4)),
            Track::new("far", "B", "Far").with_bpm(118.0).with_key(key(4)),
        ]));
        let loose = Criteria::Bpm { window: BpmWindow::new(125.0, 6.0), strict_key: false };
        let strict = Criteria::Bpm { window: BpmWindow::new(125.0, 6.0), strict_key: true };

        let found = index.query(key(4), &loose, &TrackFilter::default());
        assert_eq!(ids(&found), vec!["near", "far"]);
        assert_eq!(found[1].adjusted_key, key(6));

        assert_eq!(ids(&index.query(key(4), &strict, &TrackFilter::default())), vec!["near"]);
    }

    #[test]
    fn test_filters() {
        let index = sample_index();
        let by_artist = TrackFilter { artist: Some("  daft ".into()), ..TrackFilter::default() };
        assert_eq!(ids(&index.query(key(2), &Criteria::KeyOnly, &by_artist)), vec!["a"]);

        let by_album = TrackFilter { album: Some("CROSS".into()), ..TrackFilter::default() };
        assert_eq!(ids(&index.query(key(2), &Criteria::KeyOnly, &by_album)), vec!["b"]);

        let combined = TrackFilter { query: Some("genesis justice".into()), ..TrackFilter::default() };
        assert_eq!(ids(&index.query(key(2), &Criteria::KeyOnly, &combined)), vec!["b"]);

        let nothing = TrackFilter { title: Some("zzz".into()), ..TrackFilter::default() };
        assert!(index.query(key(2), &Criteria::KeyOnly, &nothing).is_empty());
    }

    #[test]
    fn test_blank_filter_is_empty() {
        assert!(TrackFilter::default().is_empty());
        assert!(TrackFilter { artist: Some("   ".into()), ..TrackFilter::default() }.is_empty());
        assert!(!TrackFilter { query: Some("x".into()), ..TrackFilter::default() }.is_empty());
    }

    #[test]
    fn test_empty_key_is_not_an_error() {
        let index = sample_index();
        assert!(index.query(key(17), &Criteria::KeyOnly, &TrackFilter::default()).is_empty());
    }
}
