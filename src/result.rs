//! Search results, shaped for display and JSON transport.
//!
//! Everything here is plain data. The only logic is construction of derived
//! fields (labels, tie-break score) so callers never recompute them.

use serde::Serialize;

use crate::bpm::BpmWindow;
use crate::collection::{Track, TrackId};
use crate::key::{KeyLabels, KeyNode};
use crate::search::SearchMode;

/// Identity and tags of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSummary {
    pub id: TrackId,
    pub artist: String,
    pub title: String,
    pub album: String,
}

impl TrackSummary {
    /// `Artist - Title`, or whichever half is present
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.artist.trim(), self.title.trim()) {
            ("", "") => self.id.to_string(),
            ("", title) => title.to_string(),
            (artist, "") => artist.to_string(),
            (artist, title) => format!("{artist} - {title}"),
        }
    }
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            artist: track.artist.clone(),
            title: track.title.clone(),
            album: track.album.clone(),
        }
    }
}

/// Source or target track of a search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub track: TrackSummary,
    pub bpm: Option<f64>,
    pub key: KeyNode,
    pub key_labels: KeyLabels,
}

impl EndpointSummary {
    pub(crate) fn new(track: &Track, key: KeyNode) -> Self {
        Self {
            track: TrackSummary::from(track),
            bpm: track.bpm_value(),
            key,
            key_labels: key.labels(),
        }
    }
}

/// A track offered for one hop, with the tempo it would be played at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub track: TrackSummary,
    pub original_bpm: Option<f64>,
    pub original_key: KeyNode,
    /// Anchor tempo in BPM-aware searches, the track's own tempo otherwise
    pub adjusted_bpm: Option<f64>,
    /// Signed deviation from the anchor, only in BPM-aware searches
    pub bpm_offset_pct: Option<f64>,
    pub adjusted_key: KeyNode,
    pub adjusted_key_labels: KeyLabels,
}

impl Candidate {
    #[must_use]
    pub fn offset_magnitude(&self) -> f64 {
        self.bpm_offset_pct.map_or(0.0, f64::abs)
    }
}

/// One internal position of a chain and the tracks that can fill it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopResult {
    pub key: KeyNode,
    pub labels: KeyLabels,
    pub candidates: Vec<Candidate>,
}

impl HopResult {
    #[must_use]
    pub fn new(key: KeyNode, candidates: Vec<Candidate>) -> Self {
        Self {
            key,
            labels: key.labels(),
            candidates,
        }
    }

    /// Smallest BPM offset magnitude among the candidates, 0 without offsets
    #[must_use]
    pub fn best_offset(&self) -> f64 {
        self.candidates
            .iter()
            .map(Candidate::offset_magnitude)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0)
    }
}

/// A feasible key path with its populated hops
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainResult {
    pub key_path: Vec<KeyNode>,
    pub key_labels: Vec<KeyLabels>,
    /// Internal hops only; the endpoints are the fixed source and target
    pub hops: Vec<HopResult>,
    /// Sum over hops of the best candidate's offset magnitude
    pub tie_break_score: f64,
}

impl ChainResult {
    #[must_use]
    pub fn new(key_path: Vec<KeyNode>, hops: Vec<HopResult>) -> Self {
        let tie_break_score = hops.iter().map(HopResult::best_offset).fold(0.0, |sum, offset| sum + offset);
        Self {
            key_labels: key_path.iter().map(|key| key.labels()).collect(),
            key_path,
            hops,
            tie_break_score,
        }
    }

    /// Number of edges in the chain
    #[must_use]
    pub fn length(&self) -> usize {
        self.key_path.len().saturating_sub(1)
    }
}

/// Lowest and highest BPM accepted during a search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowBounds {
    pub low: f64,
    pub high: f64,
}

impl From<BpmWindow> for WindowBounds {
    fn from(window: BpmWindow) -> Self {
        let (low, high) = window.bounds();
        Self { low, high }
    }
}

/// Everything one search produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub source: EndpointSummary,
    pub target: EndpointSummary,
    pub mode: SearchMode,
    pub tolerance_pct: f64,
    pub anchor_bpm: Option<f64>,
    pub window: Option<WindowBounds>,
    /// Edges in the shortest key path, `None` when the keys are out of reach
    pub min_chain_length: Option<usize>,
    /// Every shortest key path tried, in enumeration order
    pub key_paths: Vec<Vec<KeyNode>>,
    /// Feasible chains, best first
    pub chains: Vec<ChainResult>,
}

impl SearchOutcome {
    /// True when no chain survived, i.e. no transition at this tolerance
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    #[must_use]
    pub fn best(&self) -> Option<&ChainResult> {
        self.chains.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(offset: Option<f64>) -> Candidate {
        let key = KeyNode::wrapping(2);
        Candidate {
            track: TrackSummary::from(&Track::new("t", "A", "T")),
            original_bpm: Some(120.0),
            original_key: key,
            adjusted_bpm: Some(120.0),
            bpm_offset_pct: offset,
            adjusted_key: key,
            adjusted_key_labels: key.labels(),
        }
    }

    #[test]
    fn test_best_offset_uses_magnitude() {
        let hop = HopResult::new(
            KeyNode::wrapping(2),
            vec![candidate(Some(3.0)), candidate(Some(-1.5)), candidate(Some(2.0))],
        );
        assert_eq!(hop.best_offset(), 1.5);
    }

    #[test]
    fn test_tie_break_sums_hop_minimums() {
        let chain = ChainResult::new(
            vec![KeyNode::wrapping(0), KeyNode::wrapping(2), KeyNode::wrapping(4), KeyNode::wrapping(6)],
            vec![
                HopResult::new(KeyNode::wrapping(2), vec![candidate(Some(1.0)), candidate(Some(-0.5))]),
                HopResult::new(KeyNode::wrapping(4), vec![candidate(Some(-2.0))]),
            ],
        );
        assert_eq!(chain.length(), 3);
        assert_eq!(chain.key_labels.len(), 4);
        assert!((chain.tie_break_score - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_direct_chain_scores_positive_zero() {
        let chain = ChainResult::new(vec![KeyNode::wrapping(0), KeyNode::wrapping(1)], Vec::new());
        assert_eq!(chain.tie_break_score, 0.0);
        assert!(chain.tie_break_score.is_sign_positive());
        assert_eq!(format!("{:.2}", chain.tie_break_score), "0.00");
    }

    #[test]
    fn test_key_only_candidates_score_zero() {
        let hop = HopResult::new(KeyNode::wrapping(2), vec![candidate(None)]);
        assert_eq!(hop.best_offset(), 0.0);
        assert_eq!(ChainResult::new(vec![KeyNode::wrapping(0)], Vec::new()).length(), 0);
    }

    #[test]
    fn test_serializes_to_json() {
        let chain = ChainResult::new(vec![KeyNode::wrapping(19)], Vec::new());
        let json = serde_json::to_value(&chain).expect("chain should serialize");
        assert_eq!(json["key_path"][0], 19);
        assert_eq!(json["key_labels"][0]["camelot"], "8A");
        assert_eq!(json["tie_break_score"], 0.0);
    }
}
