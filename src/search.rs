//! # Chain Search
//!
//! Finds every feasible harmonic bridge between two tracks.
//!
//! ## Algorithm
//!
//! 1. Resolve both endpoints and check the metadata the mode needs. Every
//!    error is raised here, before any traversal.
//! 2. Enumerate all shortest key paths from the source key to the target key
//!    (a same-key request yields only the zero-length path).
//! 3. Fill each internal hop from the [`CandidateIndex`]. In BPM-aware mode
//!    every hop is windowed against the same anchor tempo: the current BPM
//!    override if given, else the source track's BPM. The anchor never drifts
//!    from hop to hop.
//! 4. Drop a path as soon as one hop has no candidate.
//! 5. Score each surviving chain by the sum of its hops' smallest BPM offset
//!    and sort by (length, score). The sort is stable, so equal scores keep
//!    enumeration order and identical inputs give identical output.
//!
//! A search is synchronous, performs no I/O and only reads the index, so
//! independent searches can run in parallel ([`search_batch`]).

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bpm::{BpmWindow, DEFAULT_TOLERANCE_PCT};
use crate::collection::{Track, TrackId};
use crate::error::{Endpoint, MetadataField, SearchError};
use crate::graph::{self, DIAMETER};
use crate::index::{CandidateIndex, Criteria, TrackFilter};
use crate::key::KeyNode;
use crate::result::{ChainResult, EndpointSummary, HopResult, SearchOutcome, WindowBounds};

/// Whether hops are matched on key alone or also on tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    KeyOnly,
    #[default]
    BpmAware,
}

/// Parameters of one search, captured by value when the search starts
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub source: TrackId,
    pub target: TrackId,
    pub mode: SearchMode,
    /// Maximum BPM deviation in percent, BPM-aware mode only
    pub tolerance_pct: f64,
    /// Tempo currently playing, used as the anchor instead of the source BPM
    pub current_bpm: Option<f64>,
    pub filter: TrackFilter,
    /// Longest chain considered, capped at the graph diameter
    pub max_chain_length: usize,
    /// Drop candidates whose tempo-shifted key leaves the hop key
    pub strict_key: bool,
}

impl SearchRequest {
    /// BPM-aware request with the default tolerance and no filters
    pub fn new(source: impl Into<TrackId>, target: impl Into<TrackId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: SearchMode::default(),
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            current_bpm: None,
            filter: TrackFilter::default(),
            max_chain_length: DIAMETER,
            strict_key: false,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance_pct: f64) -> Self {
        self.tolerance_pct = tolerance_pct;
        self
    }

    #[must_use]
    pub fn current_bpm(mut self, bpm: Option<f64>) -> Self {
        self.current_bpm = bpm;
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: TrackFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn max_chain_length(mut self, max: usize) -> Self {
        self.max_chain_length = max;
        self
    }

    #[must_use]
    pub fn strict_key(mut self, strict: bool) -> Self {
        self.strict_key = strict;
        self
    }
}

/// Validated endpoints of a request
struct Plan<'a> {
    source: &'a Track,
    target: &'a Track,
    source_key: KeyNode,
    target_key: KeyNode,
    anchor: Option<f64>,
}

/// Chain search over one index
#[derive(Debug, Clone, Copy)]
pub struct ChainSearch<'a> {
    index: &'a CandidateIndex,
}

impl<'a> ChainSearch<'a> {
    #[must_use]
    pub fn new(index: &'a CandidateIndex) -> Self {
        Self { index }
    }

    /// Run a search to completion
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NotFound`] for unknown ids and
    /// [`SearchError::MissingMetadata`] / [`SearchError::InvalidParameter`]
    /// for unusable input, all before any traversal
    pub fn run(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        self.run_with_cancel(request, &AtomicBool::new(false))
    }

    /// Run a search that stops with [`SearchError::Cancelled`] once `cancel`
    /// is set. The flag is checked between hops.
    ///
    /// # Errors
    ///
    /// As [`ChainSearch::run`], plus [`SearchError::Cancelled`]
    pub fn run_with_cancel(&self, request: &SearchRequest, cancel: &AtomicBool) -> Result<SearchOutcome, SearchError> {
        let plan = self.plan(request)?;
        debug!(
            "Searching {} ({}) -> {} ({}), {:?}, anchor {:?}",
            request.source, plan.source_key, request.target, plan.target_key, request.mode, plan.anchor
        );

        let criteria = match (request.mode, plan.anchor) {
            (SearchMode::BpmAware, Some(anchor)) => Criteria::Bpm {
                window: BpmWindow::new(anchor, request.tolerance_pct),
                strict_key: request.strict_key,
            },
            _ => Criteria::KeyOnly,
        };

        let paths = graph::shortest_paths(plan.source_key, plan.target_key, request.max_chain_length);
        let mut key_paths = Vec::new();
        let mut chains = Vec::new();

        for key_path in &paths {
            if let Some(hops) = self.fill_hops(&key_path, &criteria, &request.filter, cancel)? {
                chains.push(ChainResult::new(key_path.clone(), hops));
            } else {
                trace!("Pruned key path {}", format_path(&key_path));
            }
            key_paths.push(key_path);
        }

        chains.sort_by(|a, b| {
            a.length()
                .cmp(&b.length())
                .then(a.tie_break_score.total_cmp(&b.tie_break_score))
        });
        debug!("{} of {} key paths are playable", chains.len(), key_paths.len());

        let window: Option<WindowBounds> = match criteria {
            Criteria::Bpm { window, .. } => Some(window.into()),
            Criteria::KeyOnly => None,
        };

        Ok(SearchOutcome {
            source: EndpointSummary::new(plan.source, plan.source_key),
            target: EndpointSummary::new(plan.target, plan.target_key),
            mode: request.mode,
            tolerance_pct: request.tolerance_pct,
            anchor_bpm: window.and(plan.anchor),
            window,
            min_chain_length: key_paths.first().map(|p| p.len() - 1),
            key_paths,
            chains,
        })
    }

    /// Resolve and check everything a search needs before touching the graph
    fn plan(&self, request: &SearchRequest) -> Result<Plan<'a>, SearchError> {
        let collection = self.index.collection();
        let resolve = |id: &TrackId, endpoint| {
            collection.get(id).ok_or_else(|| SearchError::NotFound {
                endpoint,
                id: id.clone(),
            })
        };
        let source = resolve(&request.source, Endpoint::Source)?;
        let target = resolve(&request.target, Endpoint::Target)?;

        if !(request.tolerance_pct.is_finite() && request.tolerance_pct >= 0.0) {
            return Err(SearchError::InvalidParameter {
                name: "tolerance",
                value: request.tolerance_pct,
            });
        }
        if request.max_chain_length == 0 {
            return Err(SearchError::InvalidParameter {
                name: "max chain length",
                value: 0.0,
            });
        }
        if let Some(bpm) = request.current_bpm.filter(|bpm| !(bpm.is_finite() && *bpm > 0.0)) {
            return Err(SearchError::InvalidParameter {
                name: "current BPM",
                value: bpm,
            });
        }

        let source_key = require(source, Endpoint::Source, request.mode)?;
        let target_key = require(target, Endpoint::Target, request.mode)?;

        Ok(Plan {
            source,
            target,
            source_key,
            target_key,
            anchor: request.current_bpm.or_else(|| source.bpm_value()),
        })
    }

    /// Candidates for every internal hop of `key_path`, `None` once a hop is empty
    fn fill_hops(
        &self,
        key_path: &[KeyNode],
        criteria: &Criteria,
        filter: &TrackFilter,
        cancel: &AtomicBool,
    ) -> Result<Option<Vec<HopResult>>, SearchError> {
        let mut hops = Vec::new();
        for &key in internal_keys(key_path) {
            if cancel.load(Ordering::Relaxed) {
                return Err(SearchError::Cancelled);
            }
            let candidates = self.index.query(key, criteria, filter);
            if candidates.is_empty() {
                trace!("No candidates in {key}");
                return Ok(None);
            }
            hops.push(HopResult::new(key, candidates));
        }
        Ok(Some(hops))
    }
}

/// Key of `track`, checking that `mode` has all the metadata it needs
fn require(track: &Track, endpoint: Endpoint, mode: SearchMode) -> Result<KeyNode, SearchError> {
    let key = track.key_node();
    let mut missing = Vec::new();
    if key.is_none() {
        missing.push(MetadataField::Key);
    }
    if mode == SearchMode::BpmAware && track.bpm_value().is_none() {
        missing.push(MetadataField::Bpm);
    }

    match key {
        Some(key) if missing.is_empty() => Ok(key),
        _ => Err(SearchError::MissingMetadata {
            endpoint,
            id: track.id.clone(),
            fields: missing,
        }),
    }
}

/// Keys strictly between the endpoints
fn internal_keys(key_path: &[KeyNode]) -> &[KeyNode] {
    match key_path.len() {
        0..=2 => &[],
        len => &key_path[1..len - 1],
    }
}

fn format_path(key_path: &[KeyNode]) -> String {
    key_path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

/// Run one search against `index`
///
/// # Errors
///
/// See [`ChainSearch::run`]
pub fn search(index: &CandidateIndex, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
    ChainSearch::new(index).run(request)
}

/// Run independent searches in parallel against the same snapshot.
/// Results are returned in request order.
#[must_use]
pub fn search_batch(index: &CandidateIndex, requests: &[SearchRequest]) -> Vec<Result<SearchOutcome, SearchError>> {
    requests
        .par_iter()
        .map(|request| ChainSearch::new(index).run(request))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::key::Mode;

    fn key(pitch: u8, mode: Mode) -> KeyNode {
        KeyNode::from_parts(pitch, mode)
    }

    fn track(id: &str, bpm: f64, key: KeyNode) -> Track {
        Track::new(id, format!("Artist {id}"), format!("Title {id}")).with_bpm(bpm).with_key(key)
    }

    /// C major source, D major target, one bridge track in C# major
    fn bridge_index() -> CandidateIndex {
        CandidateIndex::new(Collection::new(vec![
            track("src", 125.0, key(0, Mode::Major)),
            track("dst", 126.0, key(2, Mode::Major)),
            track("mid", 127.0, key(1, Mode::Major)),
            track("slow", 100.0, key(1, Mode::Major)),
            Track::new("untagged", "U", "U"),
        ]))
    }

    #[test]
    fn test_single_bridge() {
        let index = bridge_index();
        let outcome = search(&index, &SearchRequest::new("src", "dst")).expect("search should succeed");

        assert_eq!(outcome.min_chain_length, Some(2));
        assert_eq!(outcome.chains.len(), 1);
        let chain = &outcome.chains[0];
        assert_eq!(chain.key_path, vec![key(0, Mode::Major), key(1, Mode::Major), key(2, Mode::Major)]);
        assert_eq!(chain.hops.len(), 1);
        assert_eq!(chain.hops[0].candidates.len(), 1);
        assert_eq!(chain.hops[0].candidates[0].track.id.as_str(), "mid");
        assert!((chain.tie_break_score - 1.6).abs() < 1e-9);
        assert_eq!(outcome.anchor_bpm, Some(125.0));
    }

    #[test]
    fn test_current_bpm_overrides_anchor() {
        let index = bridge_index();
        let request = SearchRequest::new("src", "dst").current_bpm(Some(100.0));
        let outcome = search(&index, &request).expect("search should succeed");

        assert_eq!(outcome.anchor_bpm, Some(100.0));
        assert_eq!(outcome.chains[0].hops[0].candidates[0].track.id.as_str(), "slow");
    }

    #[test]
    fn test_key_only_ignores_tempo() {
        let index = bridge_index();
        let request = SearchRequest::new("src", "dst").mode(SearchMode::KeyOnly);
        let outcome = search(&index, &request).expect("search should succeed");

        assert_eq!(outcome.chains[0].hops[0].candidates.len(), 2);
        assert_eq!(outcome.chains[0].tie_break_score, 0.0);
        assert_eq!(outcome.anchor_bpm, None);
        assert_eq!(outcome.window, None);
    }

    #[test]
    fn test_same_key_zero_length_chain() {
        let index = CandidateIndex::new(Collection::new(vec![
            track("a", 120.0, key(4, Mode::Minor)),
            track("b", 140.0, key(4, Mode::Minor)),
        ]));
        let outcome = search(&index, &SearchRequest::new("a", "b").tolerance(0.0)).expect("search should succeed");

        assert_eq!(outcome.chains.len(), 1);
        assert_eq!(outcome.chains[0].length(), 0);
        assert!(outcome.chains[0].hops.is_empty());
    }

    #[test]
    fn test_empty_hop_prunes_path() {
        let index = CandidateIndex::new(Collection::new(vec![
            track("src", 125.0, key(0, Mode::Major)),
            track("dst", 125.0, key(2, Mode::Major)),
        ]));
        let outcome = search(&index, &SearchRequest::new("src", "dst")).expect("empty result is not an error");

        assert!(outcome.is_empty());
        assert_eq!(outcome.key_paths.len(), 1);
    }

    #[test]
    fn test_untagged_endpoints_fail_validation() {
        let index = bridge_index();
        let err = search(&index, &SearchRequest::new("src", "untagged")).unwrap_err();
        assert_eq!(
            err,
            SearchError::MissingMetadata {
                endpoint: Endpoint::Target,
                id: "untagged".into(),
                fields: vec![MetadataField::Key, MetadataField::Bpm],
            }
        );

        let key_only = SearchRequest::new("untagged", "dst").mode(SearchMode::KeyOnly);
        let err = search(&index, &key_only).unwrap_err();
        assert!(matches!(
            err,
            SearchError::MissingMetadata { endpoint: Endpoint::Source, ref fields, .. } if *fields == vec![MetadataField::Key]
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let index = bridge_index();
        let negative = SearchRequest::new("src", "dst").tolerance(-1.0);
        assert!(matches!(search(&index, &negative), Err(SearchError::InvalidParameter { .. })));

        let zero_bpm = SearchRequest::new("src", "dst").current_bpm(Some(0.0));
        assert!(matches!(search(&index, &zero_bpm), Err(SearchError::InvalidParameter { .. })));

        let no_steps = SearchRequest::new("src", "dst").max_chain_length(0);
        assert!(matches!(
            search(&index, &no_steps),
            Err(SearchError::InvalidParameter { name: "max chain length", .. })
        ));
    }

    #[test]
    fn test_unknown_ids() {
        let index = bridge_index();
        let err = search(&index, &SearchRequest::new("nope", "dst")).unwrap_err();
        assert!(matches!(err, SearchError::NotFound { endpoint: Endpoint::Source, .. }));
        let err = search(&index, &SearchRequest::new("src", "nope")).unwrap_err();
        assert!(matches!(err, SearchError::NotFound { endpoint: Endpoint::Target, .. }));
    }

    #[test]
    fn test_cancelled_search() {
        let index = bridge_index();
        let cancel = AtomicBool::new(true);
        let result = ChainSearch::new(&index).run_with_cancel(&SearchRequest::new("src", "dst"), &cancel);
        assert_eq!(result, Err(SearchError::Cancelled));
    }

    #[test]
    fn test_internal_keys() {
        let a = key(0, Mode::Major);
        let b = key(1, Mode::Major);
        let c = key(2, Mode::Major);
        assert!(internal_keys(&[a]).is_empty());
        assert!(internal_keys(&[a, b]).is_empty());
        assert_eq!(internal_keys(&[a, b, c]), &[b]);
    }

    #[test]
    fn test_batch_matches_sequential() {
        let index = bridge_index();
        let requests = vec![
            SearchRequest::new("src", "dst"),
            SearchRequest::new("src", "dst").mode(SearchMode::KeyOnly),
            SearchRequest::new("missing", "dst"),
        ];
        let batch = search_batch(&index, &requests);
        let sequential: Vec<_> = requests.iter().map(|r| search(&index, r)).collect();
        assert_eq!(batch, sequential);
    }
}
