//! Plain-text rendering of search results, keys and track lists.
//!
//! Every function returns the text instead of printing it, so the binary
//! decides where it goes and tests can compare it.

use crate::collection::Track;
use crate::graph;
use crate::key::{KeyLabels, KeyNode};
use crate::result::{Candidate, ChainResult, EndpointSummary, SearchOutcome};
use crate::search::SearchMode;

/// Shown when a search produced no chain
pub const NO_TRANSITION: &str = "No transition found at this tolerance";

fn bpm_text(bpm: Option<f64>) -> String {
    bpm.map_or_else(|| "?".to_string(), |bpm| format!("{bpm:.1}"))
}

fn with_album(name: String, album: &str) -> String {
    match album.trim() {
        "" => name,
        album => format!("{name} [{album}]"),
    }
}

fn key_text(labels: &KeyLabels) -> String {
    format!("{} / {} / {}", labels.open_key, labels.camelot, labels.straight)
}

/// `[128.0 -> 125.0 (+2.4%)] | [3d] | Artist - Title [Album]`
///
/// Key-only candidates show their own tempo, and a key that moves at the
/// anchor tempo is shown as `3d -> 4d`.
#[must_use]
pub fn format_candidate(candidate: &Candidate) -> String {
    let bpm = match (candidate.original_bpm, candidate.bpm_offset_pct) {
        (Some(original), Some(offset)) => format!(
            "{} -> {} ({offset:+.1}%)",
            bpm_text(Some(original)),
            bpm_text(candidate.adjusted_bpm)
        ),
        (original, _) => bpm_text(original),
    };
    let key = if candidate.adjusted_key == candidate.original_key {
        candidate.original_key.open_key_label()
    } else {
        format!("{} -> {}", candidate.original_key, candidate.adjusted_key)
    };
    format!(
        "[{bpm}] | [{key}] | {}",
        with_album(candidate.track.display_name(), &candidate.track.album)
    )
}

fn format_endpoint(role: &str, endpoint: &EndpointSummary) -> String {
    format!(
        "{role} {} ({}) | {} BPM | {}",
        with_album(endpoint.track.display_name(), &endpoint.track.album),
        endpoint.track.id,
        bpm_text(endpoint.bpm),
        key_text(&endpoint.key_labels)
    )
}

fn format_path(chain: &ChainResult) -> String {
    chain
        .key_labels
        .iter()
        .map(|labels| labels.open_key.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Full text report of a search. `limit` caps the number of chains shown.
#[must_use]
pub fn format_outcome(outcome: &SearchOutcome, limit: Option<usize>) -> String {
    let mut lines = vec![
        format_endpoint("From:", &outcome.source),
        format_endpoint("To:  ", &outcome.target),
    ];

    match (outcome.mode, outcome.anchor_bpm, outcome.window) {
        (SearchMode::BpmAware, Some(anchor), Some(window)) => lines.push(format!(
            "Mode: BPM-aware, {:.1}% around {anchor:.1} BPM ({:.2}-{:.2})",
            outcome.tolerance_pct, window.low, window.high
        )),
        _ => lines.push("Mode: key only".to_string()),
    }
    lines.push(String::new());

    if outcome.is_empty() {
        lines.push(NO_TRANSITION.to_string());
        if let Some(length) = outcome.min_chain_length {
            lines.push(format!(
                "{} key path(s) of {length} step(s) tried, each has a hop without a matching track",
                outcome.key_paths.len()
            ));
        }
        return lines.join("\n");
    }

    let shown = limit.unwrap_or(usize::MAX).min(outcome.chains.len());
    for (number, chain) in outcome.chains.iter().take(shown).enumerate() {
        let score = match outcome.mode {
            SearchMode::BpmAware => format!(", offset score {:.2}", chain.tie_break_score),
            SearchMode::KeyOnly => String::new(),
        };
        lines.push(format!(
            "Chain {}: {} ({} step(s){score})",
            number + 1,
            format_path(chain),
            chain.length()
        ));

        if chain.hops.is_empty() {
            lines.push("  Direct transition, no intermediate track needed".to_string());
        }
        for (hop_number, hop) in chain.hops.iter().enumerate() {
            lines.push(format!(
                "  Hop {}: {} ({} track(s))",
                hop_number + 1,
                key_text(&hop.labels),
                hop.candidates.len()
            ));
            lines.extend(hop.candidates.iter().map(|c| format!("    {}", format_candidate(c))));
        }
    }

    if shown < outcome.chains.len() {
        lines.push(format!("... {} more chain(s)", outcome.chains.len() - shown));
    }
    lines.join("\n")
}

/// Labels of `key` and the keys one step away
#[must_use]
pub fn format_key(key: KeyNode) -> String {
    let labels = key.labels();
    let mut lines = vec![
        format!("Index:    {}", labels.index),
        format!("Open Key: {}", labels.open_key),
        format!("Camelot:  {}", labels.camelot),
        format!("Key:      {}", labels.straight),
        "Compatible:".to_string(),
    ];
    for (neighbor, edge) in graph::neighbors(key).iter() {
        lines.push(format!("  {:<9} {}", format!("{edge:?}"), key_text(&neighbor.labels())));
    }
    lines.join("\n")
}

/// One line per track: id, key, BPM and name
#[must_use]
pub fn format_tracks<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> String {
    tracks
        .into_iter()
        .map(|track| {
            let key = track.key_node().map_or_else(|| "-".to_string(), |k| k.open_key_label());
            format!(
                "{:<12} {:>4} {:>7}  {}",
                track.id.as_str(),
                key,
                bpm_text(track.bpm_value()),
                with_album(track.display_name(), &track.album)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
