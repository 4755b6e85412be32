//! Errors raised by a chain search.
//!
//! All of them are detected before any graph traversal starts, except
//! [`SearchError::Cancelled`]. "No chain found" is not an error: it is an
//! empty [`SearchOutcome`](crate::result::SearchOutcome).

use serde::Serialize;
use std::fmt;

use crate::collection::TrackId;

/// Which end of the requested transition an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// Track metadata a search mode depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataField {
    Key,
    Bpm,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Key => "key",
            Self::Bpm => "BPM",
        })
    }
}

fn join_fields(fields: &[MetadataField]) -> String {
    fields.iter().map(ToString::to_string).collect::<Vec<_>>().join(" and ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// The track id is not in the collection snapshot
    #[error("{endpoint} track `{id}` is not in the collection")]
    NotFound { endpoint: Endpoint, id: TrackId },

    /// The track lacks metadata the requested mode needs
    #[error("{endpoint} track `{id}` has no usable {}", join_fields(.fields))]
    MissingMetadata {
        endpoint: Endpoint,
        id: TrackId,
        fields: Vec<MetadataField>,
    },

    /// A request parameter is out of range
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("search cancelled")]
    Cancelled,
}

impl SearchError {
    /// True for errors caused by unusable input rather than a missing track
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingMetadata { .. } | Self::InvalidParameter { .. })
    }
}
