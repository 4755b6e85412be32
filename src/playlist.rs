//! Playlists handed to whoever persists a chosen chain.
//!
//! A playlist is an ordered list of track ids with a creation timestamp:
//! the source track, one pick per hop, then the target track. The engine
//! does not interpret the file beyond writing and reading it back.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::collection::TrackId;
use crate::result::SearchOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tracks: Vec<TrackId>,
}

impl Playlist {
    /// Playlist for chain `chain_index` of `outcome`, stamped now.
    ///
    /// `picks[i]` selects the candidate for hop `i`; hops without a pick use
    /// their first (best) candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain or a pick does not exist
    pub fn from_chain(outcome: &SearchOutcome, chain_index: usize, picks: &[usize]) -> Result<Self> {
        Self::from_chain_at(outcome, chain_index, picks, Utc::now())
    }

    /// As [`Playlist::from_chain`] with an explicit timestamp
    ///
    /// # Errors
    ///
    /// Returns an error if the chain or a pick does not exist
    pub fn from_chain_at(
        outcome: &SearchOutcome,
        chain_index: usize,
        picks: &[usize],
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let Some(chain) = outcome.chains.get(chain_index) else {
            bail!(
                "Chain {} does not exist ({} chains found)",
                chain_index + 1,
                outcome.chains.len()
            );
        };
        if picks.len() > chain.hops.len() {
            bail!("{} picks given for a chain with {} hops", picks.len(), chain.hops.len());
        }

        let mut tracks = Vec::with_capacity(chain.hops.len() + 2);
        tracks.push(outcome.source.track.id.clone());
        for (hop_index, hop) in chain.hops.iter().enumerate() {
            let pick = picks.get(hop_index).copied().unwrap_or(0);
            let candidate = hop.candidates.get(pick).with_context(|| {
                format!(
                    "Hop {} ({}) has no candidate {} ({} available)",
                    hop_index + 1,
                    hop.labels.open_key,
                    pick + 1,
                    hop.candidates.len()
                )
            })?;
            tracks.push(candidate.track.id.clone());
        }
        tracks.push(outcome.target.track.id.clone());

        Ok(Self {
            name: format!(
                "{} to {}",
                outcome.source.track.display_name(),
                outcome.target.track.display_name()
            ),
            created_at,
            tracks,
        })
    }

    /// Suggested file name, unique per second
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("mixchain-{}.json", self.created_at.format("%Y%m%d-%H%M%S"))
    }

    /// Write the playlist as pretty JSON, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create playlist directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize playlist")?;
        fs::write(path, json).with_context(|| format!("Failed to write playlist {}", path.display()))?;
        info!("Saved playlist `{}` ({} tracks) to {}", self.name, self.tracks.len(), path.display());
        Ok(())
    }

    /// Read a playlist written by [`Playlist::save`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a playlist
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read playlist {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("{} is not a playlist", path.display()))
    }
}
