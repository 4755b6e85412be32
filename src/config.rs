//! # Configuration Module
//!
//! Settings file handling and platform directories for mixchain.
//!
//! ## Storage
//!
//! Settings live in the platform configuration directory, saved playlists in
//! the platform data directory:
//! - Linux: `~/.config/mixchain/settings.json`, `~/.local/share/mixchain/playlists/`
//! - macOS: `~/Library/Application Support/mixchain/`
//! - Windows: `%APPDATA%\mixchain\`
//!
//! A missing settings file is not an error; every field falls back to its
//! default. Values given on the command line win over the file.

use anyhow::{Context, Result};
use log::{debug, warn};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::bpm::DEFAULT_TOLERANCE_PCT;
use crate::graph::DIAMETER;
use crate::search::SearchMode;

const APP_DIR: &str = "mixchain";
const SETTINGS_FILE: &str = "settings.json";

fn ensure_app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    let base = base.ok_or_else(|| {
        anyhow::anyhow!("Could not determine system {kind} directory. Please ensure your platform supports standard {kind} directories.")
    })?;

    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "Failed to create mixchain {kind} directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir)
}

/// Returns the platform configuration directory for mixchain, creating it.
///
/// # Errors
///
/// Returns an error if the system configuration directory cannot be
/// determined or the `mixchain` subdirectory cannot be created.
pub fn get_config_dir() -> Result<PathBuf> {
    ensure_app_dir(dirs::config_dir(), "config")
}

/// Returns the platform data directory for mixchain, creating it.
///
/// # Errors
///
/// Returns an error if the system data directory cannot be determined or the
/// `mixchain` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    ensure_app_dir(dirs::data_dir(), "data")
}

/// Default location of the settings file
///
/// # Errors
///
/// Same as [`get_config_dir`]
pub fn settings_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE))
}

/// User preferences, stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// BPM tolerance in percent for BPM-aware searches
    pub tolerance_pct: f64,
    pub mode: SearchMode,
    /// Longest chain considered, in key changes
    pub max_chain_length: usize,
    /// Collection file used when `--collection` is not given
    pub collection: Option<PathBuf>,
    /// Where `search --save` writes playlists given as bare file names
    pub playlist_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            mode: SearchMode::default(),
            max_chain_length: DIAMETER,
            collection: None,
            playlist_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;

        if settings.max_chain_length > DIAMETER {
            warn!(
                "max_chain_length {} exceeds the key graph diameter, {DIAMETER} will be used",
                settings.max_chain_length
            );
        }
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory is unavailable or the
    /// settings file is unreadable
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_path()?)
    }

    /// Write settings as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings file {}", path.display()))
    }

    /// Collection to open: the command-line value if any, else the settings
    /// file's, absolutized against the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither names a collection
    pub fn resolve_collection(&self, cli: Option<&Path>) -> Result<PathBuf> {
        let path = cli
            .or(self.collection.as_deref())
            .context("No collection given. Pass --collection, set MIXCHAIN_COLLECTION, or add \"collection\" to the settings file")?;
        absolute(path)
    }

    /// Where a playlist named `requested` is written.
    ///
    /// Paths with a directory component are used as given. Bare file names
    /// go into `playlist_dir`, or `<data dir>/playlists` when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is needed but unavailable
    pub fn resolve_playlist_path(&self, requested: &Path) -> Result<PathBuf> {
        let bare = requested.parent().map_or(true, |p| p.as_os_str().is_empty());
        if !bare {
            return absolute(requested);
        }

        let dir = match &self.playlist_dir {
            Some(dir) => dir.clone(),
            None => get_data_dir()?.join("playlists"),
        };
        absolute(&dir.join(requested))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .with_context(|| format!("Failed to resolve path {}", path.display()))?
        .into_owned())
}
