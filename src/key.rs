//! # Musical Key Module
//!
//! The 24 nodes of the key compatibility graph. A key is stored as a single
//! index `pitch_class * 2 + mode`, where pitch class 0 is C and mode 0 is
//! major, so every node fits in `0..24` and all arithmetic wraps.
//!
//! ## Label Forms
//!
//! Each node renders in the three notations DJs meet in practice:
//!
//! | Index | Pitch | Open Key | Straight | Camelot |
//! |-------|-------|----------|----------|---------|
//! | 0     | C     | `1d`     | `C`      | `8B`    |
//! | 1     | C     | `10m`    | `Cm`     | `5A`    |
//! | 19    | A     | `1m`     | `Am`     | `8A`    |
//!
//! Labels are pure functions of the index and are never stored.

use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Number of nodes in the key graph
pub const KEY_COUNT: u8 = 24;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

// Camelot wheel position indexed by pitch class (0=C, 1=C#, ...)
const CAMELOT_MAJOR: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];
const CAMELOT_MINOR: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

lazy_static! {
    /// Lower-cased Open Key and Camelot labels for all 24 keys
    static ref WHEEL_LABELS: HashMap<String, KeyNode> = {
        let mut labels = HashMap::with_capacity(usize::from(KEY_COUNT) * 2);
        for key in KeyNode::all() {
            labels.insert(key.open_key_label().to_lowercase(), key);
            labels.insert(key.camelot_label().to_lowercase(), key);
        }
        labels
    };
}

/// Scale of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// The other mode
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Major => Self::Minor,
            Self::Minor => Self::Major,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Major => 0,
            Self::Minor => 1,
        }
    }
}

/// One of the 24 musical keys.
///
/// Construction always lands in `0..24`: [`KeyNode::wrapping`] reduces any
/// integer modulo 24, [`KeyNode::from_raw`] rejects out-of-range input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct KeyNode(u8);

impl KeyNode {
    /// Build a key from any integer, taken modulo 24
    #[must_use]
    pub const fn wrapping(index: i64) -> Self {
        Self(index.rem_euclid(KEY_COUNT as i64) as u8)
    }

    /// Build a key from a raw metadata value, `None` unless it is in `0..24`
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        (0..i64::from(KEY_COUNT)).contains(&raw).then(|| Self::wrapping(raw))
    }

    /// Build a key from a Traktor key index: 0-11 are the major keys from C
    /// upward, 12-23 the minor keys from C minor upward.
    #[must_use]
    pub fn from_traktor(raw: i64) -> Option<Self> {
        let mode = if raw < 12 { Mode::Major } else { Mode::Minor };
        (0..i64::from(KEY_COUNT))
            .contains(&raw)
            .then(|| Self::from_parts((raw % 12) as u8, mode))
    }

    /// Build a key from a pitch class (taken modulo 12) and a mode
    #[must_use]
    pub const fn from_parts(pitch_class: u8, mode: Mode) -> Self {
        Self((pitch_class % 12) * 2 + mode.bit())
    }

    /// All 24 keys in index order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..KEY_COUNT).map(Self)
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Semitones above C, `0..12`
    #[must_use]
    pub const fn pitch_class(self) -> u8 {
        self.0 / 2
    }

    #[must_use]
    pub const fn mode(self) -> Mode {
        if self.0 % 2 == 0 {
            Mode::Major
        } else {
            Mode::Minor
        }
    }

    /// Same pitch class in the other mode
    #[must_use]
    pub const fn relative(self) -> Self {
        Self::from_parts(self.pitch_class(), self.mode().flip())
    }

    /// Move the pitch class by `semitones` (either sign), keeping the mode
    #[must_use]
    pub const fn transpose(self, semitones: i32) -> Self {
        let pitch = (self.pitch_class() as i32 + semitones).rem_euclid(12) as u8;
        Self::from_parts(pitch, self.mode())
    }

    /// Camelot wheel position `1..=12`
    fn camelot_number(self) -> u8 {
        let pitch = usize::from(self.pitch_class());
        match self.mode() {
            Mode::Major => CAMELOT_MAJOR[pitch],
            Mode::Minor => CAMELOT_MINOR[pitch],
        }
    }

    /// Open Key label, e.g. `1d` for C major and `1m` for A minor
    #[must_use]
    pub fn open_key_label(self) -> String {
        // Open Key numbering is the Camelot wheel turned by five positions
        let number = (self.camelot_number() + 4) % 12 + 1;
        let suffix = match self.mode() {
            Mode::Major => 'd',
            Mode::Minor => 'm',
        };
        format!("{number}{suffix}")
    }

    /// Straight note label, e.g. `C` or `F#m`
    #[must_use]
    pub fn straight_label(self) -> String {
        let note = NOTE_NAMES[usize::from(self.pitch_class())];
        match self.mode() {
            Mode::Major => note.to_string(),
            Mode::Minor => format!("{note}m"),
        }
    }

    /// Camelot label, e.g. `8B` for C major and `8A` for A minor
    #[must_use]
    pub fn camelot_label(self) -> String {
        let letter = match self.mode() {
            Mode::Major => 'B',
            Mode::Minor => 'A',
        };
        format!("{}{letter}", self.camelot_number())
    }

    /// All display labels at once
    #[must_use]
    pub fn labels(self) -> KeyLabels {
        KeyLabels {
            index: self.0,
            open_key: self.open_key_label(),
            straight: self.straight_label(),
            camelot: self.camelot_label(),
        }
    }
}

impl fmt::Display for KeyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.open_key_label())
    }
}

/// Display labels of a key in every supported notation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyLabels {
    pub index: u8,
    pub open_key: String,
    pub straight: String,
    pub camelot: String,
}

/// Labels for a key index. The index is taken modulo 24.
#[must_use]
pub fn describe_key(key_index: i64) -> KeyLabels {
    KeyNode::wrapping(key_index).labels()
}

/// Error returned when a string names no key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised key `{0}` (expected an index 0-23, Open Key like 8m, Camelot like 8A, or a note like F#m)")]
pub struct ParseKeyError(String);

impl FromStr for KeyNode {
    type Err = ParseKeyError;

    /// Accepts a bare index, an Open Key label, a Camelot label, or a straight
    /// note name with optional sharp/flat and minor suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseKeyError(trimmed.to_string());

        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let raw: i64 = trimmed.parse().map_err(|_| err())?;
            return Self::from_raw(raw).ok_or_else(err);
        }

        if let Some(key) = WHEEL_LABELS.get(&trimmed.to_lowercase()) {
            return Ok(*key);
        }

        parse_straight(trimmed).ok_or_else(err)
    }
}

/// Parse note names like `C`, `F#m`, `Bb`, `Ebmin`
fn parse_straight(s: &str) -> Option<KeyNode> {
    let mut chars = s.chars().peekable();
    let base = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let pitch = match chars.peek() {
        Some('#') => {
            chars.next();
            (base + 1) % 12
        }
        Some('b') => {
            chars.next();
            (base + 11) % 12
        }
        _ => base,
    };

    let rest: String = chars.collect::<String>().to_lowercase();
    let mode = match rest.as_str() {
        "" | "maj" | "major" => Mode::Major,
        "m" | "min" | "minor" => Mode::Minor,
        _ => return None,
    };

    Some(KeyNode::from_parts(pitch, mode))
}
