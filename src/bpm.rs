//! BPM tolerance checks and tempo-driven pitch shift.
//!
//! All functions are pure. A BPM is only usable when it is finite and
//! strictly positive; anything else never passes a tolerance check.

use crate::key::KeyNode;
use serde::Serialize;

/// Default maximum BPM deviation, in percent
pub const DEFAULT_TOLERANCE_PCT: f64 = 5.0;

// Relative slack on the window edge so that 131.25 passes a 5% window at 125
const EDGE_SLACK: f64 = 1e-12;

fn usable(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

/// Signed deviation of `candidate` from `anchor`, in percent of the anchor.
///
/// ```
/// use mixchain::bpm::bpm_offset_pct;
/// assert!((bpm_offset_pct(125.0, 128.0) - 2.4).abs() < 1e-9);
/// ```
#[must_use]
pub fn bpm_offset_pct(anchor: f64, candidate: f64) -> f64 {
    (candidate - anchor) / anchor * 100.0
}

/// Whether `candidate` lies within `tolerance_pct` percent of `anchor`.
///
/// False when either BPM is absent or unusable. A zero tolerance demands an
/// exact match.
#[must_use]
pub fn is_within_tolerance(anchor: Option<f64>, candidate: Option<f64>, tolerance_pct: f64) -> bool {
    match (anchor, candidate) {
        (Some(anchor), Some(candidate)) if usable(anchor) && usable(candidate) => {
            bpm_offset_pct(anchor, candidate).abs() <= tolerance_pct * (1.0 + EDGE_SLACK)
        }
        _ => false,
    }
}

/// Whole semitones a track moves when played at `played_bpm` instead of its
/// `native_bpm`, as on a turntable or a deck with key lock off.
#[must_use]
pub fn semitone_shift(native_bpm: f64, played_bpm: f64) -> i32 {
    if !usable(native_bpm) || !usable(played_bpm) {
        return 0;
    }
    (12.0 * (played_bpm / native_bpm).log2()).round() as i32
}

/// Key heard when a track in `base` at `native_bpm` is played at `played_bpm`.
///
/// The pitch class advances by [`semitone_shift`] semitones, the mode stays.
/// Unusable BPMs leave the key unchanged.
#[must_use]
pub fn adjusted_key(base: KeyNode, native_bpm: f64, played_bpm: f64) -> KeyNode {
    base.transpose(semitone_shift(native_bpm, played_bpm))
}

/// BPM range accepted around one anchor tempo
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BpmWindow {
    pub anchor: f64,
    pub tolerance_pct: f64,
}

impl BpmWindow {
    #[must_use]
    pub const fn new(anchor: f64, tolerance_pct: f64) -> Self {
        Self { anchor, tolerance_pct }
    }

    /// Lowest and highest accepted BPM
    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        let spread = self.anchor * self.tolerance_pct / 100.0;
        (self.anchor - spread, self.anchor + spread)
    }

    #[must_use]
    pub fn contains(&self, bpm: f64) -> bool {
        is_within_tolerance(Some(self.anchor), Some(bpm), self.tolerance_pct)
    }

    /// Signed offset of `bpm` from the anchor, in percent
    #[must_use]
    pub fn offset_pct(&self, bpm: f64) -> f64 {
        bpm_offset_pct(self.anchor, bpm)
    }
}
