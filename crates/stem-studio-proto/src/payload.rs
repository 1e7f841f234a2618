//! Task-specific payload bodies carried inside success documents.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result body of the beat/tempo detection service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatPayload {
    /// Estimated tempo in beats per minute.
    pub tempo_bpm: f64,
    /// Beat positions in seconds, ascending.
    pub beats: Vec<f64>,
    /// Estimated bar starts in seconds, a subset of `beats`.
    #[serde(default)]
    pub downbeats: Vec<f64>,
}

/// Result body of the drum-component separation service:
/// stem name to written output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrumStemsPayload {
    pub stems: BTreeMap<String, PathBuf>,
}

impl DrumStemsPayload {
    pub fn path_for(&self, stem: DrumStem) -> Option<&PathBuf> {
        self.stems.get(stem.as_str())
    }
}

/// The drum components every separation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DrumStem {
    Kick,
    Snare,
    Toms,
    Cymbals,
}

impl DrumStem {
    pub const ALL: [DrumStem; 4] = [DrumStem::Kick, DrumStem::Snare, DrumStem::Toms, DrumStem::Cymbals];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrumStem::Kick => "kick",
            DrumStem::Snare => "snare",
            DrumStem::Toms => "toms",
            DrumStem::Cymbals => "cymbals",
        }
    }
}

impl fmt::Display for DrumStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
