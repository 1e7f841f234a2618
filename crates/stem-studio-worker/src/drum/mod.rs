//! Drum-component separation strategies.
//!
//! Two candidates, best first: the asset-backed kit separator with tuned
//! crossovers, then the fixed band-split network that needs nothing
//! installed. Both write one WAV per stem into the caller's output directory.

pub mod bands;
pub mod kit;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use stem_studio_proto::DrumStemsPayload;

use crate::audio::AudioClip;
use crate::error::WorkerError;
use crate::fallback::Candidate;

pub use bands::BandSplitSeparator;
pub use kit::DrumKitSeparator;

/// Processing quality requested via `--quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Fast,
    #[default]
    Best,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Fast => "fast",
            Quality::Best => "best",
        }
    }

    /// Filter cascade depth: steeper band edges at `best`.
    pub(crate) fn filter_stages(&self) -> u32 {
        match self {
            Quality::Fast => 1,
            Quality::Best => 2,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown quality `{0}`, expected fast or best")]
pub struct QualityParseError(String);

impl FromStr for Quality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Quality::Fast),
            "best" => Ok(Quality::Best),
            other => Err(QualityParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DrumOptions {
    pub quality: Quality,
}

pub trait DrumSeparator {
    fn name(&self) -> &'static str;
    fn separate(
        &self,
        clip: &AudioClip,
        output_dir: &Path,
        opts: &DrumOptions,
    ) -> Result<DrumStemsPayload, WorkerError>;
}

/// The fallback chain for the drum-separation service, best quality first.
pub fn candidates() -> Vec<Candidate<Box<dyn DrumSeparator>>> {
    vec![
        Candidate::new(kit::NAME, |backend| {
            DrumKitSeparator::init(backend).map(|s| Box::new(s) as Box<dyn DrumSeparator>)
        }),
        Candidate::new(bands::NAME, |_| {
            Ok(Box::new(BandSplitSeparator::new()) as Box<dyn DrumSeparator>)
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parses_wire_names() {
        assert_eq!("fast".parse::<Quality>().unwrap(), Quality::Fast);
        assert_eq!("best".parse::<Quality>().unwrap(), Quality::Best);
        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn test_candidates_declare_best_first() {
        let chain = candidates();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), kit::NAME);
        assert_eq!(chain[1].name(), bands::NAME);
    }
}
