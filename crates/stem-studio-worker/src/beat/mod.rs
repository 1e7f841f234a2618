//! Beat and tempo analysis strategies.
//!
//! Two candidates, best first: the asset-backed comb-filter tracker, then the
//! self-contained onset-energy estimator that needs nothing installed.

pub mod comb;
pub mod onset;

use stem_studio_proto::BeatPayload;

use crate::audio::AudioClip;
use crate::error::WorkerError;
use crate::fallback::Candidate;

pub use comb::CombTracker;
pub use onset::OnsetEnergyTracker;

/// Inputs shorter than this carry too little context to analyse.
const MIN_DURATION_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct BeatOptions {
    /// Use a finer onset grid (slower, more precise timing).
    pub fine: bool,
}

impl BeatOptions {
    pub(crate) fn hop_secs(&self) -> f64 {
        if self.fine {
            0.0058
        } else {
            0.0116
        }
    }
}

pub trait BeatTracker {
    fn name(&self) -> &'static str;
    fn track(&self, clip: &AudioClip, opts: &BeatOptions) -> Result<BeatPayload, WorkerError>;
}

/// The fallback chain for the beat-detection service, best quality first.
pub fn candidates() -> Vec<Candidate<Box<dyn BeatTracker>>> {
    vec![
        Candidate::new(comb::NAME, |backend| {
            CombTracker::init(backend).map(|t| Box::new(t) as Box<dyn BeatTracker>)
        }),
        Candidate::new(onset::NAME, |_| {
            Ok(Box::new(OnsetEnergyTracker::new()) as Box<dyn BeatTracker>)
        }),
    ]
}

pub(crate) fn check_duration(clip: &AudioClip) -> Result<(), WorkerError> {
    if clip.duration_secs() < MIN_DURATION_SECS {
        return Err(WorkerError::BadInput(format!(
            "audio too short to analyse ({:.2}s)",
            clip.duration_secs()
        )));
    }
    Ok(())
}

/// Payload for input with no detectable rhythmic content.
pub(crate) fn silence_payload() -> BeatPayload {
    BeatPayload { tempo_bpm: 0.0, beats: Vec::new(), downbeats: Vec::new() }
}

/// Every fourth beat, starting at the first.
pub(crate) fn downbeats_every_bar(beats: &[f64]) -> Vec<f64> {
    beats.iter().step_by(4).copied().collect()
}

/// Fold a raw tempo estimate into the usable [70, 180) BPM octave.
pub(crate) fn fold_bpm(mut bpm: f64) -> f64 {
    if bpm <= 0.0 {
        return 0.0;
    }
    while bpm < 70.0 {
        bpm *= 2.0;
    }
    while bpm >= 180.0 {
        bpm /= 2.0;
    }
    bpm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_bpm_into_octave() {
        assert_eq!(fold_bpm(120.0), 120.0);
        assert_eq!(fold_bpm(60.0), 120.0);
        assert_eq!(fold_bpm(240.0), 120.0);
        assert_eq!(fold_bpm(0.0), 0.0);
    }

    #[test]
    fn test_downbeats_take_every_fourth_beat() {
        let beats = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
        assert_eq!(downbeats_every_bar(&beats), vec![0.0, 2.0]);
    }

    #[test]
    fn test_candidates_declare_best_first() {
        let chain = candidates();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), comb::NAME);
        assert_eq!(chain[1].name(), onset::NAME);
    }
}
