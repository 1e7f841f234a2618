//! Asset-backed comb-filter tempo tracker.
//!
//! The best-quality strategy: correlates the onset envelope against a bank of
//! tempo hypotheses loaded from the installed `tempo_comb.json` asset, then
//! lays a regular beat grid at the winning period and phase. Refuses to
//! initialise when the asset is not installed, which hands the run to the
//! next candidate in the chain.

use serde::Deserialize;
use stem_studio_proto::{BackendKind, BeatPayload};

use crate::assets;
use crate::audio::AudioClip;
use crate::error::WorkerError;
use crate::fallback::InitError;

use super::onset::{onset_envelope, OnsetEnvelope};
use super::{check_duration, downbeats_every_bar, fold_bpm, silence_payload, BeatOptions, BeatTracker};

pub const NAME: &str = "tempo-comb";
pub const ASSET_FILE: &str = "tempo_comb.json";

/// Tempo hypothesis bank shipped as a model asset.
#[derive(Debug, Clone, Deserialize)]
pub struct CombBank {
    pub bpm_min: f64,
    pub bpm_max: f64,
    pub bpm_step: f64,
    /// Optional prior per grid entry; empty means uniform.
    #[serde(default)]
    pub weights: Vec<f64>,
}

impl CombBank {
    fn grid(&self) -> Vec<f64> {
        let mut grid = Vec::new();
        let mut bpm = self.bpm_min;
        while bpm <= self.bpm_max + 1e-9 {
            grid.push(bpm);
            bpm += self.bpm_step;
        }
        grid
    }

    fn validate(&self) -> Result<(), InitError> {
        if !(self.bpm_step > 0.0 && self.bpm_min > 0.0 && self.bpm_min < self.bpm_max) {
            return Err(InitError::backend(format!(
                "{ASSET_FILE}: invalid tempo grid {}..{} step {}",
                self.bpm_min, self.bpm_max, self.bpm_step
            )));
        }
        let grid_len = self.grid().len();
        if !self.weights.is_empty() && self.weights.len() != grid_len {
            return Err(InitError::backend(format!(
                "{ASSET_FILE}: {} weights for {} grid entries",
                self.weights.len(),
                grid_len
            )));
        }
        Ok(())
    }
}

pub struct CombTracker {
    bank: CombBank,
}

impl CombTracker {
    pub fn init(_backend: BackendKind) -> Result<Self, InitError> {
        Self::from_bank(assets::load_json_asset(ASSET_FILE)?)
    }

    pub fn from_bank(bank: CombBank) -> Result<Self, InitError> {
        bank.validate()?;
        Ok(Self { bank })
    }

    /// Correlation of the envelope with itself one (and two) periods later.
    fn comb_score(envelope: &OnsetEnvelope, period_frames: f64) -> f64 {
        let flux = &envelope.flux;
        let period = period_frames.round() as usize;
        if period == 0 || period >= flux.len() {
            return 0.0;
        }

        let mut score = 0.0f64;
        let mut count = 0usize;
        for t in 0..flux.len() - period {
            let mut hit = f64::from(flux[t]) * f64::from(flux[t + period]);
            if t + 2 * period < flux.len() {
                hit += 0.5 * f64::from(flux[t]) * f64::from(flux[t + 2 * period]);
            }
            score += hit;
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            score / count as f64
        }
    }

    /// Offset in [0, period) whose grid collects the most onset energy.
    fn best_phase(envelope: &OnsetEnvelope, period_frames: f64) -> usize {
        let flux = &envelope.flux;
        let period = period_frames.round().max(1.0) as usize;
        let mut best = (0usize, -1.0f64);
        for offset in 0..period.min(flux.len()) {
            let mut sum = 0.0f64;
            let mut t = offset as f64;
            while (t as usize) < flux.len() {
                sum += f64::from(flux[t as usize]);
                t += period_frames;
            }
            if sum > best.1 {
                best = (offset, sum);
            }
        }
        best.0
    }
}

impl BeatTracker for CombTracker {
    fn name(&self) -> &'static str {
        NAME
    }

    fn track(&self, clip: &AudioClip, opts: &BeatOptions) -> Result<BeatPayload, WorkerError> {
        check_duration(clip)?;

        let envelope = onset_envelope(clip, opts.hop_secs());
        let grid = self.bank.grid();

        let mut best: Option<(f64, f64)> = None;
        for (i, &bpm) in grid.iter().enumerate() {
            let period_frames = 60.0 / bpm * envelope.frame_rate;
            let weight = self.bank.weights.get(i).copied().unwrap_or(1.0);
            let score = Self::comb_score(&envelope, period_frames) * weight;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((bpm, score));
            }
        }

        let Some((raw_bpm, score)) = best else {
            return Ok(silence_payload());
        };
        if score <= 0.0 {
            return Ok(silence_payload());
        }

        // The comb scores a tempo and its half-tempo alike (every other beat
        // still lines up); fold the winner into the usable octave.
        let tempo_bpm = fold_bpm(raw_bpm);
        let period_frames = 60.0 / tempo_bpm * envelope.frame_rate;
        let phase = Self::best_phase(&envelope, period_frames);

        let mut beats = Vec::new();
        let mut frame = phase as f64;
        while frame < envelope.flux.len() as f64 {
            beats.push(frame / envelope.frame_rate);
            frame += period_frames;
        }
        let downbeats = downbeats_every_bar(&beats);

        Ok(BeatPayload { tempo_bpm, beats, downbeats })
    }
}
