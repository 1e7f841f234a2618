//! Self-contained onset-energy beat estimator.
//!
//! Frames the downmixed signal into RMS energies, takes the positive energy
//! flux as an onset envelope, peak-picks onsets and derives the tempo from
//! the median inter-onset interval. Deterministic, no assets, no model.

use stem_studio_proto::BeatPayload;

use crate::audio::AudioClip;
use crate::error::WorkerError;

use super::{check_duration, downbeats_every_bar, fold_bpm, silence_payload, BeatOptions, BeatTracker};

pub const NAME: &str = "onset-energy";

/// Onset envelope shared by both beat strategies.
pub(crate) struct OnsetEnvelope {
    /// Positive energy flux per frame, normalised to a peak of 1.
    pub flux: Vec<f32>,
    /// Frames per second.
    pub frame_rate: f64,
}

pub(crate) fn onset_envelope(clip: &AudioClip, hop_secs: f64) -> OnsetEnvelope {
    let mono = clip.mono();
    let hop = ((f64::from(clip.sample_rate) * hop_secs) as usize).max(32);
    let window = hop * 2;

    let mut energies = Vec::new();
    let mut start = 0;
    while start + window <= mono.len() {
        let mean_sq: f32 =
            mono[start..start + window].iter().map(|s| s * s).sum::<f32>() / window as f32;
        energies.push(mean_sq.sqrt());
        start += hop;
    }

    let mut flux = vec![0.0f32; energies.len()];
    for i in 1..energies.len() {
        flux[i] = (energies[i] - energies[i - 1]).max(0.0);
    }
    let peak = flux.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for value in &mut flux {
            *value /= peak;
        }
    }

    OnsetEnvelope { flux, frame_rate: f64::from(clip.sample_rate) / hop as f64 }
}

/// Peak-pick onset frames: local maxima above mean + 1.5 sigma, with a
/// refractory gap so one drum hit yields one onset.
pub(crate) fn pick_onsets(envelope: &OnsetEnvelope, refractory_secs: f64) -> Vec<usize> {
    let flux = &envelope.flux;
    if flux.len() < 3 {
        return Vec::new();
    }

    let mean = flux.iter().sum::<f32>() / flux.len() as f32;
    let var = flux.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / flux.len() as f32;
    let threshold = mean + 1.5 * var.sqrt();

    let refractory = (refractory_secs * envelope.frame_rate).round() as usize;
    let mut onsets: Vec<usize> = Vec::new();
    for i in 1..flux.len() - 1 {
        if flux[i] <= threshold || flux[i] < flux[i - 1] || flux[i] < flux[i + 1] {
            continue;
        }
        if let Some(&last) = onsets.last() {
            if i - last < refractory {
                continue;
            }
        }
        onsets.push(i);
    }
    onsets
}

#[derive(Debug, Default)]
pub struct OnsetEnergyTracker;

impl OnsetEnergyTracker {
    pub fn new() -> Self {
        Self
    }
}

impl BeatTracker for OnsetEnergyTracker {
    fn name(&self) -> &'static str {
        NAME
    }

    fn track(&self, clip: &AudioClip, opts: &BeatOptions) -> Result<BeatPayload, WorkerError> {
        check_duration(clip)?;

        let envelope = onset_envelope(clip, opts.hop_secs());
        let refractory = if opts.fine { 0.05 } else { 0.1 };
        let onsets = pick_onsets(&envelope, refractory);
        if onsets.len() < 2 {
            return Ok(silence_payload());
        }

        let mut intervals: Vec<f64> = onsets
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) as f64 / envelope.frame_rate)
            .collect();
        intervals.sort_by(|a, b| a.total_cmp(b));
        let median = intervals[intervals.len() / 2];

        let beats: Vec<f64> =
            onsets.iter().map(|&frame| frame as f64 / envelope.frame_rate).collect();
        let downbeats = downbeats_every_bar(&beats);

        Ok(BeatPayload { tempo_bpm: fold_bpm(60.0 / median), beats, downbeats })
    }
}
