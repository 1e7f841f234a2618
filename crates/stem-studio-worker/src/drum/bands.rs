//! Band-split separation engine and the self-contained fallback separator.
//!
//! Splits the signal into four frequency bands with cascaded one-pole
//! lowpass filters and maps them onto the drum stems (kick low, toms
//! low-mid, snare mid, cymbals top). Deterministic and dependency-free;
//! this is the strategy of last resort and is always marked as such by the
//! fallback-chain annotation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use stem_studio_proto::{DrumStem, DrumStemsPayload};
use tracing::debug;

use crate::audio::{self, AudioClip};
use crate::error::WorkerError;

use super::{DrumOptions, DrumSeparator};

pub const NAME: &str = "band-split";

/// Band edges in Hz, ascending: kick/toms, toms/snare, snare/cymbals.
#[derive(Debug, Clone, Copy)]
pub struct Crossovers {
    pub kick_hz: f64,
    pub toms_hz: f64,
    pub snare_hz: f64,
}

impl Default for Crossovers {
    fn default() -> Self {
        Self { kick_hz: 120.0, toms_hz: 350.0, snare_hz: 2_500.0 }
    }
}

/// Per-stem output gain, unity unless an asset says otherwise.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StemGains {
    pub kick: f64,
    pub snare: f64,
    pub toms: f64,
    pub cymbals: f64,
}

impl Default for StemGains {
    fn default() -> Self {
        Self { kick: 1.0, snare: 1.0, toms: 1.0, cymbals: 1.0 }
    }
}

impl StemGains {
    fn for_stem(&self, stem: DrumStem) -> f64 {
        match stem {
            DrumStem::Kick => self.kick,
            DrumStem::Snare => self.snare,
            DrumStem::Toms => self.toms,
            DrumStem::Cymbals => self.cymbals,
        }
    }
}

/// One-pole lowpass over interleaved samples, per-channel state.
fn one_pole_lowpass(samples: &[f32], channels: usize, sample_rate: u32, cutoff_hz: f64) -> Vec<f32> {
    let dt = 1.0 / f64::from(sample_rate);
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz);
    let alpha = (dt / (rc + dt)) as f32;

    let mut state = vec![0.0f32; channels];
    let mut out = Vec::with_capacity(samples.len());
    for (i, &sample) in samples.iter().enumerate() {
        let ch = i % channels;
        state[ch] += alpha * (sample - state[ch]);
        out.push(state[ch]);
    }
    out
}

fn lowpass(samples: &[f32], channels: usize, sample_rate: u32, cutoff_hz: f64, stages: u32) -> Vec<f32> {
    let mut out = one_pole_lowpass(samples, channels, sample_rate, cutoff_hz);
    for _ in 1..stages {
        out = one_pole_lowpass(&out, channels, sample_rate, cutoff_hz);
    }
    out
}

fn subtract(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Split the clip into the four stem signals, in `DrumStem::ALL` order.
pub(crate) fn split_bands(
    clip: &AudioClip,
    crossovers: Crossovers,
    stages: u32,
) -> Vec<(DrumStem, Vec<f32>)> {
    let channels = clip.channels.max(1) as usize;
    let low = lowpass(&clip.samples, channels, clip.sample_rate, crossovers.kick_hz, stages);
    let low_mid = lowpass(&clip.samples, channels, clip.sample_rate, crossovers.toms_hz, stages);
    let mid = lowpass(&clip.samples, channels, clip.sample_rate, crossovers.snare_hz, stages);

    vec![
        (DrumStem::Kick, low.clone()),
        (DrumStem::Snare, subtract(&mid, &low_mid)),
        (DrumStem::Toms, subtract(&low_mid, &low)),
        (DrumStem::Cymbals, subtract(&clip.samples, &mid)),
    ]
}

/// Run the band engine and write one WAV per stem into `output_dir`.
pub(crate) fn render_stems(
    clip: &AudioClip,
    crossovers: Crossovers,
    gains: StemGains,
    output_dir: &Path,
    opts: &DrumOptions,
) -> Result<DrumStemsPayload, WorkerError> {
    fs::create_dir_all(output_dir).map_err(|e| {
        WorkerError::Internal(format!("cannot create `{}`: {e}", output_dir.display()))
    })?;

    let mut stems = BTreeMap::new();
    for (stem, mut samples) in split_bands(clip, crossovers, opts.quality.filter_stages()) {
        let gain = gains.for_stem(stem) as f32;
        if (gain - 1.0).abs() > f32::EPSILON {
            for sample in &mut samples {
                *sample *= gain;
            }
        }
        let path = output_dir.join(format!("{stem}.wav"));
        audio::write_wav(&path, &samples, clip.channels, clip.sample_rate)?;
        debug!(stem = %stem, path = %path.display(), "stem written");
        stems.insert(stem.as_str().to_string(), path);
    }
    Ok(DrumStemsPayload { stems })
}

#[derive(Debug, Default)]
pub struct BandSplitSeparator;

impl BandSplitSeparator {
    pub fn new() -> Self {
        Self
    }
}

impl DrumSeparator for BandSplitSeparator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn separate(
        &self,
        clip: &AudioClip,
        output_dir: &Path,
        opts: &DrumOptions,
    ) -> Result<DrumStemsPayload, WorkerError> {
        render_stems(clip, Crossovers::default(), StemGains::default(), output_dir, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drum::Quality;

    fn sine_clip(freq_hz: f64, sample_rate: u32, secs: f64) -> AudioClip {
        let total = (secs * f64::from(sample_rate)) as usize;
        let samples = (0..total)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                (0.7 * (2.0 * std::f64::consts::PI * freq_hz * t).sin()) as f32
            })
            .collect();
        AudioClip { samples, channels: 1, sample_rate }
    }

    fn energy(samples: &[f32]) -> f64 {
        samples.iter().map(|s| f64::from(*s) * f64::from(*s)).sum()
    }

    #[test]
    fn test_low_tone_lands_in_kick_band() {
        let clip = sine_clip(50.0, 22_050, 1.0);
        let bands = split_bands(&clip, Crossovers::default(), 2);
        let by_stem: BTreeMap<DrumStem, f64> =
            bands.iter().map(|(stem, samples)| (*stem, energy(samples))).collect();
        assert!(by_stem[&DrumStem::Kick] > by_stem[&DrumStem::Cymbals] * 4.0);
    }

    #[test]
    fn test_high_tone_lands_in_cymbal_band() {
        let clip = sine_clip(8_000.0, 22_050, 1.0);
        let bands = split_bands(&clip, Crossovers::default(), 2);
        let by_stem: BTreeMap<DrumStem, f64> =
            bands.iter().map(|(stem, samples)| (*stem, energy(samples))).collect();
        assert!(by_stem[&DrumStem::Cymbals] > by_stem[&DrumStem::Kick] * 4.0);
    }

    #[test]
    fn test_bands_sum_back_to_the_input() {
        let clip = sine_clip(440.0, 22_050, 0.5);
        let bands = split_bands(&clip, Crossovers::default(), 1);
        for i in (0..clip.samples.len()).step_by(997) {
            let sum: f32 = bands.iter().map(|(_, samples)| samples[i]).sum();
            assert!((sum - clip.samples[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_render_writes_all_four_stems() {
        let dir = std::env::temp_dir().join(format!("stem-studio-bands-{}", std::process::id()));
        let clip = sine_clip(200.0, 8_000, 0.5);
        let payload = BandSplitSeparator::new()
            .separate(&clip, &dir, &DrumOptions { quality: Quality::Fast })
            .unwrap();

        assert_eq!(payload.stems.len(), 4);
        for stem in DrumStem::ALL {
            let path = payload.path_for(stem).expect("stem path");
            assert!(path.is_file(), "missing {}", path.display());
        }
    }
}
