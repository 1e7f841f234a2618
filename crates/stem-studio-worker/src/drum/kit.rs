//! Asset-backed drum-kit separator.
//!
//! Same band engine as the fallback, but the crossovers and per-stem gains
//! come from the installed `drum_kit.json` asset, tuned per kit. Missing
//! asset means this candidate steps aside for the fixed band-split.

use std::path::Path;

use serde::Deserialize;
use stem_studio_proto::{BackendKind, DrumStemsPayload};

use crate::assets;
use crate::audio::AudioClip;
use crate::error::WorkerError;
use crate::fallback::InitError;

use super::bands::{render_stems, Crossovers, StemGains};
use super::{DrumOptions, DrumSeparator};

pub const NAME: &str = "drum-kit";
pub const ASSET_FILE: &str = "drum_kit.json";

#[derive(Debug, Clone, Deserialize)]
pub struct KitManifest {
    /// Band edges in Hz, ascending.
    pub crossovers_hz: [f64; 3],
    #[serde(default)]
    pub gains: StemGains,
}

impl KitManifest {
    fn validate(&self) -> Result<(), InitError> {
        let [a, b, c] = self.crossovers_hz;
        if !(a > 0.0 && a < b && b < c) {
            return Err(InitError::backend(format!(
                "{ASSET_FILE}: crossovers must ascend, got {a} / {b} / {c}"
            )));
        }
        Ok(())
    }

    fn crossovers(&self) -> Crossovers {
        let [kick_hz, toms_hz, snare_hz] = self.crossovers_hz;
        Crossovers { kick_hz, toms_hz, snare_hz }
    }
}

pub struct DrumKitSeparator {
    manifest: KitManifest,
}

impl DrumKitSeparator {
    pub fn init(_backend: BackendKind) -> Result<Self, InitError> {
        Self::from_manifest(assets::load_json_asset(ASSET_FILE)?)
    }

    pub fn from_manifest(manifest: KitManifest) -> Result<Self, InitError> {
        manifest.validate()?;
        Ok(Self { manifest })
    }
}

impl DrumSeparator for DrumKitSeparator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn separate(
        &self,
        clip: &AudioClip,
        output_dir: &Path,
        opts: &DrumOptions,
    ) -> Result<DrumStemsPayload, WorkerError> {
        render_stems(clip, self.manifest.crossovers(), self.manifest.gains, output_dir, opts)
    }
}
