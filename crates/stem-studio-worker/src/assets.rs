//! Location and loading of installed model assets.
//!
//! Assets live in the per-user data directory and are installed separately
//! from the binaries; a missing asset is an expected condition that the
//! fallback chain turns into a lower-quality strategy, not a crash.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::fallback::InitError;

/// Environment override for the model directory, used by tests and dev runs.
pub const MODELS_DIR_ENV: &str = "STEM_STUDIO_MODELS";

/// Directory the workers look in for model assets.
pub fn models_dir() -> PathBuf {
    if let Some(dir) = env::var_os(MODELS_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("StemStudio")
        .join("models")
}

/// Load and parse a JSON asset, mapping absence to a fallback-able init error.
pub fn load_json_asset<T: DeserializeOwned>(file_name: &str) -> Result<T, InitError> {
    let path = models_dir().join(file_name);
    if !path.is_file() {
        return Err(InitError::missing_assets(format!(
            "{} not found in {}",
            file_name,
            models_dir().display()
        )));
    }
    debug!(asset = %path.display(), "loading model asset");
    let raw = fs::read(&path)
        .map_err(|e| InitError::backend(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_slice(&raw)
        .map_err(|e| InitError::backend(format!("malformed asset {}: {e}", path.display())))
}
