//! Client-side configuration, loadable from the application's config store.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::supervisor::{CaptureLimits, TerminationPolicy};

/// Tunables for every invocation made through one [`crate::ServiceClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Extra directory to search for worker binaries, ahead of the
    /// per-user install locations (used by dev builds and tests).
    pub worker_dir: Option<PathBuf>,
    /// Wall-clock budget for requests that do not set their own.
    pub default_timeout: Duration,
    /// Grace periods of the staged termination sequence.
    pub termination: TerminationPolicy,
    /// Output capture bounds.
    pub capture: CaptureLimits,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            worker_dir: None,
            default_timeout: Duration::from_secs(300),
            termination: TerminationPolicy::default(),
            capture: CaptureLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_deserialize_with_partial_input() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"worker_dir":"/opt/stemstudio/bin"}"#).unwrap();
        assert_eq!(settings.worker_dir, Some(PathBuf::from("/opt/stemstudio/bin")));
        assert_eq!(settings.default_timeout, Duration::from_secs(300));
        assert!(settings.capture.stdout_max_bytes > 0);
    }
}
