//! Device preference and resolved backend names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller-side backend preference, as accepted by `--device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelection {
    /// Probe for acceleration, fall back to CPU.
    #[default]
    Auto,
    /// Use the platform's accelerated backend without probing.
    Accelerated,
    /// Force CPU.
    Cpu,
}

impl DeviceSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceSelection::Auto => "auto",
            DeviceSelection::Accelerated => "accelerated",
            DeviceSelection::Cpu => "cpu",
        }
    }
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown device `{0}`, expected auto, accelerated or cpu")]
pub struct DeviceParseError(String);

impl FromStr for DeviceSelection {
    type Err = DeviceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DeviceSelection::Auto),
            "accelerated" => Ok(DeviceSelection::Accelerated),
            "cpu" => Ok(DeviceSelection::Cpu),
            other => Err(DeviceParseError(other.to_string())),
        }
    }
}

/// Concrete compute backend a worker resolved to.
///
/// The canonical lowercase name appears verbatim in the `backend` field of
/// every success document, so tests can assert which path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Metal,
    Cuda,
    Cpu,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Metal => "metal",
            BackendKind::Cuda => "cuda",
            BackendKind::Cpu => "cpu",
        }
    }

    pub fn is_accelerated(&self) -> bool {
        !matches!(self, BackendKind::Cpu)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_parses_wire_names() {
        assert_eq!("auto".parse::<DeviceSelection>().unwrap(), DeviceSelection::Auto);
        assert_eq!(
            "accelerated".parse::<DeviceSelection>().unwrap(),
            DeviceSelection::Accelerated
        );
        assert_eq!("cpu".parse::<DeviceSelection>().unwrap(), DeviceSelection::Cpu);
        assert!("gpu".parse::<DeviceSelection>().is_err());
    }

    #[test]
    fn test_backend_names_are_lowercase() {
        assert_eq!(BackendKind::Metal.name(), "metal");
        assert_eq!(BackendKind::Cuda.name(), "cuda");
        assert_eq!(BackendKind::Cpu.name(), "cpu");
        assert!(!BackendKind::Cpu.is_accelerated());
        assert!(BackendKind::Cuda.is_accelerated());
    }
}
