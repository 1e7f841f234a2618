//! The two document shapes a worker may print on stdout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::PROTOCOL_VERSION;

/// Final document of a successful run (exit code 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessDocument<T> {
    /// Protocol version the worker speaks.
    pub version: u32,
    /// Resolved compute backend, e.g. `"cpu"` or `"metal"`.
    pub backend: String,
    /// Name of the processing strategy that actually ran.
    pub processor: String,
    /// Task-specific result body.
    pub payload: T,
    /// Non-fatal notes, e.g. that a fallback strategy was used.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T: Serialize> SuccessDocument<T> {
    pub fn new(backend: impl Into<String>, processor: impl Into<String>, payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            backend: backend.into(),
            processor: processor.into(),
            payload,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

impl<T: DeserializeOwned> SuccessDocument<T> {
    /// Parse raw stdout bytes as a success document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Final document of a failed run (exit code 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Machine-readable failure class.
    pub error: WorkerErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Optional structured context, e.g. per-candidate init failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

impl ErrorDocument {
    pub fn new(error: WorkerErrorKind, message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            error,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Parse raw stdout bytes as an error document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Failure classes a worker can report about its own run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerErrorKind {
    /// The input file could not be read or decoded.
    BadInput,
    /// A required model asset is not installed.
    MissingAssets,
    /// No processing strategy could be initialised.
    BackendInit,
    /// Unexpected internal failure (including caught panics).
    Internal,
}

impl WorkerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerErrorKind::BadInput => "bad-input",
            WorkerErrorKind::MissingAssets => "missing-assets",
            WorkerErrorKind::BackendInit => "backend-init",
            WorkerErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for WorkerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
