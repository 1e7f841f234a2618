//! The closed failure set surfaced to callers of the client facade.
//!
//! A misbehaving worker must never crash the supervising application: every
//! internal condition (spawn failure, timeout, garbage output) is folded into
//! this one enum, so call sites handle a single set and can degrade or retry.

use std::time::Duration;

use stem_studio_proto::WorkerErrorKind;

/// Failure category, independent of the captured context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No worker binary installed; the feature is optional, degrade quietly.
    NotAvailable,
    /// The worker outlived its budget and has already been terminated.
    Timeout,
    /// Termination was caller-initiated.
    Cancelled,
    /// The worker broke the output contract.
    ProtocolError,
    /// The worker itself reported a structured failure.
    ProcessingError,
    /// Non-zero exit with output nothing could be made of.
    UnknownError,
}

/// Why an invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("no `{service}` worker binary is installed")]
    NotAvailable { service: &'static str },

    #[error("`{service}` did not finish within {timeout:?} and was terminated")]
    Timeout { service: &'static str, timeout: Duration, stderr_tail: String },

    #[error("`{service}` invocation was cancelled")]
    Cancelled { service: &'static str, stderr_tail: String },

    #[error("`{service}` violated the worker contract: {message}")]
    Protocol { service: &'static str, message: String, stderr_tail: String },

    #[error("`{service}` reported {kind}: {message}")]
    Processing {
        service: &'static str,
        kind: WorkerErrorKind,
        message: String,
        details: Option<serde_json::Value>,
        stderr_tail: String,
    },

    #[error("`{service}` failed: {message}")]
    Unknown { service: &'static str, message: String, stderr_tail: String },
}

impl InvokeError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            InvokeError::NotAvailable { .. } => FailureKind::NotAvailable,
            InvokeError::Timeout { .. } => FailureKind::Timeout,
            InvokeError::Cancelled { .. } => FailureKind::Cancelled,
            InvokeError::Protocol { .. } => FailureKind::ProtocolError,
            InvokeError::Processing { .. } => FailureKind::ProcessingError,
            InvokeError::Unknown { .. } => FailureKind::UnknownError,
        }
    }

    /// Captured stderr of the worker, for logging; empty when nothing ran.
    pub fn stderr_tail(&self) -> &str {
        match self {
            InvokeError::NotAvailable { .. } => "",
            InvokeError::Timeout { stderr_tail, .. }
            | InvokeError::Cancelled { stderr_tail, .. }
            | InvokeError::Protocol { stderr_tail, .. }
            | InvokeError::Processing { stderr_tail, .. }
            | InvokeError::Unknown { stderr_tail, .. } => stderr_tail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_maps_to_its_kind() {
        let err = InvokeError::NotAvailable { service: "beat-detector" };
        assert_eq!(err.failure_kind(), FailureKind::NotAvailable);
        assert_eq!(err.stderr_tail(), "");

        let err = InvokeError::Processing {
            service: "drum-separator",
            kind: WorkerErrorKind::MissingAssets,
            message: "no model installed".to_string(),
            details: None,
            stderr_tail: "loading...".to_string(),
        };
        assert_eq!(err.failure_kind(), FailureKind::ProcessingError);
        assert!(err.to_string().contains("missing-assets"));
        assert_eq!(err.stderr_tail(), "loading...");
    }
}
