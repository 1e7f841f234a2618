//! Worker-side failure type and its mapping onto the wire contract.

use serde::Serialize;
use stem_studio_proto::{ErrorDocument, WorkerErrorKind};

/// One candidate that failed to initialise, kept for the error details.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateFailure {
    pub candidate: String,
    pub message: String,
}

/// Anything that can end a worker run with a structured failure.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The input file could not be read or decoded.
    #[error("{0}")]
    BadInput(String),

    /// A single processing strategy refused to initialise.
    #[error("{message}")]
    Init { kind: WorkerErrorKind, message: String },

    /// Every candidate in the fallback chain failed.
    #[error("no processing strategy could be initialised")]
    ChainExhausted { failures: Vec<CandidateFailure> },

    /// Unexpected failure, including caught panics.
    #[error("{0}")]
    Internal(String),
}

impl WorkerError {
    pub fn kind(&self) -> WorkerErrorKind {
        match self {
            WorkerError::BadInput(_) => WorkerErrorKind::BadInput,
            WorkerError::Init { kind, .. } => *kind,
            WorkerError::ChainExhausted { .. } => WorkerErrorKind::BackendInit,
            WorkerError::Internal(_) => WorkerErrorKind::Internal,
        }
    }

    /// Render as the document printed on stdout before exiting 1.
    pub fn to_document(&self) -> ErrorDocument {
        let doc = ErrorDocument::new(self.kind(), self.to_string());
        match self {
            WorkerError::ChainExhausted { failures } => doc.with_details(
                serde_json::json!({ "candidates": failures }),
            ),
            _ => doc,
        }
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Internal(err.to_string())
    }
}
