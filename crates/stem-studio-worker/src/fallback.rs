//! Ordered fallback over alternative processing strategies.
//!
//! Candidates are declared best-first; the first one that initialises wins.
//! The selection is annotated with the winning name and every skipped
//! candidate, and that annotation ends up in the result document so callers
//! can tell a fallback run from a first-choice run.

use stem_studio_proto::{BackendKind, WorkerErrorKind};
use tracing::{debug, warn};

use crate::error::{CandidateFailure, WorkerError};

/// Why a single candidate refused to initialise.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct InitError {
    pub kind: WorkerErrorKind,
    pub message: String,
}

impl InitError {
    pub fn missing_assets(message: impl Into<String>) -> Self {
        Self { kind: WorkerErrorKind::MissingAssets, message: message.into() }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self { kind: WorkerErrorKind::BackendInit, message: message.into() }
    }
}

type InitFn<T> = Box<dyn FnOnce(BackendKind) -> Result<T, InitError>>;

/// One strategy in the chain: a name plus a deferred constructor.
pub struct Candidate<T> {
    name: &'static str,
    init: InitFn<T>,
}

impl<T> Candidate<T> {
    pub fn new(
        name: &'static str,
        init: impl FnOnce(BackendKind) -> Result<T, InitError> + 'static,
    ) -> Self {
        Self { name, init: Box::new(init) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The strategy that won, with the trail of skipped candidates.
#[derive(Debug)]
pub struct Selected<T> {
    pub processor: T,
    pub name: &'static str,
    pub skipped: Vec<CandidateFailure>,
}

impl<T> Selected<T> {
    /// Warning line for the result document when this was not the first choice.
    pub fn fallback_warning(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.skipped.iter().map(|f| f.candidate.as_str()).collect();
        Some(format!(
            "preferred strategies unavailable ({}); ran {}",
            names.join(", "),
            self.name
        ))
    }

    pub fn warnings(&self) -> Vec<String> {
        self.fallback_warning().into_iter().collect()
    }
}

/// Try candidates in declaration order; return the first that initialises.
pub fn select<T>(
    backend: BackendKind,
    candidates: Vec<Candidate<T>>,
) -> Result<Selected<T>, WorkerError> {
    let mut skipped = Vec::new();
    for candidate in candidates {
        let name = candidate.name;
        match (candidate.init)(backend) {
            Ok(processor) => {
                debug!(processor = name, %backend, "processing strategy initialised");
                return Ok(Selected { processor, name, skipped });
            }
            Err(err) => {
                warn!(candidate = name, error = %err, "strategy unavailable, trying next");
                skipped.push(CandidateFailure {
                    candidate: name.to_string(),
                    message: err.message,
                });
            }
        }
    }
    Err(WorkerError::ChainExhausted { failures: skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(name: &'static str) -> Candidate<&'static str> {
        Candidate::new(name, move |_| Err(InitError::missing_assets(format!("{name} assets gone"))))
    }

    fn working(name: &'static str) -> Candidate<&'static str> {
        Candidate::new(name, move |_| Ok(name))
    }

    #[test]
    fn test_first_working_candidate_wins() {
        let selected = select(BackendKind::Cpu, vec![working("a"), working("b")]).unwrap();
        assert_eq!(selected.name, "a");
        assert!(selected.skipped.is_empty());
        assert_eq!(selected.fallback_warning(), None);
    }

    #[test]
    fn test_failures_do_not_abort_the_chain() {
        let selected =
            select(BackendKind::Cpu, vec![failing("a"), failing("b"), working("c")]).unwrap();
        assert_eq!(selected.name, "c");
        assert_eq!(selected.processor, "c");
        assert_eq!(selected.skipped.len(), 2);

        let warning = selected.fallback_warning().unwrap();
        assert!(warning.contains("a, b"));
        assert!(warning.contains("ran c"));
    }

    #[test]
    fn test_exhausted_chain_reports_every_failure() {
        let err = select(BackendKind::Cpu, vec![failing("a"), failing("b")]).unwrap_err();
        match err {
            WorkerError::ChainExhausted { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].candidate, "a");
                assert_eq!(failures[1].message, "b assets gone");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_selection_is_deterministic() {
        for _ in 0..3 {
            let selected =
                select(BackendKind::Cpu, vec![failing("a"), failing("b"), working("c")]).unwrap();
            assert_eq!(selected.name, "c");
        }
    }

    #[test]
    fn test_candidate_receives_resolved_backend() {
        let candidate: Candidate<BackendKind> = Candidate::new("echo", Ok);
        let selected = select(BackendKind::Cuda, vec![candidate]).unwrap();
        assert_eq!(selected.processor, BackendKind::Cuda);
    }
}
