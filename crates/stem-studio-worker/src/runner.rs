//! Top-level worker run: one document on stdout, matching exit code.
//!
//! Panics anywhere in the processing path are caught and converted into an
//! `internal` error document; a worker must never die without telling its
//! supervisor what happened in a form the supervisor can decode.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use serde::Serialize;
use stem_studio_proto::{ErrorDocument, SuccessDocument, WorkerErrorKind, EXIT_STRUCTURED_FAILURE};
use tracing::error;

use crate::error::WorkerError;

/// Run the worker body and translate its outcome into document + exit code.
pub fn run<T, F>(body: F) -> ExitCode
where
    T: Serialize,
    F: FnOnce() -> Result<SuccessDocument<T>, WorkerError>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(document)) => {
            emit(&document);
            ExitCode::SUCCESS
        }
        Ok(Err(err)) => {
            error!(kind = err.kind().as_str(), "worker run failed: {err}");
            emit(&err.to_document());
            ExitCode::from(EXIT_STRUCTURED_FAILURE)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("worker panicked: {message}");
            emit(&ErrorDocument::new(
                WorkerErrorKind::Internal,
                format!("worker panicked: {message}"),
            ));
            ExitCode::from(EXIT_STRUCTURED_FAILURE)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn emit<D: Serialize>(document: &D) {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    match serde_json::to_string(document) {
        Ok(json) => {
            let _ = writeln!(stdout, "{json}");
        }
        Err(e) => {
            // Serialization of our own types cannot realistically fail, but
            // the contract still requires a parseable line on stdout.
            let _ = writeln!(
                stdout,
                r#"{{"error":"internal","message":"result serialization failed: {e}"}}"#
            );
        }
    }
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extracts_both_string_kinds() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str panic");
        assert_eq!(panic_message(boxed.as_ref()), "static str panic");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned panic"));
        assert_eq!(panic_message(boxed.as_ref()), "owned panic");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
