//! Request → argument vector, and raw worker output → typed outcome.
//!
//! Encoding failures are programming errors (the schemas are static) and
//! fail fast. Decoding never panics: every shape a worker can produce maps
//! onto the closed failure set.

use std::ffi::OsString;
use std::process::ExitStatus;

use serde::de::DeserializeOwned;
use stem_studio_proto::{DeviceSelection, ErrorDocument, SuccessDocument};

use crate::client::ServiceReport;
use crate::error::InvokeError;
use crate::request::{InvocationRequest, OptionValue};
use crate::services::ServiceDescriptor;

/// Longest snippet of unparseable worker output quoted in an error message.
const SNIPPET_MAX_CHARS: usize = 2048;

/// Build the argument vector for one invocation.
///
/// Panics when the request violates the service's argument schema; the
/// schemas are static, so that is a bug at the call site, not a runtime
/// condition.
pub fn encode(descriptor: &ServiceDescriptor, request: &InvocationRequest) -> Vec<OsString> {
    let mut argv: Vec<OsString> = Vec::new();
    argv.push("--input".into());
    argv.push(request.input.clone().into_os_string());

    if descriptor.args.output_dir_required {
        let dir = request
            .output_dir
            .as_ref()
            .unwrap_or_else(|| panic!("`{}` requires an output directory", descriptor.name));
        argv.push("--output-dir".into());
        argv.push(dir.clone().into_os_string());
    } else {
        assert!(
            request.output_dir.is_none(),
            "`{}` does not accept an output directory",
            descriptor.name
        );
    }

    if request.device != DeviceSelection::Auto {
        argv.push("--device".into());
        argv.push(request.device.as_str().into());
    }

    for (name, value) in &request.options {
        let spec = descriptor
            .args
            .option(name)
            .unwrap_or_else(|| panic!("`{}` does not accept option `--{name}`", descriptor.name));
        argv.push(format!("--{name}").into());
        match value {
            OptionValue::Flag => {
                assert!(!spec.takes_value, "option `--{name}` requires a value");
            }
            OptionValue::Value(v) => {
                assert!(spec.takes_value, "option `--{name}` does not take a value");
                argv.push(v.clone().into());
            }
        }
    }

    if request.capture_diagnostics {
        argv.push("--verbose".into());
    }

    argv
}

/// Interpret the exit status and captured stdout of a finished worker.
pub fn decode<T: DeserializeOwned>(
    descriptor: &ServiceDescriptor,
    status: ExitStatus,
    stdout: &[u8],
    stderr_tail: &str,
) -> Result<ServiceReport<T>, InvokeError> {
    let service = descriptor.name;
    let stderr_tail = stderr_tail.to_string();

    if status.success() {
        return match SuccessDocument::<T>::from_bytes(stdout) {
            Ok(doc) if doc.version > descriptor.payload_version => Err(InvokeError::Protocol {
                service,
                message: format!(
                    "document version {} is newer than the supported {}",
                    doc.version, descriptor.payload_version
                ),
                stderr_tail,
            }),
            Ok(doc) => Ok(ServiceReport {
                backend: doc.backend,
                processor: doc.processor,
                payload: doc.payload,
                warnings: doc.warnings,
                stderr_tail,
            }),
            Err(e) => Err(InvokeError::Protocol {
                service,
                message: format!("exit code 0 with undecodable output: {e}"),
                stderr_tail,
            }),
        };
    }

    match status.code() {
        Some(1) => match ErrorDocument::from_bytes(stdout) {
            Ok(doc) => Err(InvokeError::Processing {
                service,
                kind: doc.error,
                message: doc.message,
                details: doc.details,
                stderr_tail,
            }),
            // Valid JSON that is not an error document is a broken contract;
            // anything else is noise we cannot interpret at all.
            Err(_) if serde_json::from_slice::<serde_json::Value>(stdout).is_ok() => {
                Err(InvokeError::Protocol {
                    service,
                    message: "exit code 1 with a document not matching the error schema"
                        .to_string(),
                    stderr_tail,
                })
            }
            Err(_) => Err(InvokeError::Unknown {
                service,
                message: format!("exit code 1 with unparseable output: {}", snippet(stdout)),
                stderr_tail,
            }),
        },
        Some(code) => Err(InvokeError::Unknown {
            service,
            message: format!("exit code {code}: {}", snippet(stdout)),
            stderr_tail,
        }),
        None => Err(InvokeError::Unknown {
            service,
            message: "terminated by signal before producing a result".to_string(),
            stderr_tail,
        }),
    }
}

fn snippet(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).chars().take(SNIPPET_MAX_CHARS).collect()
}
