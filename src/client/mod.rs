//! The single entry point the application calls to run a worker service.
//!
//! `locate → encode → supervise → decode`, with every failure folded into
//! [`InvokeError`]. Calls are async and suspend the calling task; nothing
//! here blocks a UI-responsive thread. Invocations share no mutable state,
//! so any number may run concurrently.

pub mod codec;
pub mod locator;
pub mod supervisor;

use serde::de::DeserializeOwned;
use serde::Serialize;
use stem_studio_proto::{BeatPayload, DrumStemsPayload};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::InvokeError;
use crate::request::InvocationRequest;
use crate::services::ServiceKind;
use crate::settings::ClientSettings;

use supervisor::{Disposition, SpawnSpec};

/// Decoded outcome of a successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport<T> {
    /// Compute backend the worker resolved to.
    pub backend: String,
    /// Processing strategy that actually ran.
    pub processor: String,
    pub payload: T,
    pub warnings: Vec<String>,
    /// Bounded tail of the worker's stderr, for logging only.
    pub stderr_tail: String,
}

/// Client facade over the worker services. Cheap to clone per call site.
#[derive(Debug, Clone, Default)]
pub struct ServiceClient {
    settings: ClientSettings,
}

impl ServiceClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Where the worker binary for `kind` would be found right now, if at all.
    pub fn locate(&self, kind: ServiceKind) -> Option<std::path::PathBuf> {
        locator::locate(&kind.descriptor(&self.settings))
    }

    /// Detect tempo and beat positions in an audio file.
    pub async fn detect_beats(
        &self,
        request: InvocationRequest,
    ) -> Result<ServiceReport<BeatPayload>, InvokeError> {
        self.invoke_typed(ServiceKind::BeatDetector, request, CancellationToken::new()).await
    }

    /// Split a drum recording into component stems.
    pub async fn separate_drums(
        &self,
        request: InvocationRequest,
    ) -> Result<ServiceReport<DrumStemsPayload>, InvokeError> {
        self.invoke_typed(ServiceKind::DrumSeparator, request, CancellationToken::new()).await
    }

    /// Invoke a service, leaving the payload as raw JSON.
    pub async fn invoke(
        &self,
        kind: ServiceKind,
        request: InvocationRequest,
    ) -> Result<ServiceReport<serde_json::Value>, InvokeError> {
        self.invoke_typed(kind, request, CancellationToken::new()).await
    }

    /// Like [`invoke`](Self::invoke), cancellable through the given token.
    pub async fn invoke_with_cancel(
        &self,
        kind: ServiceKind,
        request: InvocationRequest,
        cancel: CancellationToken,
    ) -> Result<ServiceReport<serde_json::Value>, InvokeError> {
        self.invoke_typed(kind, request, cancel).await
    }

    async fn invoke_typed<T: DeserializeOwned>(
        &self,
        kind: ServiceKind,
        request: InvocationRequest,
        cancel: CancellationToken,
    ) -> Result<ServiceReport<T>, InvokeError> {
        let descriptor = kind.descriptor(&self.settings);
        let service = descriptor.name;

        // No binary, no spawn: the feature is simply not installed.
        let Some(binary) = locator::locate(&descriptor) else {
            debug!(service, "worker not installed, reporting unavailable");
            return Err(InvokeError::NotAvailable { service });
        };

        let argv = codec::encode(&descriptor, &request);
        let timeout = request.timeout.unwrap_or(self.settings.default_timeout);

        // Workers write only into their own output directory; the working
        // directory is pinned there (or to scratch space) explicitly.
        let workdir = match &request.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| InvokeError::Unknown {
                    service,
                    message: format!("cannot create output directory: {e}"),
                    stderr_tail: String::new(),
                })?;
                dir.clone()
            }
            None => std::env::temp_dir(),
        };

        info!(service, input = %request.input.display(), ?timeout, "invoking worker");
        let spec = SpawnSpec { program: binary, args: argv, workdir };
        let output = supervisor::run(
            spec,
            timeout,
            cancel,
            &self.settings.termination,
            &self.settings.capture,
        )
        .await
        .map_err(|e| spawn_error(service, &e))?;

        if output.stdout_truncated {
            warn!(service, pid = output.pid, "worker stdout exceeded the capture bound");
        }

        match output.disposition {
            Disposition::TimedOut => Err(InvokeError::Timeout {
                service,
                timeout,
                stderr_tail: output.stderr_tail,
            }),
            Disposition::Cancelled => {
                Err(InvokeError::Cancelled { service, stderr_tail: output.stderr_tail })
            }
            Disposition::Completed(status) => {
                debug!(service, pid = output.pid, elapsed = ?output.elapsed, "worker finished");
                codec::decode(&descriptor, status, &output.stdout, &output.stderr_tail)
            }
        }
    }
}

/// Spawn failures fold into the closed error set: an unusable binary means
/// the feature is unavailable, anything else is an unknown failure.
fn spawn_error(service: &'static str, err: &std::io::Error) -> InvokeError {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => {
            warn!(service, error = %err, "worker binary unusable");
            InvokeError::NotAvailable { service }
        }
        _ => InvokeError::Unknown {
            service,
            message: format!("failed to start worker: {err}"),
            stderr_tail: String::new(),
        },
    }
}
