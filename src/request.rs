//! One invocation's worth of caller input.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use stem_studio_proto::DeviceSelection;

/// Value of a named task-specific option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Present/absent toggle, e.g. `--fine`.
    Flag,
    /// Option with an argument, e.g. `--quality best`.
    Value(String),
}

/// Everything a single worker run needs from the caller. Constructed per
/// call and owned by it; nothing here is shared between invocations.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Source audio file.
    pub input: PathBuf,
    /// Destination directory, for services that write files.
    pub output_dir: Option<PathBuf>,
    /// Compute backend preference, forwarded as `--device` when not `auto`.
    pub device: DeviceSelection,
    /// Task-specific options, validated against the service's schema.
    pub options: BTreeMap<String, OptionValue>,
    /// Wall-clock budget; `None` uses the client default.
    pub timeout: Option<Duration>,
    /// Ask the worker for verbose stderr diagnostics.
    pub capture_diagnostics: bool,
}

impl InvocationRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: None,
            device: DeviceSelection::Auto,
            options: BTreeMap::new(),
            timeout: None,
            capture_diagnostics: false,
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn device(mut self, device: DeviceSelection) -> Self {
        self.device = device;
        self
    }

    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.options.insert(name.into(), OptionValue::Flag);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), OptionValue::Value(value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self) -> Self {
        self.capture_diagnostics = true;
        self
    }
}
