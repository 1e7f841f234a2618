//! Argument surface shared by every worker binary.

use std::path::PathBuf;

use stem_studio_proto::DeviceSelection;
use tracing_subscriber::EnvFilter;

/// Flags common to all workers. Task-specific flags are flattened in per-bin.
#[derive(clap::Args, Debug)]
pub struct CommonArgs {
    /// Source audio file (WAV).
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Compute backend preference.
    #[arg(long, default_value = "auto", value_name = "auto|accelerated|cpu")]
    pub device: DeviceSelection,

    /// Emit diagnostic lines on standard error.
    #[arg(long)]
    pub verbose: bool,
}

/// Route all diagnostics to stderr; stdout belongs to the result document.
pub fn init_diagnostics(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
