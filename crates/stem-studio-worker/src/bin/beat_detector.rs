//! Beat and tempo detection worker.
//!
//! Invoked by the application as a short-lived subprocess. Prints exactly one
//! JSON document on stdout and exits 0 (success document) or 1 (error
//! document); anything on stderr is diagnostics only.

use std::process::ExitCode;

use clap::Parser;
use stem_studio_proto::SuccessDocument;
use stem_studio_worker::audio::AudioClip;
use stem_studio_worker::beat::{self, BeatOptions};
use stem_studio_worker::cli::{self, CommonArgs};
use stem_studio_worker::{device, fallback, runner};

#[derive(Parser, Debug)]
#[command(name = "beat-detector", about = "StemStudio beat/tempo detection worker", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Use a finer onset grid (slower, more precise beat timing).
    #[arg(long)]
    fine: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_diagnostics(args.common.verbose);

    runner::run(move || {
        let backend = device::resolve(args.common.device);
        let clip = AudioClip::load_wav(&args.common.input)?;
        let selected = fallback::select(backend, beat::candidates())?;
        let payload = selected.processor.track(&clip, &BeatOptions { fine: args.fine })?;
        Ok(SuccessDocument::new(backend.name(), selected.name, payload)
            .with_warnings(selected.warnings()))
    })
}
