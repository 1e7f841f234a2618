//! Drum-component separation worker.
//!
//! Splits a drum recording into kick/snare/toms/cymbals stems, writing one
//! WAV per stem into `--output-dir`. Prints exactly one JSON document on
//! stdout and exits 0 (success document) or 1 (error document).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use stem_studio_proto::SuccessDocument;
use stem_studio_worker::audio::AudioClip;
use stem_studio_worker::cli::{self, CommonArgs};
use stem_studio_worker::drum::{self, DrumOptions, Quality};
use stem_studio_worker::{device, fallback, runner};

#[derive(Parser, Debug)]
#[command(name = "drum-separator", about = "StemStudio drum-component separation worker", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Destination directory for the stem files.
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: PathBuf,

    /// Processing quality.
    #[arg(long, default_value = "best", value_name = "fast|best")]
    quality: Quality,
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_diagnostics(args.common.verbose);

    runner::run(move || {
        let backend = device::resolve(args.common.device);
        let clip = AudioClip::load_wav(&args.common.input)?;
        let selected = fallback::select(backend, drum::candidates())?;
        let payload = selected.processor.separate(
            &clip,
            &args.output_dir,
            &DrumOptions { quality: args.quality },
        )?;
        Ok(SuccessDocument::new(backend.name(), selected.name, payload)
            .with_warnings(selected.warnings()))
    })
}
