//! Command-line harness over the service client.
//!
//! Drives the same code path the desktop application uses, printing the
//! decoded report as JSON. Handy for checking an installation and for
//! exercising workers without the UI.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stem_studio::proto::DeviceSelection;
use stem_studio::{ClientSettings, InvocationRequest, ServiceClient, ServiceKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stem_studio_cli", about = "StemStudio worker service harness", version)]
struct Cli {
    /// Seconds before a worker run is terminated.
    #[arg(long, global = true, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Extra directory to search for worker binaries.
    #[arg(long, global = true, value_name = "DIR")]
    worker_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect tempo and beat positions in an audio file.
    Beats {
        input: PathBuf,
        /// Compute backend preference.
        #[arg(long, default_value = "auto")]
        device: DeviceSelection,
        /// Use a finer onset grid.
        #[arg(long)]
        fine: bool,
    },
    /// Split a drum recording into component stems.
    Drums {
        input: PathBuf,
        /// Destination directory for the stem files.
        #[arg(long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,
        /// Compute backend preference.
        #[arg(long, default_value = "auto")]
        device: DeviceSelection,
        /// Processing quality (fast|best).
        #[arg(long)]
        quality: Option<String>,
    },
    /// Show where a worker binary is installed, if anywhere.
    Locate {
        service: ServiceKind,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ClientSettings { worker_dir: cli.worker_dir.clone(), ..Default::default() };
    let client = ServiceClient::new(settings);

    let timeout_secs = cli.timeout_secs;
    let apply_timeout = move |mut request: InvocationRequest| {
        if let Some(secs) = timeout_secs {
            request = request.timeout(Duration::from_secs(secs));
        }
        request
    };

    match cli.command {
        Command::Beats { input, device, fine } => {
            let mut request = InvocationRequest::new(input).device(device);
            if fine {
                request = request.flag("fine");
            }
            let report = client
                .detect_beats(apply_timeout(request))
                .await
                .context("beat detection failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Drums { input, output_dir, device, quality } => {
            let mut request = InvocationRequest::new(input).output_dir(output_dir).device(device);
            if let Some(quality) = quality {
                request = request.option("quality", quality);
            }
            let report = client
                .separate_drums(apply_timeout(request))
                .await
                .context("drum separation failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Locate { service } => match client.locate(service) {
            Some(path) => println!("{}", path.display()),
            None => {
                println!("{service}: not installed");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
