mod camera;
mod window;

use anyhow::Context;
use camera::OpenCvCamera;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tray_counter::{CounterConfig, CounterError};
use tray_counter::driver;
use window::HighGuiReporter;

/// Counts items on a tray in front of a camera and reports the settled count.
#[derive(Parser, Debug)]
#[command(name = "live_counter", version)]
struct Args {
    /// JSON counter configuration. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Index of the camera device.
    #[arg(long, default_value_t = 0)]
    camera: i32,

    /// Expected item count; a settled count equal to it is shown as OK.
    #[arg(long)]
    target: Option<u32>,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- 1. Configuration ---
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => CounterConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CounterConfig::default(),
    };
    if args.target.is_some() {
        config.target_count = args.target;
    }
    if args.max_ticks.is_some() {
        config.max_ticks = args.max_ticks;
    }
    info!(strategy = config.strategy.name(), camera = args.camera, "starting live counter");

    // --- 2. Display and camera ---
    let mut reporter = HighGuiReporter::open("live_counter").context("opening display window")?;
    let camera = args.camera;
    // Device start-up can block for a while; keep it off the runtime thread.
    let open = async move {
        tokio::task::spawn_blocking(move || OpenCvCamera::open(camera))
            .await
            .map_err(|e| CounterError::SourceUnavailable(e.to_string()))?
    };

    // --- 3. Counting loop ---
    let summary = driver::run(&config, open, &mut reporter).await?;
    info!(
        ticks = summary.ticks,
        measured = summary.measured,
        skipped = summary.skipped,
        faulted = summary.faulted,
        "session finished"
    );
    Ok(())
}
