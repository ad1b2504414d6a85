// THEORY:
// The driver is the loop that owns a `CountingPipeline` for a whole session.
//
// 1.  **Start-up gate**: The frame source is acquired once, asynchronously.
//     If it cannot be opened, or reports a zero width or height, the user is
//     told once and the driver returns without starting a loop.
// 2.  **Cooperative cadence**: Ticks are paced by a tokio interval at the
//     display refresh rate. A tick runs to completion (rendering included)
//     before the next one is awaited, and a slow tick simply delays the next.
// 3.  **Self-healing**: Errors inside a tick never leave the pipeline. The
//     loop only ends when the reporter's surface goes away or the optional
//     tick limit is reached.

use crate::config::CounterConfig;
use crate::core_modules::status::Status;
use crate::error::CounterError;
use crate::pipeline::{CountingPipeline, FrameSource, Reporter, TickOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

/// Tick tallies for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub measured: u64,
    pub skipped: u64,
    pub faulted: u64,
}

/// Opens the source, validates it and runs the tick loop until the reporter closes.
pub async fn run<S, R, F>(config: &CounterConfig, open: F, reporter: &mut R) -> Result<RunSummary, CounterError>
where
    S: FrameSource,
    R: Reporter,
    F: Future<Output = Result<S, CounterError>>,
{
    let mut pipeline = CountingPipeline::new(config)?;

    reporter.set_status(&Status::starting_camera());
    let mut source = match open.await {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "frame source error");
            reporter.set_status(&Status::camera_error());
            return Err(match e {
                CounterError::SourceUnavailable(_) => e,
                other => CounterError::SourceUnavailable(other.to_string()),
            });
        }
    };

    let (width, height) = source.dimensions();
    info!(width, height, "video size");
    if width == 0 || height == 0 {
        reporter.set_status(&Status::video_size_error());
        return Err(CounterError::DimensionUnknown { width, height });
    }

    reporter.set_status(&Status::processing());

    let mut ticker = interval(Duration::from_millis(config.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut summary = RunSummary::default();
    loop {
        if config.max_ticks.is_some_and(|limit| summary.ticks >= limit) {
            info!(ticks = summary.ticks, "tick limit reached");
            break;
        }
        if !reporter.is_open() {
            info!(ticks = summary.ticks, "display closed");
            break;
        }

        ticker.tick().await;
        match pipeline.tick(&mut source, reporter) {
            TickOutcome::Measured(_) => summary.measured += 1,
            TickOutcome::Skipped => {
                summary.skipped += 1;
                if summary.measured == 0 && summary.skipped % 30 == 0 {
                    warn!(skipped = summary.skipped, "still waiting for the first frame");
                }
            }
            TickOutcome::Faulted(_) => summary.faulted += 1,
        }
        summary.ticks += 1;
    }

    Ok(summary)
}
