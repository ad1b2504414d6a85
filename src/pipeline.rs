// THEORY:
// The `pipeline` module is the top-level API of the counting engine. It wires
// the stages into one explicit state struct, `CountingPipeline`, which owns
// every buffer and the stability window. Nothing lives in globals: a test can
// build a pipeline, hand it synthetic frames, and inspect every stage.
//
// One tick is: read a frame → segment → extract blobs → filter by area →
// update the stability window → map the verdict to a status → report. The tick
// boundary is also the error boundary. A frame that is not ready yet is skipped
// silently; any other failure, including a panic inside a measurement stage, is
// reported and logged, the tick is abandoned, and the next tick starts clean.

use crate::config::{AreaBounds, CounterConfig};
use crate::core_modules::blob_extractor::{Blob, blob_extractor};
use crate::core_modules::blob_filter;
use crate::core_modules::frame::Frame;
use crate::core_modules::segmenter::Segmenter;
use crate::core_modules::stability_tracker::{StabilityTracker, TrackerState};
use crate::core_modules::status::{Status, StatusPolicy};
use crate::error::CounterError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::stability_tracker::StabilityVerdict;
pub use crate::core_modules::status::StatusTag;

/// Result of reading from a `FrameSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The frame was overwritten with a new image.
    Ready,
    /// The source has nothing yet (camera warming up).
    Empty,
}

/// Supplies frames. Opening the source is the caller's job; the driver receives
/// an already-open source through a future.
pub trait FrameSource {
    /// Width and height in pixels; `(0, 0)` when unknown.
    fn dimensions(&self) -> (u32, u32);

    /// Overwrites `frame` in place with the next image.
    fn read_into(&mut self, frame: &mut Frame) -> Result<ReadStatus, CounterError>;
}

/// Shows status lines and frames to the user.
pub trait Reporter {
    fn set_status(&mut self, status: &Status);

    /// Draws the frame, annotated with the blobs that were counted.
    fn render_frame(&mut self, frame: &Frame, blobs: &[Blob]) -> Result<(), CounterError>;

    /// Whether the display surface is still up. The driver stops when this is false.
    fn is_open(&mut self) -> bool {
        true
    }
}

/// One frame's measurement, before any temporal smoothing.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Blobs inside the area bounds.
    pub accepted_blobs: Vec<Blob>,
    /// Every outer blob found, accepted or not.
    pub total_blobs: usize,
    pub count: u32,
}

/// The full result of one measured tick.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub measurement: Measurement,
    pub verdict: StabilityVerdict,
    pub status: Status,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// No frame available; nothing was measured or recorded.
    Skipped,
    Measured(FrameAnalysis),
    /// The tick was abandoned; the message went to the log.
    Faulted(String),
}

pub struct CountingPipeline {
    segmenter: Segmenter,
    bounds: AreaBounds,
    tracker: StabilityTracker,
    policy: StatusPolicy,
    frame: Frame,
    last_dimensions: Option<(u32, u32)>,
}

impl CountingPipeline {
    pub fn new(config: &CounterConfig) -> Result<Self, CounterError> {
        config.validate()?;
        let bounds = config.area_bounds();
        info!(
            strategy = config.strategy.name(),
            min_area = bounds.min_area,
            max_area = ?bounds.max_area,
            target = ?config.target_count,
            "counting pipeline configured"
        );
        Ok(Self {
            segmenter: Segmenter::new(config.strategy.clone()),
            bounds,
            tracker: StabilityTracker::new(),
            policy: StatusPolicy::new(config.target_count),
            frame: Frame::empty(),
            last_dimensions: None,
        })
    }

    /// Segments, extracts and filters one frame. Does not touch the stability window.
    pub fn measure(&mut self, frame: &Frame) -> Result<Measurement, CounterError> {
        let mask = self.segmenter.segment(frame)?;
        let blobs = blob_extractor::extract(mask);
        let count = blob_filter::count(&blobs, &self.bounds);
        let accepted_blobs: Vec<Blob> = blob_filter::accepted(&blobs, &self.bounds).cloned().collect();

        Ok(Measurement {
            accepted_blobs,
            total_blobs: blobs.len(),
            count,
        })
    }

    /// Measures one frame and feeds the count into the stability window.
    pub fn analyze(&mut self, frame: &Frame) -> Result<FrameAnalysis, CounterError> {
        let measurement = self.measure(frame)?;
        self.track_dimensions(frame.width(), frame.height());

        let previous_state = self.tracker.state();
        let verdict = self.tracker.update(measurement.count);
        let status = self.policy.status_for(&verdict);

        debug!(
            count = measurement.count,
            total_blobs = measurement.total_blobs,
            std_dev = ?verdict.std_dev,
            stable = verdict.is_stable,
            "frame measured"
        );
        match (previous_state, self.tracker.state()) {
            (TrackerState::Unstable, TrackerState::Stable) => {
                info!(value = ?verdict.display_value, "count stabilized");
            }
            (TrackerState::Stable, TrackerState::Unstable) => {
                info!(std_dev = ?verdict.std_dev, "count unsettled");
            }
            _ => {}
        }

        Ok(FrameAnalysis {
            measurement,
            verdict,
            status,
        })
    }

    /// Runs one full tick against a source and a reporter. Never panics and never
    /// returns an error: failures become `TickOutcome::Faulted`.
    pub fn tick<S: FrameSource, R: Reporter>(&mut self, source: &mut S, reporter: &mut R) -> TickOutcome {
        // Take the frame out so `analyze` can borrow `self` mutably; the buffer
        // goes back afterwards whatever happens.
        let mut frame = std::mem::take(&mut self.frame);
        let outcome = self.tick_with(&mut frame, source, reporter);
        self.frame = frame;
        outcome
    }

    fn tick_with<S: FrameSource, R: Reporter>(
        &mut self,
        frame: &mut Frame,
        source: &mut S,
        reporter: &mut R,
    ) -> TickOutcome {
        match source.read_into(frame) {
            Ok(ReadStatus::Ready) => {}
            Ok(ReadStatus::Empty) | Err(CounterError::FrameNotReady) => {
                debug!("frame not ready, skipping tick");
                return TickOutcome::Skipped;
            }
            Err(e) => return Self::fault(reporter, e.to_string()),
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.analyze(frame)));
        match result {
            Ok(Ok(analysis)) => {
                reporter.set_status(&analysis.status);
                if let Err(e) = reporter.render_frame(frame, &analysis.measurement.accepted_blobs) {
                    return Self::fault(reporter, e.to_string());
                }
                TickOutcome::Measured(analysis)
            }
            Ok(Err(CounterError::FrameNotReady)) => {
                debug!("frame not ready, skipping tick");
                TickOutcome::Skipped
            }
            Ok(Err(e)) => Self::fault(reporter, e.to_string()),
            Err(payload) => Self::fault(reporter, panic_message(payload)),
        }
    }

    fn fault<R: Reporter>(reporter: &mut R, detail: String) -> TickOutcome {
        error!(detail = %detail, "processing exception");
        reporter.set_status(&Status::processing_error());
        TickOutcome::Faulted(detail)
    }

    fn track_dimensions(&mut self, width: u32, height: u32) {
        let dimensions = (width, height);
        if let Some(previous) = self.last_dimensions {
            if previous != dimensions {
                info!(?previous, current = ?dimensions, "frame size changed, resetting stability window");
                self.tracker.reset();
            }
        }
        self.last_dimensions = Some(dimensions);
    }

    pub fn tracker(&self) -> &StabilityTracker {
        &self.tracker
    }

    pub fn bounds(&self) -> &AreaBounds {
        &self.bounds
    }

    /// The frame buffer as filled by the last tick.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorRangeParams, SegmentationStrategy};
    use crate::core_modules::frame::Channels;
    use crate::config::MAX_HISTORY;

    const W: u32 = 64;
    const H: u32 = 48;

    /// Dark RGBA frame with `n` bright 8x8 squares laid out on a grid.
    fn frame_with_items(n: u32) -> Frame {
        let mut data = vec![0u8; (W * H * 4) as usize];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[25, 30, 28, 255]);
        }
        for i in 0..n {
            let x0 = 2 + (i % 5) * 12;
            let y0 = 2 + (i / 5) * 12;
            for y in y0..y0 + 8 {
                for x in x0..x0 + 8 {
                    let idx = ((y * W + x) * 4) as usize;
                    data[idx..idx + 4].copy_from_slice(&[230, 225, 210, 255]);
                }
            }
        }
        Frame::from_raw(W, H, Channels::Rgba, data)
    }

    fn small_item_config() -> CounterConfig {
        CounterConfig {
            area: Some(AreaBounds {
                min_area: 20.0,
                max_area: Some(400.0),
            }),
            ..CounterConfig::default()
        }
    }

    #[test]
    fn measure_counts_items_in_bounds() {
        let mut pipeline = CountingPipeline::new(&small_item_config()).expect("valid config");
        let measurement = pipeline.measure(&frame_with_items(7)).expect("measured");

        assert_eq!(measurement.count, 7);
        assert_eq!(measurement.total_blobs, 7);
        assert!(measurement.accepted_blobs.iter().all(|b| b.area == 49.0));
        assert!(pipeline.tracker().is_empty());
    }

    #[test]
    fn measure_rejects_small_blobs_with_default_bounds() {
        // 8x8 squares have polygon area 49, well under the intensity default of 200.
        let mut pipeline = CountingPipeline::new(&CounterConfig::default()).expect("valid config");
        let measurement = pipeline.measure(&frame_with_items(4)).expect("measured");
        assert_eq!(measurement.total_blobs, 4);
        assert_eq!(measurement.count, 0);
    }

    #[test]
    fn analyze_stabilizes_after_a_full_window() {
        let mut pipeline = CountingPipeline::new(&small_item_config()).expect("valid config");
        let frame = frame_with_items(5);

        for _ in 0..MAX_HISTORY - 1 {
            let analysis = pipeline.analyze(&frame).expect("analyzed");
            assert_eq!(analysis.status.text, "MOVE TRAY");
        }
        let analysis = pipeline.analyze(&frame).expect("analyzed");
        assert_eq!(analysis.verdict.display_value, Some(5));
        assert_eq!(analysis.status, Status::new("Count: 5", StatusTag::Info));
    }

    #[test]
    fn not_ready_frame_is_not_recorded() {
        let mut pipeline = CountingPipeline::new(&small_item_config()).expect("valid config");
        assert!(matches!(pipeline.analyze(&Frame::empty()), Err(CounterError::FrameNotReady)));
        assert!(pipeline.tracker().is_empty());
    }

    #[test]
    fn resolution_change_resets_the_window() {
        let mut pipeline = CountingPipeline::new(&small_item_config()).expect("valid config");
        for _ in 0..MAX_HISTORY {
            pipeline.analyze(&frame_with_items(3)).expect("analyzed");
        }
        assert_eq!(pipeline.tracker().state(), TrackerState::Stable);

        let smaller = Frame::from_raw(16, 16, Channels::Rgb, vec![0; 16 * 16 * 3]);
        pipeline.analyze(&smaller).expect("analyzed");
        assert_eq!(pipeline.tracker().len(), 1);
        assert_eq!(pipeline.tracker().state(), TrackerState::Unstable);
    }

    #[test]
    fn bounds_fall_back_to_the_strategy_defaults() {
        let pipeline = CountingPipeline::new(&CounterConfig::default()).expect("valid config");
        assert_eq!(*pipeline.bounds(), AreaBounds { min_area: 200.0, max_area: None });

        let pipeline = CountingPipeline::new(&small_item_config()).expect("valid config");
        assert_eq!(pipeline.bounds().max_area, Some(400.0));
    }

    struct OneShot(u32);

    impl FrameSource for OneShot {
        fn dimensions(&self) -> (u32, u32) {
            (W, H)
        }

        fn read_into(&mut self, frame: &mut Frame) -> Result<ReadStatus, CounterError> {
            *frame = frame_with_items(self.0);
            Ok(ReadStatus::Ready)
        }
    }

    #[derive(Default)]
    struct Silent(Vec<Status>);

    impl Reporter for Silent {
        fn set_status(&mut self, status: &Status) {
            self.0.push(status.clone());
        }

        fn render_frame(&mut self, _frame: &Frame, _blobs: &[Blob]) -> Result<(), CounterError> {
            Ok(())
        }
    }

    #[test]
    fn tick_keeps_the_last_frame() {
        let mut pipeline = CountingPipeline::new(&small_item_config()).expect("valid config");
        assert!(!pipeline.frame().is_ready());

        let mut reporter = Silent::default();
        let outcome = pipeline.tick(&mut OneShot(6), &mut reporter);

        assert!(matches!(outcome, TickOutcome::Measured(ref a) if a.measurement.count == 6));
        assert_eq!((pipeline.frame().width(), pipeline.frame().height()), (W, H));
        assert_eq!(reporter.0, vec![Status::new("MOVE TRAY", StatusTag::Attention)]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CounterConfig {
            strategy: SegmentationStrategy::ColorRange(ColorRangeParams {
                lower: [50, 0, 0],
                upper: [10, 255, 255],
                open: false,
            }),
            ..CounterConfig::default()
        };
        assert!(matches!(CountingPipeline::new(&config), Err(CounterError::Config(_))));
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "panic: boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "panic: bang");
        assert_eq!(panic_message(Box::new(3_u8)), "panic with non-string payload");
    }
}
