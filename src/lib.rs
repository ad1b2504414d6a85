// THEORY:
// This file is the main entry point for the `tray_counter` library crate.
//
// The public API is the `CountingPipeline` (one explicit state struct that
// measures a frame and keeps the stability window), the `driver::run` loop that
// paces it, and the two collaborator traits, `FrameSource` and `Reporter`, that
// a host implements to plug in a camera and a display. The per-stage modules in
// `core_modules` are public so each stage can be exercised on its own.

pub mod config;
pub mod core_modules;
pub mod driver;
pub mod error;
pub mod pipeline;

pub use config::{AreaBounds, ColorRangeParams, CounterConfig, IntensityParams, MAX_HISTORY, SegmentationStrategy};
pub use core_modules::blob_extractor::Blob;
pub use core_modules::frame::{Channels, Frame};
pub use core_modules::status::{Status, StatusTag};
pub use driver::RunSummary;
pub use error::CounterError;
pub use pipeline::{CountingPipeline, FrameAnalysis, FrameSource, ReadStatus, Reporter, StabilityVerdict, TickOutcome};
