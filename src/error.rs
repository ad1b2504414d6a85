use thiserror::Error;

/// Every failure the counting pipeline can surface.
///
/// Only `SourceUnavailable` and `DimensionUnknown` stop the driver; the rest are
/// recovered at the tick boundary.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The camera could not be opened (permission denied, no device).
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source reported a zero width or height.
    #[error("video size unknown: {width}x{height}")]
    DimensionUnknown { width: u32, height: u32 },

    /// The frame buffer is not populated yet. Never shown to the user.
    #[error("frame not ready")]
    FrameNotReady,

    /// Anything unexpected inside segmentation, extraction or filtering.
    #[error("processing fault: {0}")]
    ProcessingFault(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CounterError>;
