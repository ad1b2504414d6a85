// THEORY:
// Status policy sits on top of the stability verdict and decides what the user
// sees. It is product policy, not measurement: the optional target count only
// picks between the "ok" and "info" colorings and never feeds back into the
// count or the tracker.

use crate::core_modules::stability_tracker::StabilityVerdict;
use std::fmt;

pub const MOVE_TRAY: &str = "MOVE TRAY";
pub const STARTING_CAMERA: &str = "Starting camera...";
pub const CAMERA_ERROR: &str = "Camera error";
pub const VIDEO_SIZE_ERROR: &str = "Video size error";
pub const PROCESSING: &str = "Processing...";
pub const PROCESSING_ERROR: &str = "Processing error (see console)";

/// Color class of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    /// Scene unsettled, or an error.
    Attention,
    /// Stable and equal to the target count.
    Ok,
    /// Stable, showing the count.
    Info,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Attention => "attention",
            StatusTag::Ok => "ok",
            StatusTag::Info => "info",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub tag: StatusTag,
}

impl Status {
    pub fn new(text: impl Into<String>, tag: StatusTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }

    pub fn starting_camera() -> Self {
        Self::new(STARTING_CAMERA, StatusTag::Info)
    }

    pub fn camera_error() -> Self {
        Self::new(CAMERA_ERROR, StatusTag::Attention)
    }

    pub fn video_size_error() -> Self {
        Self::new(VIDEO_SIZE_ERROR, StatusTag::Attention)
    }

    pub fn processing() -> Self {
        Self::new(PROCESSING, StatusTag::Info)
    }

    pub fn processing_error() -> Self {
        Self::new(PROCESSING_ERROR, StatusTag::Attention)
    }
}

/// Maps verdicts to status lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPolicy {
    target_count: Option<u32>,
}

impl StatusPolicy {
    pub fn new(target_count: Option<u32>) -> Self {
        Self { target_count }
    }

    pub fn status_for(&self, verdict: &StabilityVerdict) -> Status {
        match verdict.display_value {
            Some(value) if verdict.is_stable => {
                let tag = if self.target_count == Some(value) {
                    StatusTag::Ok
                } else {
                    StatusTag::Info
                };
                Status::new(format!("Count: {value}"), tag)
            }
            _ => Status::new(MOVE_TRAY, StatusTag::Attention),
        }
    }
}
