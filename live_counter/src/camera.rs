use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tray_counter::{Channels, CounterError, Frame, FrameSource, ReadStatus};

/// A local camera read through OpenCV. Frames are handed to the pipeline as RGBA.
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
    bgr: Mat,
    rgba: Mat,
}

impl OpenCvCamera {
    pub fn open(index: i32) -> Result<Self, CounterError> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY).map_err(unavailable)?;
        if !capture.is_opened().map_err(unavailable)? {
            return Err(CounterError::SourceUnavailable(format!("camera {index} could not be opened")));
        }

        // A driver that cannot report its size yields 0 here, which the driver refuses.
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(unavailable)?.max(0.0) as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(unavailable)?.max(0.0) as u32;

        Ok(Self {
            capture,
            width,
            height,
            bgr: Mat::default(),
            rgba: Mat::default(),
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_into(&mut self, frame: &mut Frame) -> Result<ReadStatus, CounterError> {
        if !self.capture.read(&mut self.bgr).map_err(fault)? || self.bgr.empty() {
            frame.clear();
            return Ok(ReadStatus::Empty);
        }

        imgproc::cvt_color(&self.bgr, &mut self.rgba, imgproc::COLOR_BGR2RGBA, 0).map_err(fault)?;
        let width = self.rgba.cols() as u32;
        let height = self.rgba.rows() as u32;
        let bytes = self.rgba.data_bytes().map_err(fault)?;
        let data = frame.prepare(width, height, Channels::Rgba);
        if data.len() != bytes.len() {
            return Err(CounterError::ProcessingFault(format!(
                "camera produced {} bytes for a {width}x{height} frame",
                bytes.len()
            )));
        }
        data.copy_from_slice(bytes);
        Ok(ReadStatus::Ready)
    }
}

fn unavailable(e: opencv::Error) -> CounterError {
    CounterError::SourceUnavailable(e.to_string())
}

fn fault(e: opencv::Error) -> CounterError {
    CounterError::ProcessingFault(e.to_string())
}
