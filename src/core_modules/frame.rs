// THEORY:
// A `Frame` is the raw color image for one tick. Like `Pixel`, it is a "dumb"
// container: an interleaved byte buffer plus the geometry needed to read it.
// The pipeline owns exactly one `Frame` for the whole session and the
// `FrameSource` overwrites it in place every tick, so the buffer is allocated
// once and only grows if the camera changes resolution.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::CounterError;

/// Number of interleaved 8-bit channels per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channels {
    Rgb,
    #[default]
    Rgba,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl Frame {
    /// An empty frame; reports `is_ready() == false` until a source fills it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps an existing buffer. The buffer length is checked when the frame is read.
    pub fn from_raw(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Resizes the frame in place and hands back the writable buffer. Capacity is
    /// kept, so repeated calls with the same geometry never reallocate.
    pub fn prepare(&mut self, width: u32, height: u32, channels: Channels) -> &mut [u8] {
        self.width = width;
        self.height = height;
        self.channels = channels;
        let len = width as usize * height as usize * channels.count();
        self.data.resize(len, 0);
        &mut self.data
    }

    /// Marks the frame as not populated without releasing its buffer.
    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.data.clear();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.data.is_empty()
    }

    /// Checks readiness and buffer geometry before any per-pixel work.
    pub fn validate(&self) -> Result<(), CounterError> {
        if !self.is_ready() {
            return Err(CounterError::FrameNotReady);
        }
        let expected = self.width as usize * self.height as usize * self.channels.count();
        if self.data.len() != expected {
            return Err(CounterError::ProcessingFault(format!(
                "frame buffer holds {} bytes, expected {} for {}x{}x{}",
                self.data.len(),
                expected,
                self.width,
                self.height,
                self.channels.count()
            )));
        }
        Ok(())
    }

    /// Iterates pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data
            .chunks_exact(self.channels.count())
            .filter_map(Pixel::from_channels)
    }
}
