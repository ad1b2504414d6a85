#![allow(dead_code)]

use std::collections::VecDeque;
use tray_counter::{Blob, Channels, CounterError, Frame, FrameSource, ReadStatus, Reporter, Status};

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 96;
/// Side of one painted item. Its polygon area is 15 * 15 = 225, above the default 200.
pub const ITEM_SIDE: u32 = 16;

/// What the scripted camera produces on one read.
#[derive(Debug, Clone, Copy)]
pub enum Shot {
    /// A tray with this many bright items.
    Items(u32),
    /// Camera still warming up.
    Empty,
    /// A buffer that disagrees with its own geometry.
    Corrupt,
    /// The read itself fails.
    ReadError,
}

/// A camera that replays a fixed script, then keeps repeating its last shot.
pub struct ScriptedSource {
    shots: VecDeque<Shot>,
    last: Shot,
    dimensions: (u32, u32),
}

impl ScriptedSource {
    pub fn new(shots: impl IntoIterator<Item = Shot>) -> Self {
        Self {
            shots: shots.into_iter().collect(),
            last: Shot::Empty,
            dimensions: (WIDTH, HEIGHT),
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = (width, height);
        self
    }

    pub fn counts(counts: &[u32]) -> Self {
        Self::new(counts.iter().map(|&n| Shot::Items(n)))
    }
}

impl FrameSource for ScriptedSource {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn read_into(&mut self, frame: &mut Frame) -> Result<ReadStatus, CounterError> {
        let shot = self.shots.pop_front().unwrap_or(self.last);
        self.last = shot;
        match shot {
            Shot::Items(n) => {
                paint_tray(frame, n);
                Ok(ReadStatus::Ready)
            }
            Shot::Empty => {
                frame.clear();
                Ok(ReadStatus::Empty)
            }
            Shot::Corrupt => {
                *frame = Frame::from_raw(WIDTH, HEIGHT, Channels::Rgba, vec![0; 10]);
                Ok(ReadStatus::Ready)
            }
            Shot::ReadError => Err(CounterError::ProcessingFault("device read failed".into())),
        }
    }
}

/// Paints `n` items on a dark tray, six to a row.
pub fn paint_tray(frame: &mut Frame, n: u32) {
    assert!(n <= 18, "the test tray holds at most 18 items");
    let data = frame.prepare(WIDTH, HEIGHT, Channels::Rgba);
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&[30, 28, 35, 255]);
    }
    for i in 0..n {
        let x0 = 2 + (i % 6) * 20;
        let y0 = 2 + (i / 6) * 30;
        for y in y0..y0 + ITEM_SIDE {
            for x in x0..x0 + ITEM_SIDE {
                let idx = ((y * WIDTH + x) * 4) as usize;
                data[idx..idx + 4].copy_from_slice(&[235, 220, 200, 255]);
            }
        }
    }
}

pub fn tray_frame(n: u32) -> Frame {
    let mut frame = Frame::empty();
    paint_tray(&mut frame, n);
    frame
}

/// Records everything shown to the user.
#[derive(Default)]
pub struct RecordingReporter {
    pub statuses: Vec<Status>,
    pub rendered_blob_counts: Vec<usize>,
    /// Close the surface after this many `is_open` checks.
    pub open_checks_left: Option<usize>,
    pub fail_renders: bool,
}

impl RecordingReporter {
    pub fn closing_after(checks: usize) -> Self {
        Self {
            open_checks_left: Some(checks),
            ..Self::default()
        }
    }

    pub fn status_texts(&self) -> Vec<&str> {
        self.statuses.iter().map(|s| s.text.as_str()).collect()
    }
}

impl Reporter for RecordingReporter {
    fn set_status(&mut self, status: &Status) {
        self.statuses.push(status.clone());
    }

    fn render_frame(&mut self, frame: &Frame, blobs: &[Blob]) -> Result<(), CounterError> {
        assert!(frame.is_ready());
        if self.fail_renders {
            return Err(CounterError::ProcessingFault("display lost".into()));
        }
        self.rendered_blob_counts.push(blobs.len());
        Ok(())
    }

    fn is_open(&mut self) -> bool {
        match self.open_checks_left.as_mut() {
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
            None => true,
        }
    }
}
