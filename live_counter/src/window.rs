use opencv::{
    core::{self, Mat, Scalar, Vector},
    highgui, imgproc,
    prelude::*,
};
use tracing::{info, warn};
use tray_counter::{Blob, Channels, CounterError, Frame, Reporter, Status, StatusTag};

const ESC: i32 = 27;
const QUIT: i32 = 113;
/// Canvas used for status messages shown before the first frame arrives.
const IDLE_SIZE: (i32, i32) = (640, 120);

/// Shows each measured frame in a highgui window with its blob outlines and status line.
///
/// `scene` holds the last frame with its outlines; `canvas` is the scene plus
/// the current status line, so a status change can be redrawn without a frame.
pub struct HighGuiReporter {
    name: String,
    status: Option<Status>,
    rgba: Mat,
    scene: Mat,
    canvas: Mat,
}

impl HighGuiReporter {
    pub fn open(name: &str) -> opencv::Result<Self> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            name: name.to_string(),
            status: None,
            rgba: Mat::default(),
            scene: Mat::default(),
            canvas: Mat::default(),
        })
    }

    /// Redraws the status line over the current scene, or over a blank
    /// canvas when no frame has been shown yet.
    fn present(&mut self) -> opencv::Result<()> {
        if self.scene.empty() {
            let (width, height) = IDLE_SIZE;
            self.scene = Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, Scalar::all(0.0))?;
        }
        self.scene.copy_to(&mut self.canvas)?;
        self.draw_status()?;
        highgui::imshow(&self.name, &self.canvas)?;
        highgui::wait_key(1)?;
        Ok(())
    }

    fn load_frame(&mut self, frame: &Frame) -> opencv::Result<()> {
        let (rows, cols) = (frame.height() as i32, frame.width() as i32);
        let (typ, code) = match frame.channels() {
            Channels::Rgba => (core::CV_8UC4, imgproc::COLOR_RGBA2BGR),
            Channels::Rgb => (core::CV_8UC3, imgproc::COLOR_RGB2BGR),
        };
        if self.rgba.rows() != rows || self.rgba.cols() != cols || self.rgba.typ() != typ {
            self.rgba = Mat::new_rows_cols_with_default(rows, cols, typ, Scalar::all(0.0))?;
        }
        self.rgba.data_bytes_mut()?.copy_from_slice(frame.data());
        imgproc::cvt_color(&self.rgba, &mut self.scene, code, 0)
    }

    fn draw_frame(&mut self, frame: &Frame, blobs: &[Blob]) -> opencv::Result<()> {
        self.load_frame(frame)?;
        self.draw_blobs(blobs)?;
        self.present()
    }

    fn draw_blobs(&mut self, blobs: &[Blob]) -> opencv::Result<()> {
        let outlines: Vector<Vector<core::Point>> = blobs
            .iter()
            .map(|blob| blob.boundary.iter().map(|p| core::Point::new(p.x, p.y)).collect())
            .collect();
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
        imgproc::polylines(&mut self.scene, &outlines, true, green, 2, imgproc::LINE_8, 0)
    }

    fn draw_status(&mut self) -> opencv::Result<()> {
        let Some(status) = &self.status else {
            return Ok(());
        };
        imgproc::put_text(
            &mut self.canvas,
            &status.text,
            core::Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.9,
            tag_color(status.tag),
            2,
            imgproc::LINE_8,
            false,
        )
    }
}

fn status_changed(shown: Option<&Status>, next: &Status) -> bool {
    shown != Some(next)
}

/// BGR color for a status tag.
fn tag_color(tag: StatusTag) -> Scalar {
    match tag {
        StatusTag::Attention => Scalar::new(0.0, 0.0, 255.0, 0.0),
        StatusTag::Ok => Scalar::new(0.0, 255.0, 0.0, 0.0),
        StatusTag::Info => Scalar::new(255.0, 255.0, 255.0, 0.0),
    }
}

impl Reporter for HighGuiReporter {
    fn set_status(&mut self, status: &Status) {
        if !status_changed(self.status.as_ref(), status) {
            return;
        }
        info!(status = %status.text, tag = %status.tag, "status");
        self.status = Some(status.clone());
        // A faulted tick never reaches `render_frame`, so the change is shown here.
        if let Err(e) = self.present() {
            warn!(error = %e, "could not show status");
        }
    }

    fn render_frame(&mut self, frame: &Frame, blobs: &[Blob]) -> Result<(), CounterError> {
        self.draw_frame(frame, blobs)
            .map_err(|e| CounterError::ProcessingFault(e.to_string()))
    }

    fn is_open(&mut self) -> bool {
        match highgui::wait_key(1) {
            Ok(ESC) | Ok(QUIT) => return false,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "display event loop failed");
                return false;
            }
        }
        highgui::get_window_property(&self.name, highgui::WND_PROP_VISIBLE).is_ok_and(|visible| visible >= 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fault_after_a_count_is_a_status_change() {
        let count = Status::new("Count: 5", StatusTag::Info);
        assert!(status_changed(None, &count));
        assert!(!status_changed(Some(&count), &count));
        assert!(status_changed(Some(&count), &Status::processing_error()));
        assert!(status_changed(Some(&count), &Status::new("Count: 5", StatusTag::Ok)));
    }

    #[test]
    fn tags_map_to_distinct_colors() {
        assert_eq!(tag_color(StatusTag::Attention), Scalar::new(0.0, 0.0, 255.0, 0.0));
        assert_eq!(tag_color(StatusTag::Ok), Scalar::new(0.0, 255.0, 0.0, 0.0));
        assert_eq!(tag_color(StatusTag::Info), Scalar::new(255.0, 255.0, 255.0, 0.0));
    }
}
