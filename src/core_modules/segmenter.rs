// THEORY:
// The `Segmenter` is the first spatial stage of the counting pipeline. It turns
// one raw color `Frame` into a binary `Mask` in which every item pixel is
// foreground (255) and everything else is background (0).
//
// Key architectural principles:
// 1.  **One pipeline, two lenses**: The strategy is a tagged enum chosen at
//     configuration time. Intensity thresholding works when items differ from
//     the tray in brightness; the HSV box works when they differ in color. All
//     later stages are identical for both.
// 2.  **No hand-tuned brightness cutoff**: The intensity lens binarizes with
//     Otsu's level, recomputed every frame, so the same configuration survives
//     changes in room lighting.
// 3.  **Buffer ownership**: The luminance image and the mask are owned by the
//     `Segmenter` and overwritten in place each tick. They are only reallocated
//     when the frame geometry changes. The optional blur is the exception:
//     `imageproc` filters always return a fresh image.
// 4.  **Determinism**: No randomness and no state leaks between frames apart
//     from the reused buffers, which are fully overwritten. The same frame and
//     parameters always give a bit-identical mask.

use crate::config::{ColorRangeParams, IntensityParams, SegmentationStrategy};
use crate::core_modules::frame::Frame;
use crate::error::CounterError;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::open_mut;
use tracing::trace;

/// Single-channel foreground/background image with the frame's dimensions.
pub type Mask = GrayImage;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Radius of the opening neighborhood under the L-infinity norm (a 3x3 square).
const OPENING_RADIUS: u8 = 1;

pub struct Segmenter {
    strategy: SegmentationStrategy,
    gray: GrayImage,
    mask: Mask,
}

impl Segmenter {
    pub fn new(strategy: SegmentationStrategy) -> Self {
        Self {
            strategy,
            gray: GrayImage::new(0, 0),
            mask: Mask::new(0, 0),
        }
    }

    pub fn strategy(&self) -> &SegmentationStrategy {
        &self.strategy
    }

    /// Segments `frame` into the internal mask and returns a view of it.
    ///
    /// Fails with `FrameNotReady` when the frame has no pixels yet, and with
    /// `ProcessingFault` when its buffer disagrees with its geometry.
    pub fn segment(&mut self, frame: &Frame) -> Result<&Mask, CounterError> {
        frame.validate()?;
        self.ensure_dimensions(frame.width(), frame.height());

        let Self {
            strategy,
            gray,
            mask,
        } = self;

        match strategy {
            SegmentationStrategy::Intensity(params) => threshold_intensity(params, frame, gray, mask),
            SegmentationStrategy::ColorRange(params) => mask_color_range(params, frame, mask),
        }

        Ok(&self.mask)
    }

    /// The mask produced by the last successful `segment` call.
    pub fn last_mask(&self) -> &Mask {
        &self.mask
    }

    fn ensure_dimensions(&mut self, width: u32, height: u32) {
        if self.mask.dimensions() != (width, height) {
            trace!(width, height, "reallocating segmentation buffers");
            self.gray = GrayImage::new(width, height);
            self.mask = Mask::new(width, height);
        }
    }
}

fn threshold_intensity(params: &IntensityParams, frame: &Frame, gray: &mut GrayImage, mask: &mut Mask) {
    for (dst, pixel) in gray.pixels_mut().zip(frame.pixels()) {
        *dst = Luma([pixel.luma_byte()]);
    }

    let blurred;
    let source: &GrayImage = match params.blur_sigma {
        Some(sigma) => {
            blurred = gaussian_blur_f32(gray, sigma);
            &blurred
        }
        None => &*gray,
    };

    let level = otsu_level(source);
    trace!(level, invert = params.invert, "otsu level");

    for (dst, src) in mask.pixels_mut().zip(source.pixels()) {
        let foreground = if params.invert {
            src[0] <= level
        } else {
            src[0] > level
        };
        *dst = Luma([if foreground { FOREGROUND } else { BACKGROUND }]);
    }

    if params.open {
        open_mut(mask, Norm::LInf, OPENING_RADIUS);
    }
}

fn mask_color_range(params: &ColorRangeParams, frame: &Frame, mask: &mut Mask) {
    let [hue_low, saturation_low, value_low] = params.lower;
    let [hue_high, saturation_high, value_high] = params.upper;

    for (dst, pixel) in mask.pixels_mut().zip(frame.pixels()) {
        let hsv = pixel.hsv();
        let inside = (hue_low..=hue_high).contains(&hsv.hue)
            && (saturation_low..=saturation_high).contains(&hsv.saturation)
            && (value_low..=value_high).contains(&hsv.value);
        *dst = Luma([if inside { FOREGROUND } else { BACKGROUND }]);
    }

    if params.open {
        open_mut(mask, Norm::LInf, OPENING_RADIUS);
    }
}
