// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the smallest unit of the counting system. It is a "dumb"
// data container for a single pixel plus the two single-pixel transforms the
// segmentation layer needs: a luminance value and an HSV triple. Neither reads a
// neighbor; anything spatial (blur, morphology, contours) lives in the Segmenter
// and BlobExtractor.
//
// Scales:
// - Luminance uses Rec. 601 weights on the raw 0..255 channels.
// - HSV follows the 8-bit convention camera tooling uses: hue is stored as
//   degrees / 2 (0..=179) so that it fits in a byte, saturation and value are
//   0..=255. Color-range bounds in the configuration are written in this scale.

pub mod pixel {
    pub type Channel = u8;
    pub type Luminance = f64;
    pub type Hue = f32;

    /// An 8-bit HSV triple in the byte-packed scale (H 0..=179, S/V 0..=255).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Hsv {
        pub hue: u8,
        pub saturation: u8,
        pub value: u8,
    }

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        /// Carried through untouched; no heuristic reads it.
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Self {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Builds a pixel from an interleaved slice of 3 (RGB) or 4 (RGBA) bytes.
        /// Returns `None` for any other length.
        pub fn from_channels(bytes: &[u8]) -> Option<Self> {
            match *bytes {
                [r, g, b] => Some(Self::new(r, g, b, u8::MAX)),
                [r, g, b, a] => Some(Self::new(r, g, b, a)),
                _ => None,
            }
        }

        /// Luminance estimate (Rec. 601 luma): 0.299R + 0.587G + 0.114B.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// Luminance rounded to the nearest byte, as stored in a grayscale image.
        pub fn luma_byte(&self) -> u8 {
            self.luminance().round().clamp(0.0, 255.0) as u8
        }

        /// Hue angle in degrees [0, 360). Gray pixels (zero chroma) report 0.
        pub fn hue_degrees(&self) -> Hue {
            let red = self.red as f32 / 255.0;
            let green = self.green as f32 / 255.0;
            let blue = self.blue as f32 / 255.0;

            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            if chroma <= 1e-6 {
                return 0.0;
            }

            let (base_difference, sector_offset) = if maximum_channel == red {
                (green - blue, 0.0)
            } else if maximum_channel == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// Converts to the byte-packed HSV scale.
        pub fn hsv(&self) -> Hsv {
            let maximum_channel = self.red.max(self.green.max(self.blue));
            let minimum_channel = self.red.min(self.green.min(self.blue));

            let saturation = if maximum_channel == 0 {
                0
            } else {
                let chroma = (maximum_channel - minimum_channel) as f32;
                (255.0 * chroma / maximum_channel as f32).round() as u8
            };

            // 360 degrees maps onto 180, which wraps back to red.
            let half_hue = (self.hue_degrees() / 2.0).round() as u16;
            let hue = if half_hue >= 180 { 0 } else { half_hue as u8 };

            Hsv {
                hue,
                saturation,
                value: maximum_channel,
            }
        }
    }
}
