// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the segmenter. It is a
// "dumb" data container for a single RGBA pixel plus the one single-pixel
// heuristic the trap pipeline needs: its luminance. Anything that needs another
// pixel (thresholding masks, connectivity) lives in higher modules.
//
// Luminance uses the Rec. 601 weights in integer fixed point, so conversion is
// exact and reproducible across platforms: the same photo always yields the
// same grayscale bytes. Alpha is ignored, matching how a flattened photo is
// read.

pub mod pixel {
    pub type Channel = u8;
    pub type Intensity = u8;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
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

        /// Rec. 601 luma, rounded to the nearest integer (0-255).
        pub fn luminance(&self) -> Intensity {
            let weighted = self.red as u32 * 299 + self.green as u32 * 587 + self.blue as u32 * 114;
            ((weighted + 500) / 1000) as Intensity
        }
    }

    impl From<image::Rgba<u8>> for Pixel {
        fn from(px: image::Rgba<u8>) -> Self {
            let [red, green, blue, alpha] = px.0;
            Pixel::new(red, green, blue, alpha)
        }
    }
}
