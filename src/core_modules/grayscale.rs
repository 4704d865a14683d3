// THEORY:
// The grayscale grid and the binary mask are the two raster layers between the
// decoded photo and the blob labeler.
//
// 1.  **GrayscaleGrid**: one intensity byte per pixel, row-major. Built once
//     from the (already resized) image and never mutated afterwards.
// 2.  **BinaryMask**: a same-sized grid of "dark" flags. A pixel is dark iff its
//     intensity is strictly below the threshold. Because the comparison is
//     strict and monotone, raising the threshold can only add dark pixels,
//     never remove them.
//
// Both are stateless value types; nothing here knows about blobs.

use crate::core_modules::labeler::labeler::BinaryGrid;
use crate::core_modules::pixel::pixel::{Intensity, Pixel};
use image::DynamicImage;

/// Row-major, byte-per-pixel intensity raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleGrid {
    width: u32,
    height: u32,
    intensities: Vec<Intensity>,
}

impl GrayscaleGrid {
    /// Returns `None` when `intensities` does not hold exactly `width * height` bytes.
    pub fn new(width: u32, height: u32, intensities: Vec<Intensity>) -> Option<Self> {
        if intensities.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            intensities,
        })
    }

    /// Converts every pixel with Rec. 601 luminance.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let intensities = rgba
            .pixels()
            .map(|px| Pixel::from(*px).luminance())
            .collect();
        Self {
            width,
            height,
            intensities,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.intensities.len()
    }

    pub fn intensity(&self, x: u32, y: u32) -> Intensity {
        self.intensities[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn intensities(&self) -> &[Intensity] {
        &self.intensities
    }

    /// Marks every pixel strictly darker than `threshold`.
    pub fn binarize(&self, threshold: Intensity) -> BinaryMask {
        let dark: Vec<bool> = self.intensities.iter().map(|&v| v < threshold).collect();
        let dark_count = dark.iter().filter(|&&d| d).count();
        BinaryMask {
            width: self.width,
            height: self.height,
            dark,
            dark_count,
        }
    }
}

/// Dark-pixel flags with the same dimensions as the grid they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    dark: Vec<bool>,
    dark_count: usize,
}

impl BinaryMask {
    /// Builds a mask directly from flags; `None` on a length mismatch.
    pub fn from_flags(width: u32, height: u32, dark: Vec<bool>) -> Option<Self> {
        if dark.len() != width as usize * height as usize {
            return None;
        }
        let dark_count = dark.iter().filter(|&&d| d).count();
        Some(Self {
            width,
            height,
            dark,
            dark_count,
        })
    }

    pub fn dark_count(&self) -> usize {
        self.dark_count
    }

    /// Fraction of dark pixels in [0, 1]; an empty mask reports 0.
    pub fn dark_ratio(&self) -> f64 {
        if self.dark.is_empty() {
            return 0.0;
        }
        self.dark_count as f64 / self.dark.len() as f64
    }

    pub fn flags(&self) -> &[bool] {
        &self.dark
    }
}

impl BinaryGrid for BinaryMask {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_set(&self, x: u32, y: u32) -> bool {
        self.dark[(y as usize) * (self.width as usize) + x as usize]
    }
}
