// THEORY:
// The `Segmenter` turns one raw trap photograph into an `AnalysisResult`: the
// share of dark pixels and the number of dark blobs large enough to plausibly
// be an insect.
//
// Stages, in order:
// 1.  **Decode**: bytes -> `DynamicImage`. An unreadable image is a hard
//     `DecodeError`; there is no partial result.
// 2.  **Fit-inside resize**: if the longer side exceeds the target dimension,
//     scale down so it equals the target while keeping the aspect ratio.
//     Smaller images are never upscaled.
// 3.  **Grayscale**: Rec. 601 luminance per pixel (`GrayscaleGrid`).
// 4.  **Binarize**: dark iff intensity < threshold (`BinaryMask`).
// 5.  **Label**: 4-connected components via the iterative labeler; regions
//     below the minimum size are dropped as noise.
// 6.  **Report**: blob count over *all* accepted regions, plus the sizes of the
//     first N accepted regions in raster order. Truncating the size list only
//     bounds the payload; it never changes the count.
//
// Everything here is single-threaded and free of randomness, so the same bytes
// and config always produce the same result.

use crate::config::SegmenterConfig;
use crate::core_modules::grayscale::{BinaryMask, GrayscaleGrid};
use crate::core_modules::labeler::labeler::{self, BinaryGrid};
use crate::error::DecodeError;
use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Output of one segmentation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Dimensions after the fit-inside resize.
    pub width: u32,
    pub height: u32,
    pub dark_pixel_ratio: f64,
    /// Accepted blobs; the estimated pest count.
    pub blob_count: usize,
    /// Sizes of the first accepted blobs in raster order.
    pub blob_sizes: Vec<usize>,
}

/// Stateless image-to-blob-count extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Decodes encoded image bytes (PNG, JPEG, ...) and segments them.
    pub fn segment_bytes(&self, bytes: &[u8]) -> Result<AnalysisResult, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        self.segment(&image)
    }

    /// Reads and segments an image file.
    pub fn segment_path<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisResult, DecodeError> {
        let bytes = std::fs::read(path)?;
        self.segment_bytes(&bytes)
    }

    /// Segments an already decoded image.
    pub fn segment(&self, image: &DynamicImage) -> Result<AnalysisResult, DecodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Empty {
                width: image.width(),
                height: image.height(),
            });
        }

        let resized = fit_inside(image, self.config.target_dimension);
        let grid = GrayscaleGrid::from_image(&resized);
        let mask = grid.binarize(self.config.dark_threshold);
        let result = self.analyze_mask(&mask);

        debug!(
            original_width = image.width(),
            original_height = image.height(),
            width = result.width,
            height = result.height,
            dark_pixel_ratio = result.dark_pixel_ratio,
            blob_count = result.blob_count,
            "segmented trap image"
        );
        Ok(result)
    }

    /// Runs the labeling and reporting stages on a prepared mask.
    pub fn analyze_mask(&self, mask: &BinaryMask) -> AnalysisResult {
        let accepted: Vec<usize> = labeler::find_components(mask)
            .into_iter()
            .map(|blob| blob.size)
            .filter(|&size| size >= self.config.min_blob_size)
            .collect();

        AnalysisResult {
            width: mask.width(),
            height: mask.height(),
            dark_pixel_ratio: mask.dark_ratio(),
            blob_count: accepted.len(),
            blob_sizes: accepted
                .into_iter()
                .take(self.config.max_reported_blobs)
                .collect(),
        }
    }
}

/// Dimensions with the longer side scaled down to `target`, or unchanged when
/// the image already fits.
pub fn fit_inside_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let longer = width.max(height);
    if target == 0 || longer <= target {
        return (width, height);
    }

    let scale = target as f64 / longer as f64;
    let scaled = |side: u32| -> u32 {
        if side == longer {
            target
        } else {
            ((side as f64 * scale).round() as u32).clamp(1, target)
        }
    };
    (scaled(width), scaled(height))
}

fn fit_inside(image: &DynamicImage, target: u32) -> DynamicImage {
    let (width, height) = fit_inside_dimensions(image.width(), image.height(), target);
    if (width, height) == (image.width(), image.height()) {
        return image.clone();
    }
    image.resize_exact(width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    /// White canvas with dark squares of the given side at the given corners.
    fn trap_image(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([230]));
        for &(x0, y0, side) in squares {
            for y in y0..y0 + side {
                for x in x0..x0 + side {
                    img.put_pixel(x, y, Luma([20]));
                }
            }
        }
        img
    }

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn fit_inside_never_upscales() {
        assert_eq!(fit_inside_dimensions(320, 200, 640), (320, 200));
        assert_eq!(fit_inside_dimensions(640, 640, 640), (640, 640));
    }

    #[test]
    fn fit_inside_scales_longer_side_to_target() {
        assert_eq!(fit_inside_dimensions(1280, 960, 640), (640, 480));
        assert_eq!(fit_inside_dimensions(1000, 4000, 640), (160, 640));
        assert_eq!(fit_inside_dimensions(5000, 3, 640), (640, 1));
    }

    #[test]
    fn counts_blobs_above_min_size() {
        // Three 4x4 squares (16 px) and one 3x3 speck (9 px).
        let img = trap_image(100, 60, &[(5, 5, 4), (30, 5, 4), (60, 40, 4), (80, 10, 3)]);
        let result = Segmenter::default()
            .segment(&DynamicImage::ImageLuma8(img))
            .unwrap();

        assert_eq!((result.width, result.height), (100, 60));
        assert_eq!(result.blob_count, 3);
        assert_eq!(result.blob_sizes, vec![16, 16, 16]);
        let expected_ratio = (3.0 * 16.0 + 9.0) / 6000.0;
        assert!((result.dark_pixel_ratio - expected_ratio).abs() < 1e-12);
    }

    #[test]
    fn truncates_sizes_but_not_count() {
        let squares: Vec<(u32, u32, u32)> =
            (0..60).map(|i| ((i % 10) * 10, (i / 10) * 10, 4)).collect();
        let img = trap_image(100, 60, &squares);
        let result = Segmenter::default()
            .segment(&DynamicImage::ImageLuma8(img))
            .unwrap();

        assert_eq!(result.blob_count, 60);
        assert_eq!(result.blob_sizes.len(), 50);
    }

    #[test]
    fn segment_bytes_decodes_png() {
        let mut img = RgbImage::from_pixel(40, 30, Rgb([250, 250, 240]));
        for y in 10..15 {
            for x in 10..15 {
                img.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        let bytes = encode_png(DynamicImage::ImageRgb8(img));
        let result = Segmenter::default().segment_bytes(&bytes).unwrap();
        assert_eq!(result.blob_count, 1);
        assert_eq!(result.blob_sizes, vec![25]);
    }

    #[test]
    fn large_images_are_resized() {
        let img = trap_image(1280, 640, &[]);
        let result = Segmenter::default()
            .segment(&DynamicImage::ImageLuma8(img))
            .unwrap();
        assert_eq!((result.width, result.height), (640, 320));
        assert_eq!(result.blob_count, 0);
        assert_eq!(result.dark_pixel_ratio, 0.0);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = Segmenter::default()
            .segment_bytes(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = Segmenter::default()
            .segment_path("/nonexistent/trap.png")
            .unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn segmentation_is_deterministic() {
        let img = DynamicImage::ImageLuma8(trap_image(
            900,
            700,
            &[(10, 10, 30), (200, 300, 12), (500, 100, 50), (850, 650, 40)],
        ));
        let segmenter = Segmenter::default();
        let first = segmenter.segment(&img).unwrap();
        for _ in 0..3 {
            assert_eq!(segmenter.segment(&img).unwrap(), first);
        }
    }

    #[test]
    fn higher_threshold_never_lowers_dark_ratio() {
        let mut img = GrayImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Luma([((x * 7 + y * 13) % 256) as u8]);
        }
        let img = DynamicImage::ImageLuma8(img);
        let mut previous = 0.0;
        for threshold in (0..=255u8).step_by(5) {
            let config = SegmenterConfig {
                dark_threshold: threshold,
                ..SegmenterConfig::default()
            };
            let ratio = Segmenter::new(config).segment(&img).unwrap().dark_pixel_ratio;
            assert!(ratio >= previous);
            previous = ratio;
        }
    }
}
