// THEORY:
// A `Blob` is one maximal 4-connected region of dark pixels in the binarized
// trap image. On a sticky trap, most such regions are insects, so the number of
// accepted blobs is used as a crude pest-count proxy.
//
// Key architectural principles:
// 1.  **Stateless Data Container**: a blob is a snapshot of one analysis call.
//     It has no identity beyond that call, and only its size survives into the
//     `AnalysisResult`.
// 2.  **Data Aggregation**: instead of carrying every pixel coordinate, the
//     labeler folds each region into its size, bounding box and centroid while
//     it floods.

use serde::Serialize;

/// A 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Summary of one connected dark region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blob {
    /// Discovery order in raster scan; the first blob has the top-most,
    /// left-most starting pixel.
    pub id: u64,
    /// Number of pixels in the region.
    pub size: usize,
    /// Top-left and bottom-right corners (inclusive).
    pub bounding_box: (Point, Point),
    /// Unweighted mean pixel position.
    pub centroid: (f64, f64),
}

/// Running totals for a blob that is still being flooded.
#[derive(Debug, Clone)]
pub(crate) struct BlobAccumulator {
    size: usize,
    min: Point,
    max: Point,
    sum_x: u64,
    sum_y: u64,
}

impl BlobAccumulator {
    pub(crate) fn new(seed: Point) -> Self {
        Self {
            size: 0,
            min: seed,
            max: seed,
            sum_x: 0,
            sum_y: 0,
        }
    }

    pub(crate) fn add(&mut self, p: Point) {
        self.size += 1;
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.sum_x += p.x as u64;
        self.sum_y += p.y as u64;
    }

    pub(crate) fn finish(self, id: u64) -> Blob {
        let n = self.size.max(1) as f64;
        Blob {
            id,
            size: self.size,
            bounding_box: (self.min, self.max),
            centroid: (self.sum_x as f64 / n, self.sum_y as f64 / n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_tracks_extent_and_centroid() {
        let mut acc = BlobAccumulator::new(Point { x: 2, y: 1 });
        for (x, y) in [(2, 1), (3, 1), (2, 2), (3, 2)] {
            acc.add(Point { x, y });
        }
        let blob = acc.finish(7);
        assert_eq!(blob.id, 7);
        assert_eq!(blob.size, 4);
        assert_eq!(blob.bounding_box, (Point { x: 2, y: 1 }, Point { x: 3, y: 2 }));
        assert_eq!(blob.centroid, (2.5, 1.5));
    }
}
