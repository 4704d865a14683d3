// THEORY:
// The labeler is the engine of the spatial grouping step. It scans any binary
// grid in raster order and, for every set cell not yet visited, floods the
// 4-connected region it belongs to (up, down, left, right; diagonals never
// connect).
//
// Key algorithm properties:
// 1.  **Explicit work-list**: pending cells live in a `Vec<usize>` of flat
//     indices, not on the call stack. A 640x640 all-dark image is one region of
//     409,600 cells, and it floods with the same bounded stack depth as a
//     single pixel.
// 2.  **Mark on push**: a cell is marked visited when it enters the work-list,
//     so no cell is ever queued twice and every cell is touched O(1) times.
// 3.  **Deterministic order**: regions are emitted in the raster order of their
//     first (top-most, then left-most) cell. The region *set* does not depend
//     on visit order at all; only ids and list order follow the scan.
// 4.  **Stateless Utility**: the labeler holds no state between calls and knows
//     nothing about images; the segmenter supplies the grid.

use crate::core_modules::blob::{Blob, BlobAccumulator, Point};

pub mod labeler {
    use super::*;

    /// Read access to a width x height grid of on/off cells.
    pub trait BinaryGrid {
        fn width(&self) -> u32;
        fn height(&self) -> u32;
        fn is_set(&self, x: u32, y: u32) -> bool;
    }

    /// Finds every 4-connected region of set cells, in raster order of discovery.
    pub fn find_components<G: BinaryGrid + ?Sized>(grid: &G) -> Vec<Blob> {
        let width = grid.width() as usize;
        let height = grid.height() as usize;
        let mut visited = vec![false; width * height];
        let mut blobs: Vec<Blob> = Vec::new();
        let mut work_list: Vec<usize> = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = y * width + x;
                if visited[index] || !grid.is_set(x as u32, y as u32) {
                    continue;
                }

                let blob = flood_region(
                    grid,
                    index,
                    &mut visited,
                    &mut work_list,
                    blobs.len() as u64,
                );
                blobs.push(blob);
            }
        }

        blobs
    }

    /// Counts regions whose size is at least `min_size`.
    pub fn count_components<G: BinaryGrid + ?Sized>(grid: &G, min_size: usize) -> usize {
        find_components(grid)
            .iter()
            .filter(|blob| blob.size >= min_size)
            .count()
    }

    /// Depth-first flood from `seed`, driven by the caller's reusable work-list.
    fn flood_region<G: BinaryGrid + ?Sized>(
        grid: &G,
        seed: usize,
        visited: &mut [bool],
        work_list: &mut Vec<usize>,
        blob_id: u64,
    ) -> Blob {
        let width = grid.width() as usize;
        let height = grid.height() as usize;
        let seed_point = Point {
            x: (seed % width) as u32,
            y: (seed / width) as u32,
        };
        let mut acc = BlobAccumulator::new(seed_point);

        work_list.clear();
        work_list.push(seed);
        visited[seed] = true;

        while let Some(current) = work_list.pop() {
            let cx = current % width;
            let cy = current / width;
            acc.add(Point {
                x: cx as u32,
                y: cy as u32,
            });

            // Check all 4 direct neighbors (not diagonals).
            for (dx, dy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                let nx = cx as i64 + dx;
                let ny = cy as i64 + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }

                let (nx, ny) = (nx as usize, ny as usize);
                let neighbor = ny * width + nx;
                if !visited[neighbor] && grid.is_set(nx as u32, ny as u32) {
                    visited[neighbor] = true;
                    work_list.push(neighbor);
                }
            }
        }

        acc.finish(blob_id)
    }
}
