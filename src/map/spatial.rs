use std::collections::HashMap;

use glam::DVec2;

/// Uniform hash grid over projected feature bounding boxes.
///
/// Each feature is inserted into every cell its pixel bbox overlaps inside
/// the canvas, so a point query on the canvas never misses a candidate;
/// callers still run an exact containment test on what comes back.
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Cell size in pixels
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, p: DVec2) -> (i32, i32) {
        let x = (p.x / self.cell_size).floor() as i32;
        let y = (p.y / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from (min, max) pixel bounding boxes, indexed by position.
    ///
    /// Boxes are clipped to the canvas `[0, extent]`; features entirely off
    /// the canvas are left out.
    pub fn build(bboxes: impl Iterator<Item = (DVec2, DVec2)>, cell_size: f64, extent: DVec2) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, (min, max)) in bboxes.enumerate() {
            if !(min.is_finite() && max.is_finite()) {
                continue;
            }
            if max.x < 0.0 || max.y < 0.0 || min.x > extent.x || min.y > extent.y {
                continue;
            }
            let min_cell = grid.to_cell(min.clamp(DVec2::ZERO, extent));
            let max_cell = grid.to_cell(max.clamp(DVec2::ZERO, extent));
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Feature indices whose bbox may contain `p`
    pub fn query_point(&self, p: DVec2) -> &[usize] {
        self.cells
            .get(&self.to_cell(p))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
