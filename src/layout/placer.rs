use super::grid::PatternGrid;
use super::types::{CellPattern, Point};

/// Drops `pattern` into `grid` with its origin at (`left`, `top`). Returns the
/// newly placed node IDs in pattern order.
fn commit(grid: &mut PatternGrid, pattern: &CellPattern, left: i32, top: i32) -> Vec<String> {
    let mut placed = Vec::with_capacity(pattern.len());
    for (offset, id) in pattern.cells() {
        if grid.place(Point::new(left + offset.x, top + offset.y), id) {
            placed.push(id.clone());
        }
    }
    placed
}

fn height_with(grid: &PatternGrid, pattern: &CellPattern, top: i32) -> i32 {
    let low = top + pattern.min_y();
    let high = top + pattern.max_y();
    match (grid.min_y(), grid.max_y()) {
        (Some(min), Some(max)) => high.max(max) - low.min(min) + 1,
        _ => high - low + 1,
    }
}

/// Chooses the vertical offset that keeps the overall stack shortest.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternPlacerMinimizeHeight;

impl PatternPlacerMinimizeHeight {
    pub fn place(&self, grid: &mut PatternGrid, pattern: &CellPattern, left: i32) -> Vec<String> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let span = pattern.max_y() - pattern.min_y() + 1;
        let (low, high) = match (grid.min_y(), grid.max_y()) {
            (Some(min), Some(max)) => (min - span, max + 1),
            _ => (0, 0),
        };
        let mut best: Option<(i32, i32)> = None;
        for top in low..=high {
            if !grid.fits(pattern, left, top) {
                continue;
            }
            let height = height_with(grid, pattern, top);
            let better = match best {
                None => true,
                Some((best_height, best_top)) => {
                    (height, top.abs(), -top) < (best_height, best_top.abs(), -best_top)
                }
            };
            if better {
                best = Some((height, top));
            }
        }
        // The range always ends below every occupied row, so a fit exists.
        let top = best.map(|(_, top)| top).unwrap_or(high);
        commit(grid, pattern, left, top)
    }
}

/// Anchors the pattern on a suggested row, sliding it to the nearest row
/// where it fits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternPlacerVerticalFit;

impl PatternPlacerVerticalFit {
    pub fn place(
        &self,
        grid: &mut PatternGrid,
        pattern: &CellPattern,
        left: i32,
        row: i32,
    ) -> Vec<String> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let span = pattern.max_y() - pattern.min_y() + 1;
        let reach = match (grid.min_y(), grid.max_y()) {
            (Some(min), Some(max)) => (max - min + 1) + span + (row - min).abs() + (row - max).abs(),
            _ => 0,
        };
        for step in 0..=reach {
            for top in [row + step, row - step] {
                if grid.fits(pattern, left, top) {
                    return commit(grid, pattern, left, top);
                }
                if step == 0 {
                    break;
                }
            }
        }
        let below = grid.max_y().map(|max| max + 1 - pattern.min_y()).unwrap_or(row);
        commit(grid, pattern, left, below)
    }
}
