use std::collections::{BTreeMap, BTreeSet};

use crate::ir::Link;

use super::error::LayoutError;
use super::types::{CellPattern, Point, ReferenceAnchor};

/// Dense column-major cell array produced by the layout engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    columns: Vec<Vec<Option<String>>>,
    height: usize,
    positions: BTreeMap<String, (usize, usize)>,
    reference: Option<ReferenceAnchor>,
    topo: BTreeMap<String, usize>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            columns: vec![vec![None; height]; width],
            height,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn place(&mut self, x: usize, y: usize, id: &str) -> Result<(), LayoutError> {
        if x >= self.width() || y >= self.height {
            return Err(LayoutError::OutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height,
            });
        }
        if let Some(&(px, py)) = self.positions.get(id) {
            return Err(LayoutError::DuplicatePlacement {
                id: id.to_string(),
                x: px,
                y: py,
            });
        }
        if let Some(occupant) = &self.columns[x][y] {
            return Err(LayoutError::OccupiedCell {
                x,
                y,
                id: occupant.clone(),
            });
        }
        self.columns[x][y] = Some(id.to_string());
        self.positions.insert(id.to_string(), (x, y));
        Ok(())
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&str> {
        self.columns
            .get(x)
            .and_then(|column| column.get(y))
            .and_then(|cell| cell.as_deref())
    }

    pub fn position_of(&self, id: &str) -> Option<(usize, usize)> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Occupied cells of column `x`, top to bottom.
    pub fn column_rows(&self, x: usize) -> Vec<(usize, &str)> {
        let Some(column) = self.columns.get(x) else {
            return Vec::new();
        };
        column
            .iter()
            .enumerate()
            .filter_map(|(row, cell)| cell.as_deref().map(|id| (row, id)))
            .collect()
    }

    pub fn column(&self, x: usize) -> Vec<&str> {
        self.column_rows(x).into_iter().map(|(_, id)| id).collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, (usize, usize))> {
        self.positions.iter().map(|(id, pos)| (id.as_str(), *pos))
    }

    pub fn reference(&self) -> Option<&ReferenceAnchor> {
        self.reference.as_ref()
    }

    pub fn set_reference(&mut self, reference: Option<ReferenceAnchor>) {
        self.reference = reference;
    }

    pub fn topo_map(&self) -> &BTreeMap<String, usize> {
        &self.topo
    }

    pub fn set_topo_map(&mut self, topo: BTreeMap<String, usize>) {
        self.topo = topo;
    }

    /// Replaces the contents of column `x` with `entries` (row, id).
    pub(crate) fn assign_column(&mut self, x: usize, entries: &[(usize, String)]) {
        let Some(column) = self.columns.get_mut(x) else {
            return;
        };
        for cell in column.iter_mut() {
            if let Some(id) = cell.take() {
                self.positions.remove(&id);
            }
        }
        for (row, id) in entries {
            if *row >= self.height {
                continue;
            }
            column[*row] = Some(id.clone());
            self.positions.insert(id.clone(), (x, *row));
        }
    }

    /// Changes the row count; cells beyond the new height are dropped.
    pub(crate) fn resize_height(&mut self, height: usize) {
        for column in &mut self.columns {
            for cell in column.iter_mut().skip(height) {
                if let Some(id) = cell.take() {
                    self.positions.remove(&id);
                }
            }
            column.resize(height, None);
        }
        self.height = height;
    }

    /// Lays this grid of new nodes over `seed`, aligned through the reference
    /// anchor. The result starts at (0, 0) and its reference is the anchor at
    /// its merged cell. A new node landing on a seeded cell moves down to the
    /// first free row of its column.
    pub fn merged_onto(&self, seed: &Grid) -> Result<Grid, LayoutError> {
        let offset = match self
            .reference()
            .and_then(|anchor| Some((anchor, seed.position_of(&anchor.id)?)))
        {
            Some((anchor, (sx, sy))) => {
                Point::new(sx as i32 - anchor.point.x, sy as i32 - anchor.point.y)
            }
            None => Point::new(seed.width() as i32, 0),
        };

        let mut merged = PatternGrid::new();
        for (id, (x, y)) in seed.nodes() {
            merged.place(Point::new(x as i32, y as i32), id);
        }
        let mut cells: Vec<(Point, &str)> = self
            .nodes()
            .map(|(id, (x, y))| (Point::new(x as i32 + offset.x, y as i32 + offset.y), id))
            .collect();
        cells.sort();
        for (mut point, id) in cells {
            if let Some(taken) = merged.position_of(id) {
                return Err(LayoutError::DuplicatePlacement {
                    id: id.to_string(),
                    x: taken.x.max(0) as usize,
                    y: taken.y.max(0) as usize,
                });
            }
            while merged.is_occupied(point) {
                point.y += 1;
            }
            merged.place(point, id);
        }

        let Some((min, max)) = merged.bounds() else {
            return Ok(Grid::empty());
        };
        let mut grid = Grid::new((max.x - min.x + 1) as usize, (max.y - min.y + 1) as usize);
        for (point, id) in merged.cells() {
            grid.place((point.x - min.x) as usize, (point.y - min.y) as usize, id)?;
        }
        grid.set_topo_map(self.topo.clone());
        let reference = self
            .reference()
            .and_then(|anchor| grid.position_of(&anchor.id).map(|pos| (anchor.id.clone(), pos)))
            .map(|(id, (x, y))| ReferenceAnchor {
                id,
                point: Point::new(x as i32, y as i32),
            });
        grid.set_reference(reference);
        Ok(grid)
    }

    pub fn crossing_pairs(&self, links: &BTreeSet<Link>) -> Vec<(Link, Link)> {
        let point_of = |id: &str| {
            self.position_of(id)
                .map(|(x, y)| Point::new(x as i32, y as i32))
        };
        crossing_pairs(links, point_of)
    }
}

/// Sparse placement substrate used while motifs are being placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternGrid {
    cells: BTreeMap<Point, String>,
    positions: BTreeMap<String, Point>,
}

impl PatternGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, point: Point) -> Option<&str> {
        self.cells.get(&point).map(String::as_str)
    }

    pub fn is_occupied(&self, point: Point) -> bool {
        self.cells.contains_key(&point)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn position_of(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    /// Returns false when the cell is taken or the node is already placed.
    pub fn place(&mut self, point: Point, id: &str) -> bool {
        if self.cells.contains_key(&point) || self.positions.contains_key(id) {
            return false;
        }
        self.cells.insert(point, id.to_string());
        self.positions.insert(id.to_string(), point);
        true
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Point, &String)> {
        self.cells.iter()
    }

    pub fn fits(&self, pattern: &CellPattern, left: i32, top: i32) -> bool {
        pattern.cells().all(|(offset, id)| {
            !self.contains(id) && !self.is_occupied(Point::new(left + offset.x, top + offset.y))
        })
    }

    /// Bounding box of every placed cell.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        bounding(self.cells.keys().copied())
    }

    /// Bounding box restricted to the given node IDs.
    pub fn range_of(&self, ids: &BTreeSet<String>) -> Option<(Point, Point)> {
        bounding(
            ids.iter()
                .filter_map(|id| self.positions.get(id).copied()),
        )
    }

    pub fn min_y(&self) -> Option<i32> {
        self.bounds().map(|(min, _)| min.y)
    }

    pub fn max_y(&self) -> Option<i32> {
        self.bounds().map(|(_, max)| max.y)
    }

    pub fn crossing_pairs(&self, links: &BTreeSet<Link>) -> Vec<(Link, Link)> {
        crossing_pairs(links, |id| self.position_of(id))
    }
}

fn bounding(points: impl Iterator<Item = Point>) -> Option<(Point, Point)> {
    let mut range: Option<(Point, Point)> = None;
    for point in points {
        range = Some(match range {
            None => (point, point),
            Some((min, max)) => (
                Point::new(min.x.min(point.x), min.y.min(point.y)),
                Point::new(max.x.max(point.x), max.y.max(point.y)),
            ),
        });
    }
    range
}

/// Pairs of links whose straight cell-to-cell segments cross. Links that
/// share a source or an endpoint never count.
pub(crate) fn crossing_pairs<F>(links: &BTreeSet<Link>, point_of: F) -> Vec<(Link, Link)>
where
    F: Fn(&str) -> Option<Point>,
{
    let placed: Vec<(&Link, Point, Point)> = links
        .iter()
        .filter(|link| !link.is_self_loop())
        .filter_map(|link| Some((link, point_of(&link.src)?, point_of(&link.trg)?)))
        .collect();
    let mut pairs = Vec::new();
    for (idx, (a, a1, a2)) in placed.iter().enumerate() {
        for (b, b1, b2) in placed.iter().skip(idx + 1) {
            if a.src == b.src || a.trg == b.trg || a.src == b.trg || a.trg == b.src {
                continue;
            }
            if segments_cross(*a1, *a2, *b1, *b2) {
                pairs.push(((*a).clone(), (*b).clone()));
            }
        }
    }
    pairs
}

fn orientation(a: Point, b: Point, c: Point) -> i64 {
    let value = (b.x as i64 - a.x as i64) * (c.y as i64 - a.y as i64)
        - (b.y as i64 - a.y as i64) * (c.x as i64 - a.x as i64);
    value.signum()
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

pub(crate) fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);
    if o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 {
        return true;
    }
    // Collinear overlap reads as an ambiguous crossing too.
    (o1 == 0 && on_segment(a1, a2, b1))
        || (o2 == 0 && on_segment(a1, a2, b2))
        || (o3 == 0 && on_segment(b1, b2, a1))
        || (o4 == 0 && on_segment(b1, b2, a2))
}
