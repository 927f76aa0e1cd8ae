use std::collections::BTreeMap;

use serde::Serialize;

/// Integer cell coordinate. Pattern-grid points may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A node that lies outside the placed set, kept so callers can align the
/// new grid against an existing layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceAnchor {
    pub id: String,
    pub point: Point,
}

/// Relative cell offsets for the nodes of one motif.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellPattern {
    cells: BTreeMap<Point, String>,
}

impl CellPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: Point, id: impl Into<String>) {
        self.cells.insert(point, id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Point, &String)> {
        self.cells.iter()
    }

    pub fn min_y(&self) -> i32 {
        self.cells.keys().map(|p| p.y).min().unwrap_or(0)
    }

    pub fn max_y(&self) -> i32 {
        self.cells.keys().map(|p| p.y).max().unwrap_or(0)
    }
}

/// Where a motif wants to go: its pattern, the grid column of the pattern's
/// x = 0, and optionally a row the pattern's y = 0 should sit on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub pattern: CellPattern,
    pub left_column: i32,
    pub suggested_row: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorePush {
    Left,
    Right,
    Stay,
}

/// Pins a distinguished node so repeated incremental layouts keep it stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreAnchor {
    pub id: String,
    pub push: CorePush,
}
