use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("invalid layout options: {0}")]
    InvalidOptions(String),
    #[error("node {id} is already placed at ({x}, {y})")]
    DuplicatePlacement { id: String, x: usize, y: usize },
    #[error("cell ({x}, {y}) is already taken by {id}")]
    OccupiedCell { x: usize, y: usize, id: String },
    #[error("cell ({x}, {y}) is outside a {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}
