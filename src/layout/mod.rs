mod bus;
mod crossing;
mod engine;
mod error;
mod grid;
mod motif;
mod placer;
mod ranking;
pub(crate) mod types;

pub use bus::{
    BusError, BusSegment, EndDrop, InvertedLinkProps, LinkProperties, LinkSegmentId,
    LinkSegmentKind, SegmentForwarding, TaggedEnd, build_bus_trees,
};
pub use crossing::{CrossingReducer, count_crossings};
pub use engine::{MotifLayoutRequest, RectangularTreeEngine};
pub use error::LayoutError;
pub use grid::{Grid, PatternGrid};
pub use motif::{Motif, MotifKind};
pub use placer::{PatternPlacerMinimizeHeight, PatternPlacerVerticalFit};
pub use ranking::{
    CycleFinder, LayerAssignment, TargetRank, columns_from_topo, force_core, squash_sort,
    topo_from_columns, topo_sort, trans_reduce,
};
pub use types::*;
