use std::collections::BTreeSet;

use crate::ir::{Link, Network};
use crate::layout::Grid;

/// A laid-out network as seen by the color assigner: which placed links cross
/// and what their endpoints are called.
#[derive(Debug, Clone)]
pub struct LinkPlacementGrid<'a> {
    grid: &'a Grid,
    network: &'a Network,
    crossings: Vec<(Link, Link)>,
}

impl<'a> LinkPlacementGrid<'a> {
    pub fn new(grid: &'a Grid, network: &'a Network) -> Self {
        let crossings = grid
            .crossing_pairs(&network.links)
            .into_iter()
            .filter(|(a, b)| a.src != b.src)
            .collect();
        Self {
            grid,
            network,
            crossings,
        }
    }

    pub fn grid(&self) -> &Grid {
        self.grid
    }

    /// Crossing link pairs, each reported once.
    pub fn crossings(&self) -> &[(Link, Link)] {
        &self.crossings
    }

    /// Links whose endpoints are both placed.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.network
            .links
            .iter()
            .filter(|link| self.grid.contains(&link.src) && self.grid.contains(&link.trg))
    }

    pub fn node_name(&self, id: &str) -> Option<&str> {
        self.network.name_of(id)
    }

    pub fn has_outbound(&self, id: &str) -> bool {
        self.links().any(|link| link.src == id)
    }

    /// Source pairs whose links cross, each pair ordered.
    pub fn source_conflicts(&self) -> BTreeSet<(String, String)> {
        self.crossings
            .iter()
            .map(|(a, b)| {
                if a.src < b.src {
                    (a.src.clone(), b.src.clone())
                } else {
                    (b.src.clone(), a.src.clone())
                }
            })
            .collect()
    }
}
