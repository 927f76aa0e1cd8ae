use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{Link, Network};

use super::grid::PatternGrid;
use super::types::{CellPattern, Placement, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MotifKind {
    FanOut,
    FanIn,
}

/// A core node together with the partners it drives (fan-out) or is
/// driven by (fan-in). Ordering is deterministic so motif sorting is stable
/// across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Motif {
    core: String,
    kind: MotifKind,
    partners: Vec<String>,
}

impl Motif {
    pub fn fan_out(core: impl Into<String>, targets: impl IntoIterator<Item = String>) -> Self {
        Self::build(core.into(), MotifKind::FanOut, targets)
    }

    pub fn fan_in(core: impl Into<String>, sources: impl IntoIterator<Item = String>) -> Self {
        Self::build(core.into(), MotifKind::FanIn, sources)
    }

    /// A lone node with no links.
    pub fn solo(core: impl Into<String>) -> Self {
        Self::build(core.into(), MotifKind::FanOut, std::iter::empty())
    }

    fn build(core: String, kind: MotifKind, partners: impl IntoIterator<Item = String>) -> Self {
        let partners: BTreeSet<String> = partners.into_iter().collect();
        Self {
            core,
            kind,
            partners: partners.into_iter().collect(),
        }
    }

    /// One fan-out motif per source node of the network, in source order.
    pub fn fan_outs(network: &Network) -> Vec<Self> {
        let mut by_source: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for link in &network.links {
            by_source
                .entry(link.src.as_str())
                .or_default()
                .push(link.trg.clone());
        }
        by_source
            .into_iter()
            .map(|(src, targets)| Self::fan_out(src, targets))
            .collect()
    }

    pub fn core(&self) -> &str {
        &self.core
    }

    pub fn kind(&self) -> MotifKind {
        self.kind
    }

    pub fn partners(&self) -> &[String] {
        &self.partners
    }

    /// Source node used to chain recursive placement.
    pub fn source(&self) -> &str {
        match self.kind {
            MotifKind::FanOut => &self.core,
            MotifKind::FanIn => self.partners.first().map(String::as_str).unwrap_or(&self.core),
        }
    }

    pub fn links(&self) -> Vec<Link> {
        self.partners
            .iter()
            .map(|partner| match self.kind {
                MotifKind::FanOut => Link::new(self.core.clone(), partner.clone()),
                MotifKind::FanIn => Link::new(partner.clone(), self.core.clone()),
            })
            .collect()
    }

    /// Core first, then partners.
    pub fn nodes(&self) -> Vec<&str> {
        std::iter::once(self.core.as_str())
            .chain(self.partners.iter().map(String::as_str))
            .collect()
    }

    /// Builds the pattern for the nodes not yet in `placed`. Each node sits in
    /// its topo column; nodes sharing a column stack downward in motif order.
    pub fn placement(&self, topo: &BTreeMap<String, usize>, placed: &PatternGrid) -> Placement {
        let pending: Vec<(&str, i32)> = self
            .nodes()
            .into_iter()
            .filter(|id| !placed.contains(id))
            .map(|id| (id, topo.get(id).copied().unwrap_or(0) as i32))
            .collect();
        let left_column = pending.iter().map(|(_, col)| *col).min().unwrap_or(0);

        let mut pattern = CellPattern::new();
        let mut stack_depth: BTreeMap<i32, i32> = BTreeMap::new();
        for (id, col) in &pending {
            let depth = stack_depth.entry(*col).or_insert(0);
            pattern.insert(Point::new(col - left_column, *depth), *id);
            *depth += 1;
        }

        let suggested_row = self
            .nodes()
            .into_iter()
            .find_map(|id| placed.position_of(id))
            .map(|point| point.y);

        Placement {
            pattern,
            left_column,
            suggested_row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo(entries: &[(&str, usize)]) -> BTreeMap<String, usize> {
        entries.iter().map(|(id, r)| (id.to_string(), *r)).collect()
    }

    #[test]
    fn fan_out_links_point_away_from_core() {
        let motif = Motif::fan_out("g", ["b".to_string(), "a".to_string()]);
        assert_eq!(motif.links(), vec![Link::new("g", "a"), Link::new("g", "b")]);
        let fan_in = Motif::fan_in("g", ["a".to_string()]);
        assert_eq!(fan_in.links(), vec![Link::new("a", "g")]);
        assert_eq!(fan_in.source(), "a");
    }

    #[test]
    fn fresh_placement_has_no_suggested_row() {
        let motif = Motif::fan_out("g", ["a".to_string(), "b".to_string()]);
        let placement = motif.placement(&topo(&[("g", 1), ("a", 2), ("b", 2)]), &PatternGrid::new());
        assert_eq!(placement.left_column, 1);
        assert_eq!(placement.suggested_row, None);
        let cells: Vec<(Point, &str)> = placement
            .pattern
            .cells()
            .map(|(p, id)| (*p, id.as_str()))
            .collect();
        assert_eq!(
            cells,
            vec![
                (Point::new(0, 0), "g"),
                (Point::new(1, 0), "a"),
                (Point::new(1, 1), "b"),
            ]
        );
    }

    #[test]
    fn placed_core_suggests_its_row() {
        let motif = Motif::fan_out("g", ["a".to_string()]);
        let mut grid = PatternGrid::new();
        grid.place(Point::new(0, 4), "g");
        let placement = motif.placement(&topo(&[("g", 0), ("a", 1)]), &grid);
        assert_eq!(placement.suggested_row, Some(4));
        assert_eq!(placement.left_column, 1);
        assert_eq!(placement.pattern.len(), 1);
    }

    #[test]
    fn fan_outs_group_links_by_source() {
        let mut network = Network::new();
        network.add_link("b", "c");
        network.add_link("a", "c");
        network.add_link("a", "b");
        let motifs = Motif::fan_outs(&network);
        assert_eq!(motifs.len(), 2);
        assert_eq!(motifs[0].core(), "a");
        assert_eq!(motifs[0].partners(), ["b".to_string(), "c".to_string()]);
    }
}
