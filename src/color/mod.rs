//! Link and node coloring for laid-out networks.
//!
//! Sources whose links cross are partitioned into color classes by a
//! [`GraphColorer`]; classes are then handed palette colors, preferring the
//! colors their members carried in a previous layout.

mod colorer;
mod placement;
mod resolver;

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::ir::Link;

pub use colorer::{GraphColorer, GreedyColorer, classes_to_members};
pub use placement::LinkPlacementGrid;
pub use resolver::{ColorResolver, Palette};

bitflags! {
    /// Outcome flags of a coloring pass. Empty means the coloring is clean.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ColorStatus: u8 {
        const COLOR_COLLISION = 0b0001;
        const COLOR_REASSIGNMENT = 0b0010;
        const TOO_FEW_COLORS = 0b0100;
    }
}

impl ColorStatus {
    pub const COLORING_OK: Self = Self::empty();

    /// Flag names for reporting, e.g. `["COLOR_COLLISION"]`.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorIssues {
    pub status: ColorStatus,
    pub node_one: Option<String>,
    pub node_two: Option<String>,
}

impl ColorIssues {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("node {0} has outbound links but was left without a color")]
    UnresolvedSource(String),
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
}

/// Color tags for nodes and links. Links without their own tag take the
/// color of their source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorAssignment {
    pub nodes: BTreeMap<String, String>,
    pub links: BTreeMap<String, String>,
}

impl ColorAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_color(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(String::as_str)
    }

    pub fn link_color(&self, link: &Link) -> Option<&str> {
        self.links
            .get(&link.id())
            .or_else(|| self.nodes.get(&link.src))
            .map(String::as_str)
    }
}

/// Result of [`ColorAssigner::assign_unique_colors`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueColoring {
    pub colors: BTreeMap<String, String>,
    pub status: ColorStatus,
    /// Two legacy colors were forced into conflicting classes; the caller
    /// has to check the placement for an actual collision.
    pub maybe_collision: bool,
}

pub struct ColorAssigner<R, C = GreedyColorer> {
    resolver: R,
    colorer: C,
}

impl<R: ColorResolver> ColorAssigner<R, GreedyColorer> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            colorer: GreedyColorer,
        }
    }
}

impl<R: ColorResolver, C: GraphColorer> ColorAssigner<R, C> {
    pub fn with_colorer(resolver: R, colorer: C) -> Self {
        Self { resolver, colorer }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Colors every placed link. With `keep_colors` the legacy map is applied
    /// verbatim; otherwise fresh colors are computed for the sources in
    /// `need_colors`.
    pub fn assign_colors(
        &self,
        grid: &LinkPlacementGrid<'_>,
        assignment: &mut ColorAssignment,
        color_map: &BTreeMap<String, String>,
        keep_colors: bool,
        incremental: bool,
        need_colors: &BTreeSet<String>,
    ) -> Result<ColorIssues, ColorError> {
        if keep_colors {
            self.keep_colors(grid, assignment, color_map);
            return Ok(self.has_ambiguous_crossing(grid, assignment).unwrap_or_default());
        }

        let unique =
            self.assign_unique_colors(grid, color_map, &assignment.nodes, incremental, need_colors)?;
        for link in grid.links() {
            if unique.colors.contains_key(&link.src) {
                assignment.links.remove(&link.id());
            }
        }
        assignment.nodes.extend(unique.colors);

        let mut issues = ColorIssues {
            status: unique.status,
            ..ColorIssues::default()
        };
        if unique.maybe_collision {
            if let Some(collision) = self.has_ambiguous_crossing(grid, assignment) {
                warn!(
                    one = collision.node_one.as_deref().unwrap_or(""),
                    two = collision.node_two.as_deref().unwrap_or(""),
                    "legacy colors collide on crossing links"
                );
                issues.status |= collision.status;
                issues.node_one = collision.node_one;
                issues.node_two = collision.node_two;
            }
        }
        debug!(status = ?issues.status, "link coloring complete");
        Ok(issues)
    }

    fn keep_colors(
        &self,
        grid: &LinkPlacementGrid<'_>,
        assignment: &mut ColorAssignment,
        color_map: &BTreeMap<String, String>,
    ) {
        for link in grid.links() {
            let id = link.id();
            let color = color_map.get(&id).or_else(|| color_map.get(&link.src));
            if let Some(color) = color {
                assignment.links.insert(id, color.clone());
            }
        }
        for (id, color) in color_map {
            if grid.grid().contains(id) {
                assignment.nodes.insert(id.clone(), color.clone());
            }
        }
    }

    /// First pair of crossing links drawn in the same color, if any.
    pub fn has_ambiguous_crossing(
        &self,
        grid: &LinkPlacementGrid<'_>,
        assignment: &ColorAssignment,
    ) -> Option<ColorIssues> {
        grid.crossings().iter().find_map(|(one, two)| {
            let color = assignment.link_color(one)?;
            if assignment.link_color(two)? != color {
                return None;
            }
            Some(ColorIssues {
                status: ColorStatus::COLOR_COLLISION,
                node_one: Some(grid.node_name(&one.src).unwrap_or("").to_string()),
                node_two: Some(grid.node_name(&two.src).unwrap_or("").to_string()),
            })
        })
    }

    /// Computes a fresh node → color map for the sources in `need_colors`.
    /// `current` holds the colors the nodes are drawn with right now.
    pub fn assign_unique_colors(
        &self,
        grid: &LinkPlacementGrid<'_>,
        color_map: &BTreeMap<String, String>,
        current: &BTreeMap<String, String>,
        incremental: bool,
        need_colors: &BTreeSet<String>,
    ) -> Result<UniqueColoring, ColorError> {
        let black = self.resolver.black();
        let white = self.resolver.white();
        let is_sentinel = |color: &str| color == black || color == white;

        let needy: BTreeSet<String> = need_colors
            .iter()
            .filter(|id| grid.has_outbound(id))
            .cloned()
            .collect();
        let conflicts: BTreeSet<(String, String)> = grid
            .source_conflicts()
            .into_iter()
            .filter(|(a, b)| needy.contains(a) && needy.contains(b))
            .collect();
        let classes = self.colorer.color(&needy, &conflicts);
        let members = classes_to_members(&classes);

        let mut status = ColorStatus::empty();
        let mut maybe_collision = false;

        let mut claims: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
        for (id, class) in &classes {
            if let Some(color) = color_map.get(id) {
                if !is_sentinel(color) && self.resolver.is_known(color) {
                    claims.entry(color.as_str()).or_default().insert(*class);
                }
            }
        }

        // Legacy colors stay with the smallest class that claims them.
        let mut class_colors: BTreeMap<usize, Vec<String>> =
            members.keys().map(|class| (*class, Vec::new())).collect();
        let mut legacy_used: BTreeSet<&str> = BTreeSet::new();
        for (color, claimants) in &claims {
            let Some(winner) = claimants.first() else {
                continue;
            };
            if let Some(colors) = class_colors.get_mut(winner) {
                colors.push(color.to_string());
            }
            legacy_used.insert(*color);
            if claimants.len() > 1 {
                trace!(color, claimants = claimants.len(), "legacy color claimed by several classes");
                status |= ColorStatus::COLOR_REASSIGNMENT;
                maybe_collision = true;
            }
        }

        let palette: Vec<String> = (0..self.resolver.palette_size())
            .filter_map(|idx| self.resolver.palette_color(idx))
            .filter(|color| !is_sentinel(*color))
            .map(str::to_string)
            .collect();
        let mut pool: Vec<String> = palette
            .iter()
            .filter(|color| !legacy_used.contains(color.as_str()))
            .cloned()
            .collect();
        pool.reverse();
        let recycle: Vec<String> = pool.iter().rev().cloned().collect();

        if members.len() > palette.len() {
            status |= ColorStatus::TOO_FEW_COLORS;
        }

        // Empty classes, largest first.
        let mut empty: Vec<usize> = class_colors
            .iter()
            .filter(|(_, colors)| colors.is_empty())
            .map(|(class, _)| *class)
            .collect();
        empty.sort_by(|a, b| members[b].len().cmp(&members[a].len()).then(a.cmp(b)));
        let mut cycle = 0;
        for class in empty {
            let color = match pool.pop() {
                Some(color) => color,
                None if !recycle.is_empty() => {
                    let color = recycle[cycle % recycle.len()].clone();
                    cycle += 1;
                    color
                }
                None => black.to_string(),
            };
            if let Some(colors) = class_colors.get_mut(&class) {
                colors.push(color);
            }
        }

        // Leftover colors go to the classes spreading the most sources per color.
        while !pool.is_empty() {
            let Some(class) = worst_links_per_color(&members, &class_colors) else {
                break;
            };
            if let (Some(color), Some(colors)) = (pool.pop(), class_colors.get_mut(&class)) {
                colors.push(color);
            }
        }

        let mut colors: BTreeMap<String, String> = BTreeMap::new();
        let mut usage: BTreeMap<String, usize> = BTreeMap::new();
        for (class, ids) in &members {
            let assigned = class_colors.get(class).cloned().unwrap_or_default();
            let mut remaining: Vec<String> = Vec::new();
            for id in ids {
                let legacy = color_map.get(id).map(String::as_str);
                let chosen = match legacy {
                    Some(mapped)
                        if !incremental
                            && current.get(id).map(String::as_str) == Some(mapped)
                            && !is_sentinel(mapped)
                            && self.resolver.is_known(mapped) =>
                    {
                        if !assigned.iter().any(|color| color == mapped) {
                            maybe_collision = true;
                        }
                        mapped.to_string()
                    }
                    Some(mapped) if mapped != white && assigned.iter().any(|color| color == mapped) => {
                        mapped.to_string()
                    }
                    _ => {
                        if remaining.is_empty() {
                            remaining = self.resolver.rarest_colors(&assigned, &usage);
                            remaining.reverse();
                        }
                        remaining.pop().unwrap_or_else(|| black.to_string())
                    }
                };
                remaining.retain(|color| *color != chosen);
                *usage.entry(chosen.clone()).or_insert(0) += 1;
                colors.insert(id.clone(), chosen);
            }
        }

        for (id, color) in color_map {
            if colors.contains_key(id) || !need_colors.contains(id) {
                continue;
            }
            if grid.has_outbound(id) {
                return Err(ColorError::UnresolvedSource(id.clone()));
            }
            colors.insert(id.clone(), color.clone());
        }

        debug!(
            sources = needy.len(),
            classes = members.len(),
            status = ?status,
            "assigned unique colors"
        );
        Ok(UniqueColoring {
            colors,
            status,
            maybe_collision,
        })
    }
}

/// The class with the highest sources-per-color ratio that could still use
/// another color. Ties go to the lower class index.
fn worst_links_per_color(
    members: &BTreeMap<usize, BTreeSet<String>>,
    class_colors: &BTreeMap<usize, Vec<String>>,
) -> Option<usize> {
    let mut worst: Option<(usize, usize, usize)> = None;
    for (class, ids) in members {
        let count = class_colors.get(class).map(Vec::len).unwrap_or(0).max(1);
        if count >= ids.len() {
            continue;
        }
        let worse = match worst {
            None => true,
            Some((_, best_ids, best_count)) => ids.len() * best_count > best_ids * count,
        };
        if worse {
            worst = Some((*class, ids.len(), count));
        }
    }
    worst.map(|(class, _, _)| class)
}
