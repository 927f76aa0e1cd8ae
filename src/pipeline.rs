use crate::color::{ColorAssigner, ColorAssignment, ColorIssues, LinkPlacementGrid, Palette};
use crate::config::{Config, merge_init_config};
use crate::layout::{Grid, LinkProperties, RectangularTreeEngine, build_bus_trees};
use crate::layout_dump::LayoutDump;
use crate::parser::ParseOutput;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Everything produced for one network: placement, colors and link buses.
#[derive(Debug)]
pub struct LayoutRun {
    /// Every node, seeded ones included.
    pub grid: Grid,
    /// Only the nodes placed by this run, with the anchor tying them to the
    /// seed.
    pub placed: Grid,
    pub colors: ColorAssignment,
    pub issues: ColorIssues,
    pub buses: BTreeMap<String, LinkProperties>,
    pub palette: Palette,
}

impl LayoutRun {
    pub fn dump(&self, parsed: &ParseOutput) -> LayoutDump {
        LayoutDump::from_layout(
            &self.grid,
            &parsed.network,
            &self.colors,
            &self.issues,
            &self.buses,
            &self.palette,
        )
    }
}

/// `base` with the network's own init directive applied on top.
pub fn effective_config(base: Config, parsed: &ParseOutput) -> Result<Config> {
    match parsed.init_config.as_deref() {
        Some(init) => merge_init_config(base, init),
        None => Ok(base),
    }
}

/// Lays out, colors and routes a parsed network. Nodes pinned with `at`
/// seed the layout and only the remaining nodes are placed; the new nodes
/// are then merged back onto the seed so coloring and routing see them all.
pub fn lay_out(parsed: &ParseOutput, config: &Config) -> Result<LayoutRun> {
    let network = &parsed.network;
    let seed = parsed.seed_grid()?;
    let nodes_to_place: BTreeSet<String> = match &seed {
        Some(seed) => network
            .nodes
            .iter()
            .filter(|id| !seed.contains(id))
            .cloned()
            .collect(),
        None => network.nodes.clone(),
    };

    let engine = RectangularTreeEngine::new(config.layout.clone());
    let placed = engine.layout_fan_in_out_hier(
        network,
        &nodes_to_place,
        seed.as_ref(),
        parsed.core.as_ref(),
    )?;
    let grid = match &seed {
        Some(seed) => placed.merged_onto(seed)?,
        None => placed.clone(),
    };
    info!(
        placed = placed.node_count(),
        nodes = grid.node_count(),
        width = grid.width(),
        height = grid.height(),
        "network laid out"
    );

    let palette = Palette::from_config(&config.color.palette)?;
    let placement = LinkPlacementGrid::new(&grid, network);
    let mut colors = ColorAssignment {
        nodes: parsed
            .colors
            .iter()
            .filter(|(id, _)| network.nodes.contains(*id))
            .map(|(id, color)| (id.clone(), color.clone()))
            .collect(),
        links: BTreeMap::new(),
    };
    let need_colors: BTreeSet<String> = grid.nodes().map(|(id, _)| id.to_string()).collect();
    let assigner = ColorAssigner::new(palette.clone());
    let issues = assigner.assign_colors(
        &placement,
        &mut colors,
        &parsed.colors,
        config.color.keep_colors,
        config.color.incremental,
        &need_colors,
    )?;
    if !issues.is_ok() {
        info!(status = ?issues.status.names(), "coloring reported issues");
    }

    let buses = build_bus_trees(&grid, &network.links);
    Ok(LayoutRun {
        grid,
        placed,
        colors,
        issues,
        buses,
        palette,
    })
}
