use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::config::{FirstPass, LayeringMethod, LayoutOptions};
use crate::ir::{Link, Network};

use super::crossing::CrossingReducer;
use super::error::LayoutError;
use super::grid::{Grid, PatternGrid};
use super::motif::Motif;
use super::placer::{PatternPlacerMinimizeHeight, PatternPlacerVerticalFit};
use super::ranking::{
    CycleFinder, LayerAssignment, TargetRank, columns_from_topo, force_core, squash_sort,
    topo_from_columns, topo_sort, trans_reduce,
};
use super::types::{CoreAnchor, Point, ReferenceAnchor};

/// Inputs for a hierarchical motif layout.
#[derive(Debug, Clone, Copy)]
pub struct MotifLayoutRequest<'a> {
    pub motifs: &'a [Motif],
    pub nodes_to_place: &'a BTreeSet<String>,
    /// Cells of an earlier layout that new nodes must work around.
    pub seed: Option<&'a Grid>,
    pub core: Option<&'a CoreAnchor>,
}

#[derive(Debug, Clone, Default)]
pub struct RectangularTreeEngine {
    options: LayoutOptions,
    reducer: CrossingReducer,
}

impl RectangularTreeEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            reducer: CrossingReducer::new(),
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// One-dimensional ordering of `nodes` for strip display. Nodes driving
    /// more in-set targets come first; with `targs_first` each source is
    /// followed immediately by its targets.
    pub fn layout(
        &self,
        nodes: &BTreeSet<String>,
        network: &Network,
        targs_first: bool,
    ) -> Vec<String> {
        let mut targets: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut ranks: Vec<TargetRank> = Vec::with_capacity(nodes.len());
        for id in nodes {
            let in_set: Vec<&str> = network
                .targets_of(id)
                .filter(|trg| nodes.contains(*trg))
                .collect();
            ranks.push(TargetRank {
                id: id.clone(),
                target_count: in_set.len(),
            });
            targets.insert(id.as_str(), in_set);
        }
        ranks.sort();

        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut order: Vec<String> = Vec::with_capacity(nodes.len());
        let mut place = |id: &str| push_once(nodes, id, &mut placed, &mut order);

        if targs_first {
            for rank in ranks.iter().rev() {
                if rank.target_count == 0 || !place(&rank.id) {
                    continue;
                }
                for trg in &targets[rank.id.as_str()] {
                    place(trg);
                }
            }
        } else {
            for rank in ranks.iter().rev().filter(|rank| rank.target_count > 0) {
                place(&rank.id);
            }
            for rank in ranks.iter().rev().filter(|rank| rank.target_count > 0) {
                for trg in &targets[rank.id.as_str()] {
                    place(trg);
                }
            }
        }
        for rank in ranks.iter().rev() {
            place(&rank.id);
        }
        order
    }

    /// Fan-out motifs for every source of `network`, solo motifs for
    /// isolated nodes, then [`Self::layout_motifs_hier`].
    pub fn layout_fan_in_out_hier(
        &self,
        network: &Network,
        nodes_to_place: &BTreeSet<String>,
        seed: Option<&Grid>,
        core: Option<&CoreAnchor>,
    ) -> Result<Grid, LayoutError> {
        let mut motifs = Motif::fan_outs(network);
        motifs.extend(network.isolated_nodes().into_iter().map(Motif::solo));
        self.layout_motifs_hier(MotifLayoutRequest {
            motifs: &motifs,
            nodes_to_place,
            seed,
            core,
        })
    }

    pub fn layout_motifs_hier(&self, request: MotifLayoutRequest<'_>) -> Result<Grid, LayoutError> {
        self.validate()?;

        let mut motifs: Vec<&Motif> = request.motifs.iter().collect();
        motifs.sort();
        motifs.dedup();

        let mut universe: BTreeSet<String> = request.nodes_to_place.clone();
        for motif in &motifs {
            universe.extend(motif.nodes().into_iter().map(str::to_string));
        }
        if let Some(seed) = request.seed {
            universe.extend(seed.nodes().map(|(id, _)| id.to_string()));
        }

        let all_links: BTreeSet<Link> = motifs.iter().flat_map(|motif| motif.links()).collect();
        let dag = acyclic_links(&motifs, &universe);
        debug!(
            motifs = motifs.len(),
            links = all_links.len(),
            dropped = all_links.len() - dag.len(),
            "collected motif links"
        );

        let mut topo = self.layer(&universe, &dag, request.core)?;
        if let Some(seed) = request.seed {
            anchor_to_seed(&mut topo, seed, &dag);
        }

        let mut pattern = PatternGrid::new();
        if let Some(seed) = request.seed {
            for (id, (x, y)) in seed.nodes() {
                pattern.place(Point::new(x as i32, y as i32), id);
            }
        }
        match self.options.first_pass {
            FirstPass::Sequential => {
                for motif in &motifs {
                    place_motif_in_pattern(motif, &topo, &mut pattern);
                }
            }
            FirstPass::Recursive => {
                let mut done = vec![false; motifs.len()];
                for idx in 0..motifs.len() {
                    if !done[idx] {
                        recursive_place_motif_in_pattern(idx, &motifs, &topo, &mut pattern, &mut done);
                    }
                }
            }
        }

        let mut grid = pattern_to_grid(&pattern, request.nodes_to_place)?;
        if grid.is_empty() {
            return Ok(grid);
        }
        grid.set_topo_map(topo);

        if self.options.crossing_reduction {
            self.do_crossing_reduction(&mut grid, &all_links);
        }
        if self.options.normalize_rows || self.options.incremental {
            normalize_rows(&mut grid);
        }
        debug!(
            width = grid.width(),
            height = grid.height(),
            nodes = grid.node_count(),
            "motif layout complete"
        );
        Ok(grid)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        if self.options.max_per_layer == 0 {
            return Err(LayoutError::InvalidOptions(format!(
                "max_per_layer must be at least 1 for {:?} layering",
                self.options.layering
            )));
        }
        Ok(())
    }

    fn layer(
        &self,
        universe: &BTreeSet<String>,
        dag: &BTreeSet<Link>,
        core: Option<&CoreAnchor>,
    ) -> Result<BTreeMap<String, usize>, LayoutError> {
        let mut topo = topo_sort(universe, dag, self.options.topo_compress);
        if let Some(core) = core {
            topo = force_core(&topo, dag, core);
        }
        match self.options.layering {
            LayeringMethod::AdHoc => {
                let squashed = squash_sort(&columns_from_topo(&topo), self.options.max_per_layer);
                Ok(topo_from_columns(&squashed))
            }
            method @ (LayeringMethod::CoffmanGraham | LayeringMethod::ModCoffmanGraham) => {
                let forward: BTreeSet<Link> = dag
                    .iter()
                    .filter(|link| match (topo.get(&link.src), topo.get(&link.trg)) {
                        (Some(src), Some(trg)) => src < trg,
                        _ => false,
                    })
                    .cloned()
                    .collect();
                let reduced = trans_reduce(&forward);
                trace!(forward = forward.len(), reduced = reduced.len(), "transitive reduction");
                Ok(LayerAssignment::new(method, self.options.max_per_layer)?.assign(universe, &reduced))
            }
        }
    }

    /// Sweeps left to right, reordering each column against every node
    /// already fixed to its left.
    fn do_crossing_reduction(&self, grid: &mut Grid, links: &BTreeSet<Link>) {
        for x in 1..grid.width() {
            let mut context: Vec<(usize, usize, String)> = grid
                .nodes()
                .filter(|(_, (cx, _))| *cx < x)
                .map(|(id, (cx, cy))| (cy, cx, id.to_string()))
                .collect();
            context.sort();
            let prev: Vec<String> = context.into_iter().map(|(_, _, id)| id).collect();

            let rows = grid.column_rows(x);
            let slots: Vec<usize> = rows.iter().map(|(row, _)| *row).collect();
            let curr: Vec<String> = rows.iter().map(|(_, id)| id.to_string()).collect();
            let reordered = self.reducer.reduce_crossings(&prev, &curr, links);
            if reordered != curr {
                trace!(column = x, "crossing reduction reordered column");
                let entries: Vec<(usize, String)> = slots.into_iter().zip(reordered).collect();
                grid.assign_column(x, &entries);
            }
        }
    }
}

fn push_once<'a>(
    nodes: &'a BTreeSet<String>,
    id: &str,
    placed: &mut BTreeSet<&'a str>,
    order: &mut Vec<String>,
) -> bool {
    match nodes.get(id) {
        Some(key) if placed.insert(key.as_str()) => {
            order.push(key.clone());
            true
        }
        _ => false,
    }
}

/// Adds motif links one at a time, dropping any that would close a cycle.
/// Links into target-only nodes cannot close one and skip the check.
fn acyclic_links(motifs: &[&Motif], nodes: &BTreeSet<String>) -> BTreeSet<Link> {
    let with_outbound: BTreeSet<String> = motifs
        .iter()
        .flat_map(|motif| motif.links())
        .map(|link| link.src)
        .collect();
    let mut links: BTreeSet<Link> = BTreeSet::new();
    for link in motifs.iter().flat_map(|motif| motif.links()) {
        if !with_outbound.contains(&link.trg) {
            links.insert(link);
            continue;
        }
        if !links.insert(link.clone()) {
            continue;
        }
        if CycleFinder::new(nodes, &links).has_cycle() {
            trace!(link = %link, "dropping cycle-closing link");
            links.remove(&link);
        }
    }
    links
}

/// Pins seeded nodes to their seed column and pushes every new node that
/// hangs off them (directly or through other new nodes) right of its source.
fn anchor_to_seed(topo: &mut BTreeMap<String, usize>, seed: &Grid, dag: &BTreeSet<Link>) {
    let mut anchored: BTreeSet<String> = BTreeSet::new();
    for (id, (x, _)) in seed.nodes() {
        topo.insert(id.to_string(), x);
        anchored.insert(id.to_string());
    }
    // Columns only grow and the links are acyclic, so this settles.
    loop {
        let mut raised = Vec::new();
        for link in dag {
            if seed.contains(&link.trg) || !anchored.contains(&link.src) {
                continue;
            }
            let Some(&src) = topo.get(&link.src) else {
                continue;
            };
            let trg = topo.get(&link.trg).copied().unwrap_or(0);
            if trg <= src {
                raised.push((link.trg.clone(), src + 1));
            } else if !anchored.contains(&link.trg) {
                raised.push((link.trg.clone(), trg));
            }
        }
        if raised.is_empty() {
            break;
        }
        for (id, column) in raised {
            let entry = topo.entry(id.clone()).or_insert(0);
            if *entry < column {
                trace!(node = %id, column, "moved right of seeded source");
                *entry = column;
            }
            anchored.insert(id);
        }
    }
}

fn place_motif_in_pattern(
    motif: &Motif,
    topo: &BTreeMap<String, usize>,
    pattern: &mut PatternGrid,
) -> Vec<String> {
    let placement = motif.placement(topo, pattern);
    if placement.pattern.is_empty() {
        return Vec::new();
    }
    match placement.suggested_row {
        None => PatternPlacerMinimizeHeight.place(pattern, &placement.pattern, placement.left_column),
        Some(row) => PatternPlacerVerticalFit.place(
            pattern,
            &placement.pattern,
            placement.left_column,
            row,
        ),
    }
}

fn recursive_place_motif_in_pattern(
    idx: usize,
    motifs: &[&Motif],
    topo: &BTreeMap<String, usize>,
    pattern: &mut PatternGrid,
    done: &mut [bool],
) {
    done[idx] = true;
    let placed = place_motif_in_pattern(motifs[idx], topo, pattern);
    if placed.is_empty() {
        return;
    }
    for next in 0..motifs.len() {
        if !done[next] && placed.iter().any(|id| id == motifs[next].source()) {
            recursive_place_motif_in_pattern(next, motifs, topo, pattern, done);
        }
    }
}

/// Copies the placed cells of `nodes_to_place` into a dense grid. The first
/// other cell met becomes the reference anchor.
fn pattern_to_grid(pattern: &PatternGrid, nodes_to_place: &BTreeSet<String>) -> Result<Grid, LayoutError> {
    let Some((min, max)) = pattern.range_of(nodes_to_place) else {
        return Ok(Grid::empty());
    };
    let width = (max.x - min.x + 1) as usize;
    let height = (max.y - min.y + 1) as usize;
    let mut grid = Grid::new(width, height);
    let mut reference = None;
    for (point, id) in pattern.cells() {
        let relative = Point::new(point.x - min.x, point.y - min.y);
        if nodes_to_place.contains(id) {
            grid.place(relative.x as usize, relative.y as usize, id)?;
        } else if reference.is_none() {
            reference = Some(ReferenceAnchor {
                id: id.clone(),
                point: relative,
            });
        }
    }
    grid.set_reference(reference);
    Ok(grid)
}

/// Closes row gaps and centers every column on the tallest one. The
/// reference row follows the nearest node of its column.
pub(crate) fn normalize_rows(grid: &mut Grid) {
    let tallest = (0..grid.width())
        .map(|x| grid.column_rows(x).len())
        .max()
        .unwrap_or(0);
    if tallest == 0 {
        return;
    }

    let mut moves: Vec<Vec<(usize, usize, String)>> = Vec::with_capacity(grid.width());
    for x in 0..grid.width() {
        let rows = grid.column_rows(x);
        let offset = (tallest - rows.len()) / 2;
        moves.push(
            rows.iter()
                .enumerate()
                .map(|(idx, (old, id))| (*old, offset + idx, id.to_string()))
                .collect(),
        );
    }

    let reference = grid.reference().cloned().map(|mut anchor| {
        let column = usize::try_from(anchor.point.x)
            .ok()
            .and_then(|x| moves.get(x));
        let nearest = column.and_then(|column| {
            column
                .iter()
                .min_by_key(|(old, _, _)| ((*old as i32 - anchor.point.y).abs(), *old))
        });
        if let Some((old, new, _)) = nearest {
            anchor.point.y += *new as i32 - *old as i32;
        }
        anchor
    });

    for (x, column) in moves.into_iter().enumerate() {
        let entries: Vec<(usize, String)> = column
            .into_iter()
            .map(|(_, new, id)| (new, id))
            .collect();
        grid.assign_column(x, &entries);
    }
    grid.resize_height(tallest);
    grid.set_reference(reference);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::CorePush;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fan(core: &str, targets: &[&str]) -> Motif {
        Motif::fan_out(core, targets.iter().map(|s| s.to_string()))
    }

    fn request<'a>(motifs: &'a [Motif], nodes: &'a BTreeSet<String>) -> MotifLayoutRequest<'a> {
        MotifLayoutRequest {
            motifs,
            nodes_to_place: nodes,
            seed: None,
            core: None,
        }
    }

    fn assert_each_node_once(grid: &Grid, nodes: &BTreeSet<String>) {
        let mut seen = BTreeSet::new();
        for x in 0..grid.width() {
            for id in grid.column(x) {
                assert!(seen.insert(id.to_string()), "{id} placed twice");
            }
        }
        assert_eq!(&seen, nodes);
    }

    #[test]
    fn strip_layout_drags_targets_after_sources() {
        let mut network = Network::new();
        network.add_link("n1", "n2");
        network.ensure_node("n3", None);
        let engine = RectangularTreeEngine::default();
        let nodes = ids(&["n1", "n2", "n3"]);
        assert_eq!(engine.layout(&nodes, &network, true), vec!["n1", "n2", "n3"]);
        assert_eq!(engine.layout(&nodes, &network, true), engine.layout(&nodes, &network, true));
    }

    #[test]
    fn strip_layout_sources_first_mode() {
        let mut network = Network::new();
        network.add_link("a", "x");
        network.add_link("a", "y");
        network.add_link("b", "z");
        let engine = RectangularTreeEngine::default();
        let nodes = ids(&["a", "b", "x", "y", "z", "lone"]);
        let order = engine.layout(&nodes, &network, false);
        assert_eq!(order, vec!["a", "b", "x", "y", "z", "lone"]);
        let order = engine.layout(&nodes, &network, true);
        assert_eq!(order, vec!["a", "x", "y", "b", "z", "lone"]);
    }

    #[test]
    fn hierarchical_layout_places_every_node_once() {
        let motifs = vec![fan("a", &["b", "c"]), fan("b", &["d"]), fan("c", &["d", "e"])];
        let nodes = ids(&["a", "b", "c", "d", "e"]);
        let engine = RectangularTreeEngine::default();
        let grid = engine.layout_motifs_hier(request(&motifs, &nodes)).unwrap();
        assert_each_node_once(&grid, &nodes);
        let (ax, _) = grid.position_of("a").unwrap();
        let (dx, _) = grid.position_of("d").unwrap();
        assert!(ax < dx);
        assert_eq!(grid.topo_map()["a"], 0);
    }

    #[test]
    fn cycles_still_get_layers() {
        let motifs = vec![fan("a", &["b"]), fan("b", &["c"]), fan("c", &["a"])];
        let nodes = ids(&["a", "b", "c"]);
        for first_pass in [FirstPass::Sequential, FirstPass::Recursive] {
            let options = LayoutOptions {
                first_pass,
                ..LayoutOptions::default()
            };
            let grid = RectangularTreeEngine::new(options)
                .layout_motifs_hier(request(&motifs, &nodes))
                .unwrap();
            assert_each_node_once(&grid, &nodes);
            let topo = grid.topo_map();
            assert!(nodes.iter().all(|id| topo.contains_key(id)));
        }
    }

    #[test]
    fn cycle_closing_link_is_dropped() {
        let motifs = [fan("a", &["b"]), fan("b", &["a"])];
        let refs: Vec<&Motif> = motifs.iter().collect();
        let dag = acyclic_links(&refs, &ids(&["a", "b"]));
        assert_eq!(dag.len(), 1);
        assert!(dag.contains(&Link::new("a", "b")));
    }

    #[test]
    fn layout_is_deterministic_regardless_of_motif_order() {
        let motifs = vec![fan("a", &["b", "c", "d"]), fan("c", &["e"]), fan("b", &["e", "f"])];
        let mut shuffled = motifs.clone();
        shuffled.reverse();
        let nodes = ids(&["a", "b", "c", "d", "e", "f"]);
        let engine = RectangularTreeEngine::default();
        let first = engine.layout_motifs_hier(request(&motifs, &nodes)).unwrap();
        let second = engine.layout_motifs_hier(request(&shuffled, &nodes)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_selection_yields_empty_grid() {
        let motifs = vec![fan("a", &["b"])];
        let grid = RectangularTreeEngine::default()
            .layout_motifs_hier(request(&motifs, &BTreeSet::new()))
            .unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.width(), 0);
    }

    #[test]
    fn zero_layer_width_is_rejected() {
        let options = LayoutOptions {
            max_per_layer: 0,
            ..LayoutOptions::default()
        };
        let motifs = vec![fan("a", &["b"])];
        let nodes = ids(&["a", "b"]);
        let err = RectangularTreeEngine::new(options)
            .layout_motifs_hier(request(&motifs, &nodes))
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidOptions(_)));
    }

    #[test]
    fn squashing_caps_column_height() {
        let targets: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
        let motifs = vec![Motif::fan_out("hub", targets.clone())];
        let mut nodes: BTreeSet<String> = targets.into_iter().collect();
        nodes.insert("hub".to_string());
        for layering in [
            LayeringMethod::AdHoc,
            LayeringMethod::CoffmanGraham,
            LayeringMethod::ModCoffmanGraham,
        ] {
            let options = LayoutOptions {
                layering,
                max_per_layer: 3,
                ..LayoutOptions::default()
            };
            let grid = RectangularTreeEngine::new(options)
                .layout_motifs_hier(request(&motifs, &nodes))
                .unwrap();
            assert_each_node_once(&grid, &nodes);
            for x in 0..grid.width() {
                assert!(grid.column(x).len() <= 3, "{layering:?} column {x} overfull");
            }
        }
    }

    #[test]
    fn unplaced_seed_node_becomes_reference() {
        let mut seed = Grid::new(1, 1);
        seed.place(0, 0, "old").unwrap();
        let motifs = vec![fan("old", &["new"])];
        let nodes = ids(&["new"]);
        let options = LayoutOptions {
            incremental: true,
            ..LayoutOptions::default()
        };
        let grid = RectangularTreeEngine::new(options)
            .layout_motifs_hier(MotifLayoutRequest {
                motifs: &motifs,
                nodes_to_place: &nodes,
                seed: Some(&seed),
                core: None,
            })
            .unwrap();
        assert_eq!(grid.node_count(), 1);
        let reference = grid.reference().unwrap();
        assert_eq!(reference.id, "old");
        assert_eq!(reference.point, Point::new(-1, 0));
    }

    #[test]
    fn new_targets_follow_a_source_seeded_right() {
        let mut seed = Grid::new(4, 1);
        seed.place(3, 0, "A").unwrap();
        let motifs = vec![fan("A", &["C"]), fan("C", &["D"])];
        let nodes = ids(&["C", "D"]);
        let grid = RectangularTreeEngine::default()
            .layout_motifs_hier(MotifLayoutRequest {
                motifs: &motifs,
                nodes_to_place: &nodes,
                seed: Some(&seed),
                core: None,
            })
            .unwrap();
        assert_eq!(grid.position_of("C"), Some((0, 0)));
        assert_eq!(grid.position_of("D"), Some((1, 0)));
        assert_eq!(grid.reference().unwrap().point, Point::new(-1, 0));
        assert_eq!(grid.topo_map()["A"], 3);
        assert_eq!(grid.topo_map()["C"], 4);
        assert_eq!(grid.topo_map()["D"], 5);
    }

    #[test]
    fn incremental_forces_row_normalization() {
        let motifs = vec![fan("hub", &["t1", "t2", "t3"])];
        let nodes = ids(&["hub", "t1", "t2", "t3"]);
        let layout = |incremental| {
            let options = LayoutOptions {
                normalize_rows: false,
                incremental,
                ..LayoutOptions::default()
            };
            RectangularTreeEngine::new(options)
                .layout_motifs_hier(request(&motifs, &nodes))
                .unwrap()
        };
        assert_eq!(layout(false).position_of("hub"), Some((0, 0)));
        let grid = layout(true);
        assert_eq!(grid.position_of("hub"), Some((0, 1)));
        assert_eq!(grid.column(1), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn recursive_pass_places_chained_motif_next_to_its_source() {
        // Sorted order is a, c, z; the z motif hangs off a and competes with
        // c for the top cell of column 2.
        let motifs = vec![fan("a", &["z"]), fan("c", &["d"]), fan("z", &["d", "e"])];
        let nodes = ids(&["a", "c", "d", "e", "z"]);
        let layout = |first_pass| {
            let options = LayoutOptions {
                first_pass,
                crossing_reduction: false,
                normalize_rows: false,
                ..LayoutOptions::default()
            };
            RectangularTreeEngine::new(options)
                .layout_motifs_hier(request(&motifs, &nodes))
                .unwrap()
        };

        let recursive = layout(FirstPass::Recursive);
        assert_each_node_once(&recursive, &nodes);
        assert_eq!(recursive.position_of("z"), Some((1, 0)));
        assert_eq!(recursive.column(2), vec!["d", "e"]);
        assert_eq!(recursive.position_of("c"), Some((0, 1)));

        let sequential = layout(FirstPass::Sequential);
        assert_each_node_once(&sequential, &nodes);
        assert_eq!(sequential.position_of("z"), Some((1, 0)));
        assert_eq!(sequential.column(2), vec!["e", "d"]);
        assert_eq!(sequential.position_of("c"), Some((0, 1)));
    }

    #[test]
    fn core_pushed_left_lands_in_first_column() {
        let motifs = vec![fan("x", &["y"]), fan("core", &["t"])];
        let nodes = ids(&["x", "y", "core", "t"]);
        let core = CoreAnchor {
            id: "core".to_string(),
            push: CorePush::Left,
        };
        let grid = RectangularTreeEngine::default()
            .layout_motifs_hier(MotifLayoutRequest {
                motifs: &motifs,
                nodes_to_place: &nodes,
                seed: None,
                core: Some(&core),
            })
            .unwrap();
        assert_eq!(grid.position_of("core").map(|(x, _)| x), Some(0));
        assert_eq!(grid.position_of("x").map(|(x, _)| x), Some(2));
    }

    #[test]
    fn normalization_centers_short_columns() {
        let mut grid = Grid::new(2, 5);
        grid.place(0, 0, "a").unwrap();
        grid.place(0, 2, "b").unwrap();
        grid.place(0, 4, "c").unwrap();
        grid.place(1, 4, "d").unwrap();
        grid.set_reference(Some(ReferenceAnchor {
            id: "ref".to_string(),
            point: Point::new(1, 4),
        }));
        normalize_rows(&mut grid);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.column(0), vec!["a", "b", "c"]);
        assert_eq!(grid.position_of("d"), Some((1, 1)));
        assert_eq!(grid.reference().unwrap().point, Point::new(1, 1));
    }

    #[test]
    fn crossing_reduction_untangles_columns() {
        let mut grid = Grid::new(2, 2);
        grid.place(0, 0, "a").unwrap();
        grid.place(0, 1, "b").unwrap();
        grid.place(1, 0, "y").unwrap();
        grid.place(1, 1, "x").unwrap();
        let links: BTreeSet<Link> = [Link::new("a", "x"), Link::new("b", "y")]
            .into_iter()
            .collect();
        RectangularTreeEngine::default().do_crossing_reduction(&mut grid, &links);
        assert_eq!(grid.column(1), vec!["x", "y"]);
        assert!(grid.crossing_pairs(&links).is_empty());
    }
}
