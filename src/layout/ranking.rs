use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};

use crate::config::LayeringMethod;
use crate::ir::Link;

use super::error::LayoutError;
use super::types::{CoreAnchor, CorePush};

/// Orders nodes by how many in-set targets they drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRank {
    pub id: String,
    pub target_count: usize,
}

impl Ord for TargetRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target_count
            .cmp(&other.target_count)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for TargetRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn adjacency<'a>(
    nodes: &BTreeSet<String>,
    links: impl IntoIterator<Item = &'a Link>,
) -> BTreeMap<&'a str, Vec<&'a str>> {
    let mut adj: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for link in links {
        if nodes.contains(&link.src) && nodes.contains(&link.trg) {
            adj.entry(link.src.as_str()).or_default().push(link.trg.as_str());
        }
    }
    adj
}

pub struct CycleFinder<'a> {
    nodes: &'a BTreeSet<String>,
    adj: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> CycleFinder<'a> {
    pub fn new(nodes: &'a BTreeSet<String>, links: &'a BTreeSet<Link>) -> Self {
        Self {
            nodes,
            adj: adjacency(nodes, links),
        }
    }

    pub fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Open,
            Done,
        }
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for start in self.nodes {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            marks.insert(start.as_str(), Mark::Open);
            while let Some((node, next_idx)) = stack.pop() {
                let nexts = self.adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if next_idx >= nexts.len() {
                    marks.insert(node, Mark::Done);
                    continue;
                }
                stack.push((node, next_idx + 1));
                let next = nexts[next_idx];
                match marks.get(next) {
                    Some(Mark::Open) => return true,
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::Open);
                        stack.push((next, 0));
                    }
                }
            }
        }
        false
    }
}

/// Longest-path layering. Residual cycles are broken by promoting the
/// remaining node earliest in ID order to a source.
pub fn topo_sort(
    nodes: &BTreeSet<String>,
    links: &BTreeSet<Link>,
    compress: bool,
) -> BTreeMap<String, usize> {
    let adj = adjacency(nodes, links);
    let mut indeg: HashMap<&str, usize> = nodes.iter().map(|id| (id.as_str(), 0)).collect();
    for nexts in adj.values() {
        for next in nexts {
            if let Some(deg) = indeg.get_mut(next) {
                *deg += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<&str>> = nodes
        .iter()
        .map(String::as_str)
        .filter(|id| indeg.get(id).copied().unwrap_or(0) == 0)
        .map(Reverse)
        .collect();

    let mut order: Vec<&str> = Vec::with_capacity(nodes.len());
    let mut processed: HashSet<&str> = HashSet::new();
    loop {
        while let Some(Reverse(id)) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id);
            for next in adj.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                if processed.contains(next) {
                    continue;
                }
                if let Some(deg) = indeg.get_mut(next) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.push(Reverse(*next));
                    }
                }
            }
        }
        if processed.len() >= nodes.len() {
            break;
        }
        match nodes.iter().find(|id| !processed.contains(id.as_str())) {
            Some(id) => ready.push(Reverse(id.as_str())),
            None => break,
        }
    }

    let order_index: HashMap<&str, usize> =
        order.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
    let mut ranks: BTreeMap<String, usize> = BTreeMap::new();
    for node in &order {
        let rank = *ranks.entry(node.to_string()).or_insert(0);
        let from_idx = order_index[node];
        for next in adj.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            if order_index.get(next).copied().unwrap_or(from_idx) <= from_idx {
                continue;
            }
            let entry = ranks.entry(next.to_string()).or_insert(0);
            *entry = (*entry).max(rank + 1);
        }
    }

    if compress {
        for node in order.iter().rev() {
            let from_idx = order_index[node];
            let nearest = adj
                .get(node)
                .into_iter()
                .flatten()
                .filter(|next| order_index.get(*next).copied().unwrap_or(0) > from_idx)
                .filter_map(|next| ranks.get(*next).copied())
                .min();
            if let Some(nearest) = nearest {
                if let Some(rank) = ranks.get_mut(*node) {
                    *rank = (*rank).max(nearest.saturating_sub(1));
                }
            }
        }
    }

    ranks
}

/// Moves the core node and everything it drives to one side of the layering.
pub fn force_core(
    topo: &BTreeMap<String, usize>,
    links: &BTreeSet<Link>,
    core: &CoreAnchor,
) -> BTreeMap<String, usize> {
    let Some(&core_rank) = topo.get(&core.id) else {
        return topo.clone();
    };
    let mut subtree: BTreeSet<&str> = BTreeSet::new();
    let mut stack = vec![core.id.as_str()];
    while let Some(node) = stack.pop() {
        if !subtree.insert(node) {
            continue;
        }
        for link in links.iter().filter(|link| link.src == node) {
            if topo.get(&link.trg).copied().unwrap_or(0) > topo.get(node).copied().unwrap_or(0) {
                stack.push(link.trg.as_str());
            }
        }
    }

    let inside = |rank: usize| rank.saturating_sub(core_rank);
    let sub_span = subtree
        .iter()
        .filter_map(|id| topo.get(*id))
        .map(|rank| inside(*rank))
        .max()
        .unwrap_or(0)
        + 1;
    let rest_min = topo
        .iter()
        .filter(|(id, _)| !subtree.contains(id.as_str()))
        .map(|(_, rank)| *rank)
        .min()
        .unwrap_or(0);
    let rest_span = topo
        .iter()
        .filter(|(id, _)| !subtree.contains(id.as_str()))
        .map(|(_, rank)| rank - rest_min + 1)
        .max()
        .unwrap_or(0);

    topo.iter()
        .map(|(id, rank)| {
            let in_subtree = subtree.contains(id.as_str());
            let new_rank = match (core.push, in_subtree) {
                (CorePush::Stay, _) => *rank,
                (CorePush::Left, true) => inside(*rank),
                (CorePush::Left, false) => sub_span + rank - rest_min,
                (CorePush::Right, true) => rest_span + inside(*rank),
                (CorePush::Right, false) => rank - rest_min,
            };
            (id.clone(), new_rank)
        })
        .collect()
}

/// Groups a topo map into columns, each sorted by node ID.
pub fn columns_from_topo(topo: &BTreeMap<String, usize>) -> Vec<Vec<String>> {
    let max = topo.values().copied().max().map(|m| m + 1).unwrap_or(0);
    let mut columns = vec![Vec::new(); max];
    for (id, rank) in topo {
        columns[*rank].push(id.clone());
    }
    columns.retain(|column| !column.is_empty());
    columns
}

pub fn topo_from_columns(columns: &[Vec<String>]) -> BTreeMap<String, usize> {
    let mut topo = BTreeMap::new();
    for (idx, column) in columns.iter().enumerate() {
        for id in column {
            topo.insert(id.clone(), idx);
        }
    }
    topo
}

/// Splits overfull columns into near-equal runs of at most `max_rows` nodes.
pub fn squash_sort(columns: &[Vec<String>], max_rows: usize) -> Vec<Vec<String>> {
    let max_rows = max_rows.max(1);
    let mut out = Vec::with_capacity(columns.len());
    for column in columns {
        if column.len() <= max_rows {
            out.push(column.clone());
            continue;
        }
        let parts = column.len().div_ceil(max_rows);
        let base = column.len() / parts;
        let extra = column.len() % parts;
        let mut start = 0;
        for part in 0..parts {
            let size = base + usize::from(part < extra);
            out.push(column[start..start + size].to_vec());
            start += size;
        }
    }
    out
}

/// Drops every link `u -> v` for which a longer path from `u` to `v` exists.
pub fn trans_reduce(links: &BTreeSet<Link>) -> BTreeSet<Link> {
    let mut adj: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for link in links {
        adj.entry(link.src.as_str()).or_default().push(link.trg.as_str());
    }
    links
        .iter()
        .filter(|link| {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut stack: Vec<&str> = adj
                .get(link.src.as_str())
                .into_iter()
                .flatten()
                .copied()
                .filter(|next| *next != link.trg)
                .collect();
            while let Some(node) = stack.pop() {
                if node == link.trg {
                    return false;
                }
                if !seen.insert(node) {
                    continue;
                }
                stack.extend(adj.get(node).into_iter().flatten().copied());
            }
            true
        })
        .cloned()
        .collect()
}

pub struct LayerAssignment {
    method: LayeringMethod,
    width: usize,
}

impl LayerAssignment {
    pub fn new(method: LayeringMethod, width: usize) -> Result<Self, LayoutError> {
        if method == LayeringMethod::AdHoc {
            return Err(LayoutError::InvalidOptions(
                "layer assignment needs a Coffman-Graham method".to_string(),
            ));
        }
        if width == 0 {
            return Err(LayoutError::InvalidOptions(
                "layer width must be at least 1".to_string(),
            ));
        }
        Ok(Self { method, width })
    }

    /// Layers an acyclic, transitively reduced link set. Layer 0 holds sources.
    pub fn assign(
        &self,
        nodes: &BTreeSet<String>,
        links: &BTreeSet<Link>,
    ) -> BTreeMap<String, usize> {
        let mut preds: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut succs: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for link in links {
            if nodes.contains(&link.src) && nodes.contains(&link.trg) && !link.is_self_loop() {
                preds.entry(link.trg.as_str()).or_default().push(link.src.as_str());
                succs.entry(link.src.as_str()).or_default().push(link.trg.as_str());
            }
        }

        // Phase one: labels, smallest descending predecessor-label list first.
        let mut labels: HashMap<&str, usize> = HashMap::new();
        while labels.len() < nodes.len() {
            let mut best: Option<(Vec<usize>, &str)> = None;
            for id in nodes.iter().map(String::as_str) {
                if labels.contains_key(id) {
                    continue;
                }
                let node_preds = preds.get(id).map(Vec::as_slice).unwrap_or(&[]);
                if !node_preds.iter().all(|p| labels.contains_key(p)) {
                    continue;
                }
                let mut key: Vec<usize> = node_preds.iter().map(|p| labels[p]).collect();
                key.sort_unstable_by(|a, b| b.cmp(a));
                let better = match &best {
                    None => true,
                    Some((best_key, _)) => key < *best_key,
                };
                if better {
                    best = Some((key, id));
                }
            }
            match best {
                Some((_, id)) => {
                    labels.insert(id, labels.len() + 1);
                }
                // Only reachable on cyclic input; label the rest in ID order.
                None => {
                    for id in nodes.iter().map(String::as_str) {
                        if !labels.contains_key(id) {
                            labels.insert(id, labels.len() + 1);
                        }
                    }
                }
            }
        }

        // Phase two: fill layers from the sink side, highest label first.
        let mut by_label: Vec<&str> = nodes.iter().map(String::as_str).collect();
        by_label.sort_by(|a, b| labels[b].cmp(&labels[a]));
        let mut layer_of: HashMap<&str, usize> = HashMap::new();
        let mut occupancy: Vec<usize> = Vec::new();
        let mut pending: Vec<&str> = by_label;
        while !pending.is_empty() {
            let ready_idx = pending.iter().position(|id| {
                succs
                    .get(id)
                    .into_iter()
                    .flatten()
                    .all(|s| layer_of.contains_key(s))
            });
            let idx = ready_idx.unwrap_or(0);
            let id = pending.remove(idx);
            let min_layer = succs
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|s| layer_of.get(s))
                .map(|layer| layer + 1)
                .max()
                .unwrap_or(0);
            let mut layer = min_layer;
            while occupancy.get(layer).copied().unwrap_or(0) >= self.width {
                layer += 1;
            }
            if occupancy.len() <= layer {
                occupancy.resize(layer + 1, 0);
            }
            occupancy[layer] += 1;
            if self.method == LayeringMethod::ModCoffmanGraham {
                for s in succs.get(id).into_iter().flatten() {
                    if let Some(&sl) = layer_of.get(s) {
                        for dummy in (sl + 1)..layer {
                            occupancy[dummy] += 1;
                        }
                    }
                }
            }
            layer_of.insert(id, layer);
        }

        let top = layer_of.values().copied().max().unwrap_or(0);
        let mut result: BTreeMap<String, usize> = layer_of
            .into_iter()
            .map(|(id, layer)| (id.to_string(), top - layer))
            .collect();
        // Close empty layers left by the width bound.
        let used: BTreeSet<usize> = result.values().copied().collect();
        let remap: HashMap<usize, usize> =
            used.iter().enumerate().map(|(idx, layer)| (*layer, idx)).collect();
        for layer in result.values_mut() {
            *layer = remap[&*layer];
        }
        result
    }
}
