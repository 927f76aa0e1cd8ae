use std::collections::{BTreeMap, BTreeSet};

/// Partitions nodes into color classes so that no conflicting pair shares a
/// class.
pub trait GraphColorer {
    fn color(
        &self,
        nodes: &BTreeSet<String>,
        conflicts: &BTreeSet<(String, String)>,
    ) -> BTreeMap<String, usize>;
}

/// Welsh-Powell: highest degree first, ties by ID, each node taking the
/// smallest class unused by its neighbors.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyColorer;

impl GraphColorer for GreedyColorer {
    fn color(
        &self,
        nodes: &BTreeSet<String>,
        conflicts: &BTreeSet<(String, String)>,
    ) -> BTreeMap<String, usize> {
        let mut neighbors: BTreeMap<&str, BTreeSet<&str>> =
            nodes.iter().map(|id| (id.as_str(), BTreeSet::new())).collect();
        for (a, b) in conflicts {
            if a == b || !nodes.contains(a) || !nodes.contains(b) {
                continue;
            }
            neighbors.entry(a.as_str()).or_default().insert(b.as_str());
            neighbors.entry(b.as_str()).or_default().insert(a.as_str());
        }

        let mut order: Vec<&str> = neighbors.keys().copied().collect();
        order.sort_by(|a, b| {
            neighbors[b]
                .len()
                .cmp(&neighbors[a].len())
                .then_with(|| a.cmp(b))
        });

        let mut classes: BTreeMap<String, usize> = BTreeMap::new();
        for id in order {
            let taken: BTreeSet<usize> = neighbors[id]
                .iter()
                .filter_map(|other| classes.get(*other).copied())
                .collect();
            let class = (0..).find(|class| !taken.contains(class)).unwrap_or(0);
            classes.insert(id.to_string(), class);
        }
        classes
    }
}

/// Inverts a node → class map into class → members.
pub fn classes_to_members(classes: &BTreeMap<String, usize>) -> BTreeMap<usize, BTreeSet<String>> {
    let mut members: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
    for (id, class) in classes {
        members.entry(*class).or_default().insert(id.clone());
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn pairs(list: &[(&str, &str)]) -> BTreeSet<(String, String)> {
        list.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn conflicting_nodes_get_distinct_classes() {
        let classes = GreedyColorer.color(&set(&["a", "b", "c"]), &pairs(&[("a", "b"), ("b", "c")]));
        assert_eq!(classes["b"], 0);
        assert_eq!(classes["a"], 1);
        assert_eq!(classes["c"], 1);
    }

    #[test]
    fn clique_needs_one_class_per_node() {
        let nodes = set(&["a", "b", "c", "d"]);
        let mut conflicts = BTreeSet::new();
        for a in &nodes {
            for b in &nodes {
                if a < b {
                    conflicts.insert((a.clone(), b.clone()));
                }
            }
        }
        let classes = GreedyColorer.color(&nodes, &conflicts);
        assert_eq!(classes_to_members(&classes).len(), 4);
    }

    #[test]
    fn isolated_nodes_share_class_zero() {
        let classes = GreedyColorer.color(&set(&["x", "y"]), &BTreeSet::new());
        assert!(classes.values().all(|class| *class == 0));
    }
}
