use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::ir::Link;

/// Reorders one column against the fixed context to its left.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossingReducer;

impl CrossingReducer {
    pub fn new() -> Self {
        Self
    }

    /// Returns `curr` permuted to reduce crossings against `prev`. The input
    /// order is returned unchanged when the permutation would not help.
    pub fn reduce_crossings(
        &self,
        prev: &[String],
        curr: &[String],
        links: &BTreeSet<Link>,
    ) -> Vec<String> {
        if curr.len() <= 1 || prev.is_empty() {
            return curr.to_vec();
        }
        let positions: HashMap<&str, usize> = prev
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();
        let current_positions: HashMap<&str, usize> = curr
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();

        let mut neighbors: HashMap<&str, Vec<&str>> = HashMap::new();
        for link in links {
            if current_positions.contains_key(link.trg.as_str())
                && positions.contains_key(link.src.as_str())
            {
                neighbors
                    .entry(link.trg.as_str())
                    .or_default()
                    .push(link.src.as_str());
            }
            if current_positions.contains_key(link.src.as_str())
                && positions.contains_key(link.trg.as_str())
            {
                neighbors
                    .entry(link.src.as_str())
                    .or_default()
                    .push(link.trg.as_str());
            }
        }

        let mut reordered: Vec<String> = curr.to_vec();
        reordered.sort_by(|a, b| {
            let a_score = median_position(a, &neighbors, &positions, &current_positions);
            let b_score = median_position(b, &neighbors, &positions, &current_positions);
            match a_score.partial_cmp(&b_score) {
                Some(Ordering::Equal) | None => current_positions[a.as_str()]
                    .cmp(&current_positions[b.as_str()]),
                Some(ordering) => ordering,
            }
        });

        let before = count_crossings(prev, curr, links);
        let after = count_crossings(prev, &reordered, links);
        if after < before {
            reordered
        } else {
            curr.to_vec()
        }
    }
}

pub(super) fn median_position(
    node_id: &str,
    neighbors: &HashMap<&str, Vec<&str>>,
    positions: &HashMap<&str, usize>,
    current_positions: &HashMap<&str, usize>,
) -> f32 {
    let fallback = *current_positions.get(node_id).unwrap_or(&0) as f32;
    let Some(list) = neighbors.get(node_id) else {
        return fallback;
    };
    let mut values: Vec<f32> = list
        .iter()
        .filter_map(|neighbor| positions.get(neighbor))
        .map(|pos| *pos as f32)
        .collect();
    if values.is_empty() {
        return fallback;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

/// Counts pairwise crossings of links running between two orderings.
pub fn count_crossings(left: &[String], right: &[String], links: &BTreeSet<Link>) -> usize {
    let left_pos: HashMap<&str, usize> = left
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let right_pos: HashMap<&str, usize> = right
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for link in links {
        if let (Some(&l), Some(&r)) = (
            left_pos.get(link.src.as_str()),
            right_pos.get(link.trg.as_str()),
        ) {
            spans.push((l, r));
        }
        if let (Some(&l), Some(&r)) = (
            left_pos.get(link.trg.as_str()),
            right_pos.get(link.src.as_str()),
        ) {
            spans.push((l, r));
        }
    }
    let mut crossings = 0;
    for (idx, (l1, r1)) in spans.iter().enumerate() {
        for (l2, r2) in spans.iter().skip(idx + 1) {
            if (l1 < l2 && r1 > r2) || (l1 > l2 && r1 < r2) {
                crossings += 1;
            }
        }
    }
    crossings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn uncrosses_a_swapped_pair() {
        let prev = ids(&["a", "b"]);
        let curr = ids(&["y", "x"]);
        let links: BTreeSet<Link> = [Link::new("a", "x"), Link::new("b", "y")]
            .into_iter()
            .collect();
        assert_eq!(count_crossings(&prev, &curr, &links), 1);
        let reduced = CrossingReducer::new().reduce_crossings(&prev, &curr, &links);
        assert_eq!(reduced, ids(&["x", "y"]));
        assert_eq!(count_crossings(&prev, &reduced, &links), 0);
    }

    #[test]
    fn keeps_order_when_nothing_improves() {
        let prev = ids(&["a", "b"]);
        let curr = ids(&["x", "free", "y"]);
        let links: BTreeSet<Link> = [Link::new("a", "x"), Link::new("b", "y")]
            .into_iter()
            .collect();
        let reduced = CrossingReducer::new().reduce_crossings(&prev, &curr, &links);
        assert_eq!(reduced, curr);
    }

    #[test]
    fn median_uses_middle_neighbor() {
        let neighbors: HashMap<&str, Vec<&str>> = [("n", vec!["a", "b", "c"])].into_iter().collect();
        let positions: HashMap<&str, usize> =
            [("a", 0), ("b", 4), ("c", 9)].into_iter().collect();
        let current: HashMap<&str, usize> = [("n", 2)].into_iter().collect();
        assert_eq!(median_position("n", &neighbors, &positions, &current), 4.0);
        assert_eq!(median_position("z", &neighbors, &positions, &current), 0.0);
    }
}
