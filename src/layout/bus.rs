//! Bus-tree geometry for routed links.
//!
//! Every link source owns one bus: a tree of segments hanging off the start
//! drop at the source pad, with one end drop per target link. A link with no
//! segments at all runs straight from the source pad to its target and is
//! reported as a direct link.
//!
//! Points are in half-cell units: cell (x, y) is centered at (2x, 2y), so the
//! routing channel between two columns sits on odd x coordinates.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use thiserror::Error;

use crate::ir::Link;

use super::grid::Grid;
use super::types::Point;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("unknown segment {0}")]
    UnknownSegment(String),
    #[error("link {0} already has an end drop")]
    DuplicateDrop(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaggedEnd {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LinkSegmentKind {
    StartDrop,
    EndDrop(String),
    Direct(String),
    Segment(String),
}

/// Names one piece of a bus tree. The tagged endpoint is a hint for callers
/// and takes no part in equality, ordering, or hashing.
#[derive(Debug, Clone, Serialize)]
pub struct LinkSegmentId {
    kind: LinkSegmentKind,
    tagged: Option<TaggedEnd>,
}

impl LinkSegmentId {
    pub fn start_drop() -> Self {
        Self::from_kind(LinkSegmentKind::StartDrop)
    }

    pub fn end_drop(link_id: impl Into<String>) -> Self {
        Self::from_kind(LinkSegmentKind::EndDrop(link_id.into()))
    }

    pub fn direct(link_id: impl Into<String>) -> Self {
        Self::from_kind(LinkSegmentKind::Direct(link_id.into()))
    }

    pub fn segment(seg_id: impl Into<String>) -> Self {
        Self::from_kind(LinkSegmentKind::Segment(seg_id.into()))
    }

    fn from_kind(kind: LinkSegmentKind) -> Self {
        Self { kind, tagged: None }
    }

    pub fn tagged(mut self, end: TaggedEnd) -> Self {
        self.tagged = Some(end);
        self
    }

    pub fn kind(&self) -> &LinkSegmentKind {
        &self.kind
    }

    pub fn tagged_end(&self) -> Option<TaggedEnd> {
        self.tagged
    }

    /// Segment ID or link ID carried by the variant.
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            LinkSegmentKind::StartDrop => None,
            LinkSegmentKind::EndDrop(id)
            | LinkSegmentKind::Direct(id)
            | LinkSegmentKind::Segment(id) => Some(id),
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(
            self.kind,
            LinkSegmentKind::StartDrop | LinkSegmentKind::EndDrop(_)
        )
    }

    pub fn is_segment(&self) -> bool {
        matches!(self.kind, LinkSegmentKind::Segment(_))
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.kind, LinkSegmentKind::Direct(_))
    }
}

impl PartialEq for LinkSegmentId {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for LinkSegmentId {}

impl Hash for LinkSegmentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl PartialOrd for LinkSegmentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LinkSegmentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind.cmp(&other.kind)
    }
}

impl fmt::Display for LinkSegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LinkSegmentKind::StartDrop => write!(f, "start-drop")?,
            LinkSegmentKind::EndDrop(id) => write!(f, "end-drop:{id}")?,
            LinkSegmentKind::Direct(id) => write!(f, "direct:{id}")?,
            LinkSegmentKind::Segment(id) => write!(f, "segment:{id}")?,
        }
        match self.tagged {
            Some(TaggedEnd::Start) => write!(f, "@start"),
            Some(TaggedEnd::End) => write!(f, "@end"),
            None => Ok(()),
        }
    }
}

/// Forwarding pointers from retired segment IDs to their survivors.
#[derive(Debug, Clone, Default)]
pub struct SegmentForwarding {
    next: HashMap<String, LinkSegmentId>,
}

impl SegmentForwarding {
    pub fn retire(&mut self, seg_id: &str, successor: LinkSegmentId) {
        self.next.insert(seg_id.to_string(), successor);
    }

    pub fn is_retired(&self, seg_id: &str) -> bool {
        self.next.contains_key(seg_id)
    }

    /// Follows the chain for `id` to a live ID, compressing the path.
    pub fn resolve(&mut self, id: &LinkSegmentId) -> LinkSegmentId {
        let mut chain: Vec<String> = Vec::new();
        let mut current = id.clone();
        while let LinkSegmentKind::Segment(seg) = &current.kind {
            let Some(next) = self.next.get(seg) else {
                break;
            };
            chain.push(seg.clone());
            current = next.clone();
        }
        for seg in chain {
            self.next.insert(seg, current.clone());
        }
        match id.tagged {
            Some(end) => current.tagged(end),
            None => current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusSegment {
    pub id: String,
    pub parent: Option<String>,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndDrop {
    pub link_id: String,
    pub target: String,
    pub parent: Option<String>,
}

/// The bus tree for all links leaving one source.
#[derive(Debug, Clone, Default)]
pub struct LinkProperties {
    source: String,
    segments: BTreeMap<String, BusSegment>,
    drops: BTreeMap<String, EndDrop>,
    forwarding: SegmentForwarding,
    next_id: usize,
}

impl LinkProperties {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> impl Iterator<Item = &BusSegment> {
        self.segments.values()
    }

    pub fn segment(&self, id: &str) -> Option<&BusSegment> {
        self.segments.get(id)
    }

    pub fn drops(&self) -> impl Iterator<Item = &EndDrop> {
        self.drops.values()
    }

    pub fn forwarding(&self) -> &SegmentForwarding {
        &self.forwarding
    }

    /// Adds a segment under `parent` (`None` hangs it off the start drop).
    pub fn add_segment(
        &mut self,
        parent: Option<&str>,
        start: Point,
        end: Point,
    ) -> Result<String, BusError> {
        if let Some(parent) = parent {
            if !self.segments.contains_key(parent) {
                return Err(BusError::UnknownSegment(parent.to_string()));
            }
        }
        let id = self.next_id.to_string();
        self.next_id += 1;
        self.segments.insert(
            id.clone(),
            BusSegment {
                id: id.clone(),
                parent: parent.map(str::to_string),
                start,
                end,
            },
        );
        Ok(id)
    }

    pub fn add_end_drop(
        &mut self,
        link: &Link,
        parent: Option<&str>,
    ) -> Result<(), BusError> {
        let link_id = link.id();
        if self.drops.contains_key(&link_id) {
            return Err(BusError::DuplicateDrop(link_id));
        }
        if let Some(parent) = parent {
            if !self.segments.contains_key(parent) {
                return Err(BusError::UnknownSegment(parent.to_string()));
            }
        }
        self.drops.insert(
            link_id.clone(),
            EndDrop {
                link_id,
                target: link.trg.clone(),
                parent: parent.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Removes a segment, handing its children and drops to its parent and
    /// recording where the old ID now points.
    pub fn remove_segment(&mut self, seg_id: &str) -> Result<(), BusError> {
        let Some(removed) = self.segments.remove(seg_id) else {
            return Err(BusError::UnknownSegment(seg_id.to_string()));
        };
        for segment in self.segments.values_mut() {
            if segment.parent.as_deref() == Some(seg_id) {
                segment.parent = removed.parent.clone();
            }
        }
        for drop in self.drops.values_mut() {
            if drop.parent.as_deref() == Some(seg_id) {
                drop.parent = removed.parent.clone();
            }
        }
        let successor = match &removed.parent {
            Some(parent) => LinkSegmentId::segment(parent.clone()),
            None => LinkSegmentId::start_drop(),
        };
        self.forwarding.retire(seg_id, successor);
        Ok(())
    }

    /// A link is direct when its drop hangs off the start drop and the bus
    /// has no segments at all.
    pub fn is_direct(&self, link_id: &str) -> bool {
        self.segments.is_empty()
            && self
                .drops
                .get(link_id)
                .is_some_and(|drop| drop.parent.is_none())
    }

    fn drop_id(&self, link_id: &str) -> LinkSegmentId {
        if self.is_direct(link_id) {
            LinkSegmentId::direct(link_id)
        } else {
            LinkSegmentId::end_drop(link_id)
        }
    }
}

fn parent_id(parent: Option<&String>) -> LinkSegmentId {
    match parent {
        Some(seg) => LinkSegmentId::segment(seg.clone()),
        None => LinkSegmentId::start_drop(),
    }
}

/// Child-direction index over a [`LinkProperties`] bus tree. Rebuild it after
/// the tree changes.
#[derive(Debug, Clone)]
pub struct InvertedLinkProps {
    seg_children: BTreeMap<LinkSegmentId, Vec<LinkSegmentId>>,
    drop_children: BTreeMap<LinkSegmentId, Vec<LinkSegmentId>>,
    target_drops: BTreeMap<String, LinkSegmentId>,
    ascending: BTreeMap<String, Vec<LinkSegmentId>>,
    forwarding: SegmentForwarding,
}

impl InvertedLinkProps {
    pub fn new(props: &LinkProperties) -> Self {
        let mut seg_children: BTreeMap<LinkSegmentId, Vec<LinkSegmentId>> = BTreeMap::new();
        for segment in props.segments.values() {
            seg_children
                .entry(parent_id(segment.parent.as_ref()))
                .or_default()
                .push(LinkSegmentId::segment(segment.id.clone()));
        }

        let mut drop_children: BTreeMap<LinkSegmentId, Vec<LinkSegmentId>> = BTreeMap::new();
        let mut target_drops = BTreeMap::new();
        let mut ascending = BTreeMap::new();
        for drop in props.drops.values() {
            let drop_id = props.drop_id(&drop.link_id);
            drop_children
                .entry(parent_id(drop.parent.as_ref()))
                .or_default()
                .push(drop_id.clone());
            target_drops.insert(drop.link_id.clone(), drop_id);

            let mut path = Vec::new();
            let mut current = drop.parent.clone();
            while let Some(seg) = current {
                if path.len() > props.segments.len() {
                    break;
                }
                current = props.segments.get(&seg).and_then(|s| s.parent.clone());
                path.push(LinkSegmentId::segment(seg));
            }
            ascending.insert(drop.link_id.clone(), path);
        }

        Self {
            seg_children,
            drop_children,
            target_drops,
            ascending,
            forwarding: props.forwarding.clone(),
        }
    }

    pub fn root_segments(&self) -> &[LinkSegmentId] {
        self.children_of(&LinkSegmentId::start_drop())
    }

    pub fn children_of(&self, id: &LinkSegmentId) -> &[LinkSegmentId] {
        self.seg_children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn drops_of(&self, id: &LinkSegmentId) -> &[LinkSegmentId] {
        self.drop_children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn target_drop(&self, link_id: &str) -> Option<&LinkSegmentId> {
        self.target_drops.get(link_id)
    }

    /// Segments from the drop's parent up to the root.
    pub fn ascending_path(&self, link_id: &str) -> Option<&[LinkSegmentId]> {
        self.ascending.get(link_id).map(Vec::as_slice)
    }

    /// End drop, the segments above it, then the start drop.
    pub fn segment_ids_for_link(&self, link_id: &str) -> Vec<LinkSegmentId> {
        let Some(drop) = self.target_drops.get(link_id) else {
            return Vec::new();
        };
        if drop.is_direct() {
            return vec![drop.clone()];
        }
        let mut ids = vec![drop.clone().tagged(TaggedEnd::End)];
        ids.extend(self.ascending_path(link_id).unwrap_or(&[]).iter().cloned());
        ids.push(LinkSegmentId::start_drop().tagged(TaggedEnd::Start));
        ids
    }

    /// Links whose path to the root runs through `seg_id`.
    pub fn links_through(&self, seg_id: &str) -> BTreeSet<&str> {
        let wanted = LinkSegmentId::segment(seg_id);
        self.ascending
            .iter()
            .filter(|(_, path)| path.contains(&wanted))
            .map(|(link, _)| link.as_str())
            .collect()
    }

    /// Maps IDs captured before the tree changed onto live IDs. Duplicates
    /// that collapse onto the same survivor are dropped.
    pub fn convert_stale_ids(&mut self, ids: &[LinkSegmentId]) -> Vec<LinkSegmentId> {
        let mut seen: BTreeSet<LinkSegmentId> = BTreeSet::new();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let live = match id.kind() {
                LinkSegmentKind::EndDrop(link) | LinkSegmentKind::Direct(link) => {
                    match self.target_drops.get(link) {
                        Some(current) => match id.tagged_end() {
                            Some(end) => current.clone().tagged(end),
                            None => current.clone(),
                        },
                        None => id.clone(),
                    }
                }
                _ => self.forwarding.resolve(id),
            };
            if seen.insert(live.clone()) {
                out.push(live);
            }
        }
        out
    }
}

/// Routes one orthogonal bus per source over the grid: a stub into the
/// channel right of the source, a vertical trunk, and a branch per target.
/// Cells sit on even coordinates and channels on odd ones. Targets at or left
/// of the source column are fed through the channel left of the target.
pub fn build_bus_trees(grid: &Grid, links: &BTreeSet<Link>) -> BTreeMap<String, LinkProperties> {
    let mut by_source: BTreeMap<&str, Vec<(&Link, (usize, usize))>> = BTreeMap::new();
    for link in links {
        if link.is_self_loop() || grid.position_of(&link.src).is_none() {
            continue;
        }
        if let Some(pos) = grid.position_of(&link.trg) {
            by_source.entry(link.src.as_str()).or_default().push((link, pos));
        }
    }

    let mut trees = BTreeMap::new();
    for (source, targets) in by_source {
        let Some((sx, sy)) = grid.position_of(source) else {
            continue;
        };
        let (sx, sy) = (sx as i32 * 2, sy as i32 * 2);
        let mut props = LinkProperties::new(source);

        if let [(link, (tx, ty))] = targets.as_slice() {
            if *tx as i32 * 2 == sx + 2 && *ty as i32 * 2 == sy {
                // Only a single adjacent target: no bus needed.
                if props.add_end_drop(link, None).is_ok() {
                    trees.insert(source.to_string(), props);
                }
                continue;
            }
        }

        let channel = sx + 1;
        let Ok(root) = props.add_segment(None, Point::new(sx, sy), Point::new(channel, sy)) else {
            continue;
        };
        // Targets at or left of the source are reached along the gutter above
        // their row, so the trunk has to reach that gutter instead.
        let rows: Vec<i32> = targets
            .iter()
            .map(|(_, (tx, ty))| {
                let row = *ty as i32 * 2;
                if *tx as i32 * 2 > sx { row } else { row - 1 }
            })
            .collect();
        let top = rows.iter().copied().chain([sy]).min().unwrap_or(sy);
        let bottom = rows.iter().copied().chain([sy]).max().unwrap_or(sy);
        let trunk = if top < bottom {
            props
                .add_segment(Some(&root), Point::new(channel, top), Point::new(channel, bottom))
                .ok()
        } else {
            None
        };
        let trunk = trunk.unwrap_or_else(|| root.clone());

        for (link, (tx, ty)) in targets {
            let (tx, ty) = (tx as i32 * 2, ty as i32 * 2);
            let branch = if tx > sx {
                props.add_segment(Some(&trunk), Point::new(channel, ty), Point::new(tx - 1, ty))
            } else {
                let gutter = ty - 1;
                props
                    .add_segment(
                        Some(&trunk),
                        Point::new(channel, gutter),
                        Point::new(tx - 1, gutter),
                    )
                    .and_then(|run| {
                        props.add_segment(
                            Some(&run),
                            Point::new(tx - 1, gutter),
                            Point::new(tx - 1, ty),
                        )
                    })
            };
            let parent = branch.unwrap_or_else(|_| trunk.clone());
            if props.add_end_drop(link, Some(&parent)).is_err() {
                tracing::warn!(link = %link, "duplicate end drop skipped");
            }
        }
        trees.insert(source.to_string(), props);
    }
    trees
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (LinkProperties, String, String, String) {
        let mut props = LinkProperties::new("a");
        let root = props
            .add_segment(None, Point::new(0, 0), Point::new(1, 0))
            .unwrap();
        let trunk = props
            .add_segment(Some(&root), Point::new(1, 0), Point::new(1, 4))
            .unwrap();
        let branch = props
            .add_segment(Some(&trunk), Point::new(1, 4), Point::new(3, 4))
            .unwrap();
        props.add_end_drop(&Link::new("a", "b"), Some(&branch)).unwrap();
        props.add_end_drop(&Link::new("a", "c"), Some(&trunk)).unwrap();
        (props, root, trunk, branch)
    }

    #[test]
    fn tag_is_ignored_by_equality() {
        let plain = LinkSegmentId::segment("7");
        let tagged = LinkSegmentId::segment("7").tagged(TaggedEnd::End);
        assert_eq!(plain, tagged);
        let set: std::collections::HashSet<LinkSegmentId> = [plain, tagged].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_ne!(LinkSegmentId::end_drop("x"), LinkSegmentId::direct("x"));
    }

    #[test]
    fn inverted_props_index_children_and_paths() {
        let (props, root, trunk, branch) = sample_tree();
        let inverted = InvertedLinkProps::new(&props);
        assert_eq!(inverted.root_segments(), [LinkSegmentId::segment(root.clone())]);
        assert_eq!(
            inverted.children_of(&LinkSegmentId::segment(trunk.clone())),
            [LinkSegmentId::segment(branch.clone())]
        );
        assert_eq!(
            inverted.ascending_path("a->b").unwrap(),
            [
                LinkSegmentId::segment(branch.clone()),
                LinkSegmentId::segment(trunk.clone()),
                LinkSegmentId::segment(root.clone()),
            ]
        );
        assert_eq!(
            inverted.drops_of(&LinkSegmentId::segment(trunk.clone())),
            [LinkSegmentId::end_drop("a->c")]
        );
        assert_eq!(
            inverted.links_through(&trunk),
            BTreeSet::from(["a->b", "a->c"])
        );
        let ids = inverted.segment_ids_for_link("a->c");
        assert_eq!(ids.first().and_then(|id| id.tagged_end()), Some(TaggedEnd::End));
        assert_eq!(ids.last(), Some(&LinkSegmentId::start_drop()));
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn removed_segments_forward_to_survivors() {
        let (mut props, root, trunk, branch) = sample_tree();
        let before = vec![
            LinkSegmentId::segment(branch.clone()),
            LinkSegmentId::segment(trunk.clone()).tagged(TaggedEnd::Start),
        ];
        props.remove_segment(&trunk).unwrap();
        props.remove_segment(&branch).unwrap();
        assert_eq!(props.segment(&root).map(|s| s.parent.clone()), Some(None));
        assert!(props.drops().all(|drop| drop.parent.as_deref() == Some(root.as_str())));

        let mut inverted = InvertedLinkProps::new(&props);
        let live = inverted.convert_stale_ids(&before);
        assert_eq!(live, vec![LinkSegmentId::segment(root.clone())]);
        assert_eq!(live[0].tagged_end(), None);
    }

    #[test]
    fn removing_the_only_segment_makes_links_direct() {
        let mut props = LinkProperties::new("a");
        let root = props
            .add_segment(None, Point::new(0, 0), Point::new(1, 0))
            .unwrap();
        props.add_end_drop(&Link::new("a", "b"), Some(&root)).unwrap();
        let stale = [LinkSegmentId::end_drop("a->b"), LinkSegmentId::segment(root.clone())];
        props.remove_segment(&root).unwrap();
        let mut inverted = InvertedLinkProps::new(&props);
        assert_eq!(
            inverted.convert_stale_ids(&stale),
            vec![LinkSegmentId::direct("a->b"), LinkSegmentId::start_drop()]
        );
        assert_eq!(
            props.remove_segment(&root),
            Err(BusError::UnknownSegment(root.clone()))
        );
    }

    #[test]
    fn adjacent_single_target_is_direct() {
        let mut grid = Grid::new(3, 2);
        grid.place(0, 0, "a").unwrap();
        grid.place(1, 0, "b").unwrap();
        grid.place(2, 1, "c").unwrap();
        grid.place(0, 1, "d").unwrap();
        let links: BTreeSet<Link> = [Link::new("a", "b"), Link::new("d", "b"), Link::new("d", "c")]
            .into_iter()
            .collect();
        let trees = build_bus_trees(&grid, &links);
        assert!(InvertedLinkProps::new(&trees["a"])
            .target_drop("a->b")
            .is_some_and(LinkSegmentId::is_direct));
        let d_tree = InvertedLinkProps::new(&trees["d"]);
        assert_eq!(d_tree.segment_ids_for_link("d->c").len(), 5);
    }

    #[test]
    fn feedback_target_is_fed_from_the_channel_left_of_it() {
        let mut grid = Grid::new(3, 2);
        grid.place(1, 0, "s").unwrap();
        grid.place(0, 1, "t").unwrap();
        grid.place(2, 0, "u").unwrap();
        let links: BTreeSet<Link> = [Link::new("s", "t"), Link::new("s", "u")]
            .into_iter()
            .collect();
        let tree = &build_bus_trees(&grid, &links)["s"];
        let drop = tree
            .drops()
            .find(|drop| drop.link_id == "s->t")
            .unwrap();
        let feed = tree.segment(drop.parent.as_deref().unwrap()).unwrap();
        assert_eq!(feed.start, Point::new(-1, 1));
        assert_eq!(feed.end, Point::new(-1, 2));
        let run = tree.segment(feed.parent.as_deref().unwrap()).unwrap();
        assert_eq!(run.start, Point::new(3, 1));
        assert_eq!(run.end, Point::new(-1, 1));
        // Nothing but the stub touches a cell row on the source's side.
        for segment in tree.segments() {
            let horizontal = segment.start.y == segment.end.y;
            if horizontal && segment.start.y % 2 == 0 {
                assert!(segment.start.x.min(segment.end.x) >= 2, "{segment:?}");
            }
        }
    }
}
