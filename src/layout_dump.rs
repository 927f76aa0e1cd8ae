use crate::color::{ColorAssignment, ColorIssues, ColorResolver};
use crate::ir::Network;
use crate::layout::{BusSegment, EndDrop, Grid, LinkProperties, Point, ReferenceAnchor};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: usize,
    pub height: usize,
    pub reference: Option<ReferenceAnchor>,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub status: Vec<&'static str>,
    pub collision: Option<[String; 2]>,
    pub buses: Vec<BusDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub name: Option<String>,
    pub column: usize,
    pub row: usize,
    pub layer: Option<usize>,
    pub color: Option<String>,
    pub hex: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkDump {
    pub from: String,
    pub to: String,
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BusDump {
    pub source: String,
    pub segments: Vec<SegmentDump>,
    pub drops: Vec<EndDrop>,
}

#[derive(Debug, Serialize)]
pub struct SegmentDump {
    pub id: String,
    pub parent: Option<String>,
    pub start: [i32; 2],
    pub end: [i32; 2],
}

impl From<&BusSegment> for SegmentDump {
    fn from(segment: &BusSegment) -> Self {
        let point = |p: Point| [p.x, p.y];
        Self {
            id: segment.id.clone(),
            parent: segment.parent.clone(),
            start: point(segment.start),
            end: point(segment.end),
        }
    }
}

impl LayoutDump {
    pub fn from_layout(
        grid: &Grid,
        network: &Network,
        colors: &ColorAssignment,
        issues: &ColorIssues,
        buses: &BTreeMap<String, LinkProperties>,
        resolver: &impl ColorResolver,
    ) -> Self {
        let nodes = grid
            .nodes()
            .map(|(id, (column, row))| {
                let color = colors.node_color(id);
                NodeDump {
                    id: id.to_string(),
                    name: network.name_of(id).map(str::to_string),
                    column,
                    row,
                    layer: grid.topo_map().get(id).copied(),
                    color: color.map(str::to_string),
                    hex: color.and_then(|c| resolver.hex_for(c)).map(str::to_string),
                }
            })
            .collect();

        let links = network
            .links
            .iter()
            .filter(|link| grid.contains(&link.src) && grid.contains(&link.trg))
            .map(|link| LinkDump {
                from: link.src.clone(),
                to: link.trg.clone(),
                color: colors.link_color(link).map(str::to_string),
            })
            .collect();

        let buses = buses
            .values()
            .map(|props| BusDump {
                source: props.source().to_string(),
                segments: props.segments().map(SegmentDump::from).collect(),
                drops: props.drops().cloned().collect(),
            })
            .collect();

        let collision = match (&issues.node_one, &issues.node_two) {
            (Some(one), Some(two)) => Some([one.clone(), two.clone()]),
            _ => None,
        };

        LayoutDump {
            width: grid.width(),
            height: grid.height(),
            reference: grid.reference().cloned(),
            nodes,
            links,
            status: issues.status.names(),
            collision,
            buses,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the dump to `path`, or stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, dump)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}
