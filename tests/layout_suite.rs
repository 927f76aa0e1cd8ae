use std::collections::BTreeSet;
use std::path::Path;

use grn_layout::color::{ColorStatus, LinkPlacementGrid};
use grn_layout::config::Config;
use grn_layout::layout::{Point, RectangularTreeEngine, squash_sort};
use grn_layout::parser::{ParseOutput, parse_network};
use grn_layout::pipeline::{LayoutRun, effective_config, lay_out};
use grn_layout::{Grid, Link, Network};

const FIXTURES: [&str; 6] = [
    "core_left.grn",
    "dense.grn",
    "fan_out.grn",
    "feedback.grn",
    "legacy_colors.grn",
    "seeded.grn",
];

fn run_fixture(name: &str) -> (ParseOutput, Config, LayoutRun) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    let parsed = parse_network(&input).expect("parse failed");
    let config = effective_config(Config::default(), &parsed).expect("init config failed");
    let run = lay_out(&parsed, &config).expect("layout failed");
    (parsed, config, run)
}

fn column_contents(grid: &Grid) -> Vec<Vec<&str>> {
    (0..grid.width()).map(|x| grid.column(x)).collect()
}

#[test]
fn every_fixture_places_each_node_once() {
    for name in FIXTURES {
        let (parsed, _, run) = run_fixture(name);
        let mut seen = BTreeSet::new();
        for column in column_contents(&run.grid) {
            for id in column {
                assert!(seen.insert(id), "{name}: {id} placed twice");
            }
        }
        let expected: BTreeSet<&str> = parsed
            .network
            .nodes
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(seen, expected, "{name}: placed set differs");
    }
}

#[test]
fn every_fixture_colors_its_sources_without_silent_collisions() {
    for name in FIXTURES {
        let (parsed, _, run) = run_fixture(name);
        let placement = LinkPlacementGrid::new(&run.grid, &parsed.network);
        for link in placement.links() {
            assert!(
                run.colors.link_color(link).is_some(),
                "{name}: {link} has no color"
            );
        }
        for (one, two) in placement.crossings() {
            if run.colors.link_color(one) == run.colors.link_color(two) {
                assert!(!run.issues.is_ok(), "{name}: {one} and {two} collide unreported");
            }
        }
    }
}

#[test]
fn cyclic_network_gets_a_layer_for_every_node() {
    let (parsed, _, run) = run_fixture("feedback.grn");
    let topo = run.grid.topo_map();
    for id in &parsed.network.nodes {
        assert!(topo.contains_key(id), "{id} missing from topo map");
    }
    let (a, _) = run.grid.position_of("a").expect("a placed");
    let (d, _) = run.grid.position_of("d").expect("d placed");
    assert!(a < d);
}

#[test]
fn hub_is_centered_on_its_targets() {
    let (_, _, run) = run_fixture("fan_out.grn");
    assert_eq!(run.grid.position_of("hub"), Some((0, 1)));
    assert_eq!(run.grid.column(1), vec!["t1", "t2", "t3", "t4"]);
    assert_eq!(run.buses["hub"].drops().count(), 4);
}

#[test]
fn coffman_graham_respects_layer_width() {
    let (_, config, run) = run_fixture("dense.grn");
    assert_eq!(config.layout.max_per_layer, 4);
    for (x, column) in column_contents(&run.grid).iter().enumerate() {
        assert!(column.len() <= 4, "column {x} holds {}", column.len());
    }
}

#[test]
fn core_subtree_is_pushed_left() {
    let (_, _, run) = run_fixture("core_left.grn");
    assert_eq!(run.grid.position_of("core").map(|(x, _)| x), Some(0));
    let (k3, _) = run.grid.position_of("k3").expect("k3 placed");
    let (up1, _) = run.grid.position_of("up1").expect("up1 placed");
    assert!(k3 < up1);
}

#[test]
fn seeded_layout_reports_reference_anchor() {
    let (parsed, _, run) = run_fixture("seeded.grn");
    let reference = run.placed.reference().expect("reference anchor");
    assert_eq!(reference.id, "A");
    assert_eq!(reference.point, Point::new(-1, 0));
    assert_eq!(run.placed.column(0), vec!["C", "E", "D"]);

    assert_eq!(run.grid.column(0), vec!["A", "B"]);
    assert_eq!(run.grid.column(1), vec!["C", "E", "D"]);
    for (src, trg) in [("A", "C"), ("A", "E"), ("B", "D")] {
        let link = Link::new(src, trg);
        assert!(run.colors.link_color(&link).is_some(), "{link} has no color");
    }
    let dump = run.dump(&parsed);
    assert_eq!(dump.nodes.len(), 5);
    assert_eq!(dump.links.len(), 3);
}

#[test]
fn incremental_colors_keep_uncontested_legacy_colors() {
    let (_, _, run) = run_fixture("legacy_colors.grn");
    assert_eq!(run.colors.node_color("s3"), Some("EX-green"));
    assert!(run.colors.node_color("s1").is_some());
    assert!(run.colors.node_color("s2").is_some());
    assert!(!run.issues.status.contains(ColorStatus::COLOR_COLLISION));
}

#[test]
fn strip_layout_places_targets_after_their_source() {
    let mut network = Network::new();
    network.add_link("n1", "n2");
    network.ensure_node("n3", None);
    let nodes: BTreeSet<String> = ["n1", "n2", "n3"].iter().map(|s| s.to_string()).collect();
    let engine = RectangularTreeEngine::default();
    let first = engine.layout(&nodes, &network, true);
    assert_eq!(first, vec!["n1", "n2", "n3"]);
    assert_eq!(first, engine.layout(&nodes, &network, true));
}

#[test]
fn squashed_columns_never_exceed_capacity() {
    let column: Vec<String> = (0..17).map(|i| format!("n{i:02}")).collect();
    for max_rows in 1..=6 {
        let squashed = squash_sort(&[column.clone()], max_rows);
        assert!(squashed.iter().all(|col| col.len() <= max_rows));
        let flat: Vec<String> = squashed.concat();
        assert_eq!(flat, column, "order lost for max_rows {max_rows}");
    }
}

#[test]
fn repeated_runs_are_identical() {
    for name in FIXTURES {
        let (parsed, config, first) = run_fixture(name);
        let second = lay_out(&parsed, &config).expect("layout failed");
        assert_eq!(first.grid, second.grid, "{name}: grid changed");
        assert_eq!(first.colors, second.colors, "{name}: colors changed");
        let dump_a = first.dump(&parsed).to_json().expect("json");
        let dump_b = second.dump(&parsed).to_json().expect("json");
        assert_eq!(dump_a, dump_b);
    }
}
