use crate::ir::Network;
use crate::layout::{CoreAnchor, CorePush, Grid};
use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static INIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%\{\s*init\s*:\s*(\{.*\})\s*\}%%").unwrap());
static NODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^node\s+(?P<id>[\w.:-]+)(?:\s+"(?P<name>[^"]*)")?$"#).unwrap()
});
static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^color\s+(?P<id>[\w.:-]+(?:->[\w.:-]+)?)\s+(?P<color>[\w-]+)$").unwrap()
});
static CORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^core\s+(?P<id>[\w.:-]+)(?:\s+(?P<push>left|right|stay))?$").unwrap()
});
static AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^at\s+(?P<id>[\w.:-]+)\s+(?P<x>\d+)\s+(?P<y>\d+)$").unwrap()
});
static CHAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.:-]+(?:\s*->\s*[\w.:-]+)+$").unwrap());

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub network: Network,
    /// Legacy colors keyed by node ID or link ID (`src->trg`).
    pub colors: BTreeMap<String, String>,
    pub core: Option<CoreAnchor>,
    /// Cells from a previous layout, `(id, column, row)`.
    pub seed: Vec<(String, usize, usize)>,
    /// Raw `%%{init: ...}%%` payload.
    pub init_config: Option<String>,
}

impl ParseOutput {
    /// Grid holding the `at` cells, if any were given.
    pub fn seed_grid(&self) -> Result<Option<Grid>> {
        if self.seed.is_empty() {
            return Ok(None);
        }
        let width = self.seed.iter().map(|(_, x, _)| x + 1).max().unwrap_or(0);
        let height = self.seed.iter().map(|(_, _, y)| y + 1).max().unwrap_or(0);
        let mut grid = Grid::new(width, height);
        for (id, x, y) in &self.seed {
            grid.place(*x, *y, id)?;
        }
        Ok(Some(grid))
    }
}

/// Parses the line-oriented network format:
///
/// ```text
/// %%{init: {layout: {layering: 'coffmanGraham'}}}%%
/// node gata1 "GATA-1"
/// gata1 -> pu1 -> spi1
/// color gata1 EX-red
/// core gata1 left
/// at gata1 0 0
/// ```
pub fn parse_network(input: &str) -> Result<ParseOutput> {
    let mut output = ParseOutput::default();
    for (idx, raw_line) in input.lines().enumerate() {
        let trimmed_line = raw_line.trim();
        if trimmed_line.is_empty() {
            continue;
        }
        if let Some(caps) = INIT_RE.captures(trimmed_line) {
            if let Some(json_str) = caps.get(1).map(|m| m.as_str()) {
                output.init_config = Some(json_str.to_string());
            }
            continue;
        }
        if trimmed_line.starts_with("%%") {
            continue;
        }
        let line = strip_trailing_comment(trimmed_line);
        if line.is_empty() {
            continue;
        }
        parse_line(line, &mut output).map_err(|err| anyhow!("line {}: {err}", idx + 1))?;
    }
    Ok(output)
}

fn parse_line(line: &str, output: &mut ParseOutput) -> Result<()> {
    if let Some(caps) = NODE_RE.captures(line) {
        let name = caps.name("name").map(|m| m.as_str().to_string());
        output.network.ensure_node(&caps["id"], name);
        return Ok(());
    }
    if let Some(caps) = COLOR_RE.captures(line) {
        output
            .colors
            .insert(caps["id"].to_string(), caps["color"].to_string());
        return Ok(());
    }
    if let Some(caps) = CORE_RE.captures(line) {
        let push = match caps.name("push").map(|m| m.as_str()) {
            Some("left") => CorePush::Left,
            Some("right") => CorePush::Right,
            _ => CorePush::Stay,
        };
        output.core = Some(CoreAnchor {
            id: caps["id"].to_string(),
            push,
        });
        return Ok(());
    }
    if let Some(caps) = AT_RE.captures(line) {
        let x: usize = caps["x"].parse()?;
        let y: usize = caps["y"].parse()?;
        let id = caps["id"].to_string();
        output.network.ensure_node(&id, None);
        output.seed.push((id, x, y));
        return Ok(());
    }
    if CHAIN_RE.is_match(line) {
        let ids: Vec<&str> = line.split("->").map(str::trim).collect();
        for pair in ids.windows(2) {
            output.network.add_link(pair[0], pair[1]);
        }
        return Ok(());
    }
    Err(anyhow!("unrecognized statement `{line}`"))
}

fn strip_trailing_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(pos) => line[..pos].trim_end(),
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Link;

    #[test]
    fn parse_nodes_links_and_names() {
        let input = "node a \"Alpha\"\na -> b -> c\nd -> c %% trailing";
        let parsed = parse_network(input).unwrap();
        assert_eq!(parsed.network.nodes.len(), 4);
        assert_eq!(parsed.network.links.len(), 3);
        assert!(parsed.network.links.contains(&Link::new("b", "c")));
        assert_eq!(parsed.network.name_of("a"), Some("Alpha"));
    }

    #[test]
    fn parse_colors_core_and_seed() {
        let input = "a -> b\ncolor a EX-red\ncolor a->b EX-blue\ncore a right\nat a 2 1";
        let parsed = parse_network(input).unwrap();
        assert_eq!(parsed.colors["a"], "EX-red");
        assert_eq!(parsed.colors["a->b"], "EX-blue");
        assert_eq!(
            parsed.core,
            Some(CoreAnchor {
                id: "a".to_string(),
                push: CorePush::Right,
            })
        );
        let seed = parsed.seed_grid().unwrap().unwrap();
        assert_eq!(seed.position_of("a"), Some((2, 1)));
        assert_eq!((seed.width(), seed.height()), (3, 2));
    }

    #[test]
    fn init_directive_is_captured() {
        let input = "%%{init: {layout: {maxPerLayer: 2}}}%%\n%% comment\na -> b";
        let parsed = parse_network(input).unwrap();
        assert_eq!(parsed.init_config.as_deref(), Some("{layout: {maxPerLayer: 2}}"));
        assert_eq!(parsed.network.links.len(), 1);
    }

    #[test]
    fn bad_statement_reports_line_number() {
        let err = parse_network("a -> b\nwhat is this").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"));
    }

    #[test]
    fn duplicate_seed_cell_is_an_error() {
        let parsed = parse_network("at a 0 0\nat a 1 0").unwrap();
        assert!(parsed.seed_grid().is_err());
    }
}
