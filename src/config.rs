use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_PALETTE: [(&str, &str); 12] = [
    ("EX-red", "#DC143C"),
    ("EX-blue", "#1E64C8"),
    ("EX-green", "#00A03C"),
    ("EX-orange", "#FF8C00"),
    ("EX-purple", "#8A2BE2"),
    ("EX-cyan", "#00AAB4"),
    ("EX-magenta", "#C8148C"),
    ("EX-dark-green", "#006428"),
    ("EX-brown", "#8B4513"),
    ("EX-pale-blue", "#6496E6"),
    ("EX-yellow-orange", "#E6B400"),
    ("EX-slate", "#506478"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayeringMethod {
    CoffmanGraham,
    ModCoffmanGraham,
    AdHoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirstPass {
    Sequential,
    Recursive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub first_pass: FirstPass,
    pub topo_compress: bool,
    pub layering: LayeringMethod,
    pub max_per_layer: usize,
    pub crossing_reduction: bool,
    pub normalize_rows: bool,
    pub incremental: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            first_pass: FirstPass::Recursive,
            topo_compress: false,
            layering: LayeringMethod::AdHoc,
            max_per_layer: 8,
            crossing_reduction: true,
            normalize_rows: true,
            incremental: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    pub colors: Vec<NamedColor>,
    pub black: String,
    pub white: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE
                .iter()
                .map(|(name, hex)| NamedColor {
                    name: name.to_string(),
                    hex: hex.to_string(),
                })
                .collect(),
            black: "black".to_string(),
            white: "white".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    pub keep_colors: bool,
    pub incremental: bool,
    pub palette: PaletteConfig,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            keep_colors: false,
            incremental: false,
            palette: PaletteConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutOptions,
    pub color: ColorConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LayoutConfigFile {
    first_pass: Option<FirstPass>,
    topo_compress: Option<bool>,
    layering: Option<LayeringMethod>,
    max_per_layer: Option<usize>,
    crossing_reduction: Option<bool>,
    normalize_rows: Option<bool>,
    incremental: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaletteConfigFile {
    colors: Option<Vec<NamedColor>>,
    black: Option<String>,
    white: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ColorConfigFile {
    keep_colors: Option<bool>,
    incremental: Option<bool>,
    palette: Option<PaletteConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    color: Option<ColorConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    Ok(merge_config_file(config, parsed))
}

/// Parses a `%%{init: ...}%%` payload (JSON5) and merges it over `config`.
pub fn merge_init_config(config: Config, init: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(init)?;
    Ok(merge_config_file(config, parsed))
}

pub(crate) fn merge_config_file(mut config: Config, parsed: ConfigFile) -> Config {
    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.first_pass {
            config.layout.first_pass = v;
        }
        if let Some(v) = layout.topo_compress {
            config.layout.topo_compress = v;
        }
        if let Some(v) = layout.layering {
            config.layout.layering = v;
        }
        if let Some(v) = layout.max_per_layer {
            config.layout.max_per_layer = v;
        }
        if let Some(v) = layout.crossing_reduction {
            config.layout.crossing_reduction = v;
        }
        if let Some(v) = layout.normalize_rows {
            config.layout.normalize_rows = v;
        }
        if let Some(v) = layout.incremental {
            config.layout.incremental = v;
        }
    }

    if let Some(color) = parsed.color {
        if let Some(v) = color.keep_colors {
            config.color.keep_colors = v;
        }
        if let Some(v) = color.incremental {
            config.color.incremental = v;
        }
        if let Some(palette) = color.palette {
            if let Some(v) = palette.colors {
                config.color.palette.colors = v;
            }
            if let Some(v) = palette.black {
                config.color.palette.black = v;
            }
            if let Some(v) = palette.white {
                config.color.palette.white = v;
            }
        }
    }

    config
}
