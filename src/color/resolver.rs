use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PaletteConfig;

use super::ColorError;

static HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// Named-color lookup used by the color assigner.
pub trait ColorResolver {
    fn palette_size(&self) -> usize;

    /// Name of the `index`th distinct palette color.
    fn palette_color(&self, index: usize) -> Option<&str>;

    fn is_known(&self, name: &str) -> bool;

    /// Sentinel used when the palette runs dry.
    fn black(&self) -> &str;

    /// Sentinel never handed out as a link color.
    fn white(&self) -> &str;

    fn hex_for(&self, name: &str) -> Option<&str>;

    /// `candidates` ordered least-used first; ties keep palette order.
    fn rarest_colors(&self, candidates: &[String], usage: &BTreeMap<String, usize>) -> Vec<String> {
        let index_of = |name: &str| {
            (0..self.palette_size())
                .position(|idx| self.palette_color(idx) == Some(name))
                .unwrap_or(usize::MAX)
        };
        let mut ordered: Vec<String> = candidates.to_vec();
        ordered.sort_by_key(|name| {
            (
                usage.get(name).copied().unwrap_or(0),
                index_of(name),
                name.clone(),
            )
        });
        ordered.dedup();
        ordered
    }
}

/// Palette built from configuration.
#[derive(Debug, Clone)]
pub struct Palette {
    names: Vec<String>,
    hex: HashMap<String, String>,
    black: String,
    white: String,
}

impl Palette {
    pub fn from_config(config: &PaletteConfig) -> Result<Self, ColorError> {
        let mut names = Vec::with_capacity(config.colors.len());
        let mut seen = BTreeSet::new();
        let mut hex = HashMap::new();
        for color in &config.colors {
            if !HEX_RE.is_match(&color.hex) {
                return Err(ColorError::InvalidPalette(format!(
                    "color {} has malformed hex value {}",
                    color.name, color.hex
                )));
            }
            if !seen.insert(color.name.as_str()) {
                return Err(ColorError::InvalidPalette(format!(
                    "color {} is listed twice",
                    color.name
                )));
            }
            names.push(color.name.clone());
            hex.insert(color.name.clone(), color.hex.to_ascii_lowercase());
        }
        if seen.contains(config.black.as_str()) || seen.contains(config.white.as_str()) {
            return Err(ColorError::InvalidPalette(
                "black and white sentinels cannot be palette colors".to_string(),
            ));
        }
        hex.insert(config.black.clone(), "#000000".to_string());
        hex.insert(config.white.clone(), "#ffffff".to_string());
        Ok(Self {
            names,
            hex,
            black: config.black.clone(),
            white: config.white.clone(),
        })
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&PaletteConfig::default()).unwrap_or_else(|_| Self {
            names: Vec::new(),
            hex: HashMap::new(),
            black: "black".to_string(),
            white: "white".to_string(),
        })
    }
}

impl ColorResolver for Palette {
    fn palette_size(&self) -> usize {
        self.names.len()
    }

    fn palette_color(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn is_known(&self, name: &str) -> bool {
        self.hex.contains_key(name)
    }

    fn black(&self) -> &str {
        &self.black
    }

    fn white(&self) -> &str {
        &self.white
    }

    fn hex_for(&self, name: &str) -> Option<&str> {
        self.hex.get(name).map(String::as_str)
    }
}
