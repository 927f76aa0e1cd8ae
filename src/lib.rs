#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod pipeline;

#[cfg(feature = "cli")]
pub use cli::run;
pub use color::{ColorAssigner, ColorIssues, ColorStatus, Palette};
pub use config::{Config, LayoutOptions, load_config};
pub use ir::{Link, Network};
pub use layout::{Grid, RectangularTreeEngine};
pub use parser::parse_network;
pub use pipeline::lay_out;
