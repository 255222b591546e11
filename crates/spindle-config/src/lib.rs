//! Project configuration and file loading for spindle.
//!
//! The compiler and assembler work on in-memory values and never touch the
//! filesystem. This crate is the boundary: it reads `spindle.toml`, graph
//! documents and template directories, and reports failures as
//! [`ConfigError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use spindle_config::{ProjectConfig, build_registry, load_graph};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let config = ProjectConfig::discover(None, &cwd).unwrap();
//! let registry = build_registry(&config, true).unwrap();
//! let graph = load_graph("patch.json").unwrap();
//! println!("{} blocks, {} known types", graph.blocks.len(), registry.len());
//! ```

mod error;
mod loader;
mod project;

/// Platform-specific paths and project file discovery.
pub mod paths;

pub use error::ConfigError;
pub use loader::{build_registry, load_graph, load_template_dir};
pub use paths::{
    CONFIG_FILE_NAME, find_config, list_templates_in_dir, user_config_dir, user_templates_dir,
};
pub use project::ProjectConfig;
