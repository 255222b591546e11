//! Graph documents and template directories.

use std::path::Path;

use spindle_core::Graph;
use spindle_registry::BlockRegistry;

use crate::paths::{list_templates_in_dir, user_templates_dir};
use crate::{ConfigError, ProjectConfig};

/// Reads a JSON graph document.
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    Graph::from_json(&content).map_err(|source| ConfigError::GraphParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Registers every `*.blk` file in `dir`. Returns how many were added.
pub fn load_template_dir(registry: &mut BlockRegistry, dir: &Path) -> Result<usize, ConfigError> {
    let files = list_templates_in_dir(dir)?;
    for file in &files {
        let text = std::fs::read_to_string(file).map_err(|e| ConfigError::read_file(file, e))?;
        registry
            .register_template_text(&text, &file.display().to_string())
            .map_err(|source| ConfigError::Template {
                path: file.clone(),
                source,
            })?;
    }
    tracing::debug!(dir = %dir.display(), templates = files.len(), "loaded template directory");
    Ok(files.len())
}

/// Builds the registry for a run: built-ins, then the user template
/// directory (if it exists), then the project's template directories.
///
/// The result is meant to be frozen behind a shared reference afterwards.
pub fn build_registry(config: &ProjectConfig, include_user_dir: bool) -> Result<BlockRegistry, ConfigError> {
    let mut registry = BlockRegistry::new();
    if include_user_dir {
        let user_dir = user_templates_dir();
        if user_dir.is_dir() {
            load_template_dir(&mut registry, &user_dir)?;
        }
    }
    for dir in config.resolved_template_dirs() {
        load_template_dir(&mut registry, &dir)?;
    }
    Ok(registry)
}
