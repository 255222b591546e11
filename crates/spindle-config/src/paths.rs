//! Platform-specific paths and project file discovery.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/spindle/` (Linux), `~/Library/Application Support/spindle/` (macOS), `%APPDATA%\spindle\` (Windows)
//! - **User templates**: `<user config>/blocks/`
//! - **Project file**: `spindle.toml`, found by walking up from the working directory

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "spindle";

/// Subdirectory name for user block templates.
const TEMPLATES_SUBDIR: &str = "blocks";

/// Project configuration file name.
pub const CONFIG_FILE_NAME: &str = "spindle.toml";

/// File extension of block template files.
pub const TEMPLATE_EXTENSION: &str = "blk";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific block template directory.
pub fn user_templates_dir() -> PathBuf {
    user_config_dir().join(TEMPLATES_SUBDIR)
}

/// Finds the nearest `spindle.toml` in `start` or any of its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Lists `*.blk` files in `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn list_templates_in_dir(dir: &Path) -> Result<Vec<PathBuf>, crate::ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|e| crate::ConfigError::read_dir(dir, e))?;
    let mut templates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION)
        })
        .collect();
    templates.sort();
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn user_templates_dir_ends_with_app_and_subdir() {
        let dir = user_templates_dir();
        assert!(dir.ends_with("spindle/blocks"));
    }

    #[test]
    fn find_config_walks_up() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(find_config(&nested).is_none_or(|found| !found.starts_with(root.path())));

        std::fs::write(root.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            find_config(&nested),
            Some(root.path().join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn lists_only_templates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.blk"), "").unwrap();
        std::fs::write(dir.path().join("a.blk"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub.blk")).unwrap();
        let found = list_templates_in_dir(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a.blk"), dir.path().join("b.blk")]);
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(list_templates_in_dir(&dir.path().join("nope")).is_err());
    }
}
