//! `spindle.toml` project configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spindle_asm::AssemblerOptions;
use spindle_core::CompileOptions;

use crate::ConfigError;
use crate::paths::find_config;

/// Project-wide settings.
///
/// Every key is optional; a missing file or table falls back to the chip's
/// physical limits and the assembler's default behavior.
///
/// ```toml
/// template_dirs = ["blocks"]
///
/// [compile]
/// register_count = 32
///
/// [assembler]
/// strict = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Extra template directories, relative to the project file.
    pub template_dirs: Vec<PathBuf>,
    /// Compiler resource ceilings.
    pub compile: CompileOptions,
    /// Assembler switches.
    pub assembler: AssemblerOptions,
    /// Directory holding the project file, if loaded from disk.
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let mut config = Self::from_toml(&content)?;
        config.root = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "loaded project config");
        Ok(config)
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::create_dir(parent, e))?;
            }
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Resolve the configuration for a run.
    ///
    /// Uses `explicit` if given, else the nearest `spindle.toml` at or above
    /// `cwd`, else defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match find_config(cwd) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Template directories with relative entries resolved against the
    /// project root.
    pub fn resolved_template_dirs(&self) -> Vec<PathBuf> {
        self.template_dirs
            .iter()
            .map(|dir| match &self.root {
                Some(root) if dir.is_relative() => root.join(dir),
                _ => dir.clone(),
            })
            .collect()
    }
}
