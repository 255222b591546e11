//! Block registry for spindle.
//!
//! This crate maps block type ids to [`BlockDefinition`]s. A registry starts
//! with every built-in block: the fixed-logic blocks from
//! [`spindle_blocks::builtin`] plus the template pack bundled from this
//! crate's `templates/` directory. User templates may be added while the
//! registry is still being built; after that it is shared read-only.
//!
//! # Features
//!
//! - **Block Discovery**: List all available blocks with metadata
//! - **Category System**: Blocks organized by category (io, math, filter, ...)
//! - **Process-wide default**: [`BlockRegistry::builtin`] is built once and
//!   shared by every compile
//!
//! # Example
//!
//! ```rust
//! use spindle_registry::BlockRegistry;
//! use spindle_blocks::BlockCategory;
//!
//! let registry = BlockRegistry::builtin();
//!
//! let gain = registry.get("math.gain").unwrap();
//! assert!(gain.is_template());
//!
//! for block in registry.blocks_in_category(BlockCategory::Io) {
//!     println!("{}: {}", block.type_id(), block.info().description);
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use spindle_blocks::{BlockCategory, BlockDefinition, TemplateBlock, TemplateError, fixed_blocks};
use thiserror::Error;

/// Template pack compiled into the binary: `(file name, contents)`.
const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    ("gain.blk", include_str!("../templates/gain.blk")),
    ("invert.blk", include_str!("../templates/invert.blk")),
    ("multiply.blk", include_str!("../templates/multiply.blk")),
    ("scale_offset.blk", include_str!("../templates/scale_offset.blk")),
    ("lpf1.blk", include_str!("../templates/lpf1.blk")),
];

/// Errors raised while registering blocks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// Type id already registered
    #[error("block type '{type_id}' is already registered{}", registered_by(.existing))]
    Duplicate {
        /// Colliding type id.
        type_id: String,
        /// Where the existing definition came from, if known.
        existing: Option<String>,
    },

    /// Template text failed to parse
    #[error("template '{source_name}': {error}")]
    Template {
        /// File or bundle name.
        source_name: String,
        /// Parse failure.
        error: TemplateError,
    },
}

fn registered_by(existing: &Option<String>) -> String {
    existing
        .as_deref()
        .map(|s| format!(" by {s}"))
        .unwrap_or_default()
}

/// Registry of all available block types.
pub struct BlockRegistry {
    entries: Vec<BlockDefinition>,
    index: BTreeMap<String, usize>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Create a new registry with all built-in blocks registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for block in fixed_blocks() {
            if let Err(e) = registry.register(BlockDefinition::Fixed(block)) {
                tracing::error!("built-in block rejected: {e}");
            }
        }
        for (name, text) in BUNDLED_TEMPLATES {
            if let Err(e) = registry.register_template_text(text, &format!("builtin:{name}")) {
                tracing::error!("bundled template rejected: {e}");
            }
        }
        tracing::debug!(blocks = registry.len(), "block registry ready");
        registry
    }

    /// Create a registry with no blocks.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// The process-wide registry of built-in blocks.
    ///
    /// Built on first use and never mutated afterwards.
    pub fn builtin() -> &'static BlockRegistry {
        static REGISTRY: OnceLock<BlockRegistry> = OnceLock::new();
        REGISTRY.get_or_init(BlockRegistry::new)
    }

    /// Register a block definition.
    ///
    /// Type ids are unique: a definition whose id is already present,
    /// built-in or not, is rejected.
    pub fn register(&mut self, definition: BlockDefinition) -> Result<(), RegistryError> {
        let type_id = definition.type_id().to_string();
        if let Some(&i) = self.index.get(&type_id) {
            let existing = match &self.entries[i] {
                BlockDefinition::Fixed(_) => Some("built-in block".to_string()),
                BlockDefinition::Template(t) => t.source().map(str::to_string),
            };
            return Err(RegistryError::Duplicate { type_id, existing });
        }
        tracing::trace!(type_id = %type_id, "register block");
        self.index.insert(type_id, self.entries.len());
        self.entries.push(definition);
        Ok(())
    }

    /// Parse template text and register it.
    pub fn register_template_text(&mut self, text: &str, source: &str) -> Result<(), RegistryError> {
        let template = TemplateBlock::parse(text).map_err(|error| RegistryError::Template {
            source_name: source.to_string(),
            error,
        })?;
        self.register(BlockDefinition::Template(template.with_source(source)))
    }

    /// Look up a block type.
    pub fn get(&self, type_id: &str) -> Option<&BlockDefinition> {
        self.index.get(type_id).map(|&i| &self.entries[i])
    }

    /// Returns `true` if the type id is registered.
    pub fn contains(&self, type_id: &str) -> bool {
        self.index.contains_key(type_id)
    }

    /// All blocks in registration order.
    pub fn all_blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.entries.iter()
    }

    /// Blocks in a category, in registration order.
    pub fn blocks_in_category(&self, category: BlockCategory) -> impl Iterator<Item = &BlockDefinition> {
        self.entries
            .iter()
            .filter(move |b| b.info().category == category)
    }

    /// Categories with at least one block, in display order.
    pub fn categories(&self) -> Vec<BlockCategory> {
        BlockCategory::ALL
            .into_iter()
            .filter(|c| self.blocks_in_category(*c).next().is_some())
            .collect()
    }

    /// Number of registered blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no blocks are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_blocks_are_registered() {
        let registry = BlockRegistry::new();
        for id in [
            "io.adc",
            "io.dac",
            "io.pot",
            "mix.mixer",
            "memory.delay",
            "math.gain",
            "math.invert",
            "math.multiply",
            "control.scale_offset",
            "filter.lpf1",
        ] {
            assert!(registry.contains(id), "missing {id}");
        }
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn global_registry_is_shared() {
        let a = BlockRegistry::builtin();
        let b = BlockRegistry::builtin();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn categories_follow_display_order() {
        let registry = BlockRegistry::new();
        assert_eq!(
            registry.categories(),
            [
                BlockCategory::Io,
                BlockCategory::Math,
                BlockCategory::Mix,
                BlockCategory::Memory,
                BlockCategory::Filter,
                BlockCategory::Control,
            ]
        );
        assert_eq!(registry.blocks_in_category(BlockCategory::Io).count(), 3);
    }

    #[test]
    fn collisions_with_builtins_are_rejected() {
        let mut registry = BlockRegistry::new();
        let text = "type = \"io.adc\"\nname = \"Fake\"\ncategory = \"io\"\n---\nclr\n";
        let err = registry.register_template_text(text, "user/fake.blk").unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                type_id: "io.adc".into(),
                existing: Some("built-in block".into())
            }
        );
        assert!(err.to_string().contains("built-in"));
    }

    #[test]
    fn user_templates_extend_the_registry() {
        let mut registry = BlockRegistry::new();
        let text = "type = \"user.clear\"\nname = \"Clear\"\ncategory = \"other\"\n---\nclr\n";
        registry.register_template_text(text, "user/clear.blk").unwrap();
        let def = registry.get("user.clear").unwrap();
        assert!(def.is_template());
        assert_eq!(registry.categories().last(), Some(&BlockCategory::Other));
    }

    #[test]
    fn bad_templates_report_their_source() {
        let mut registry = BlockRegistry::empty();
        let err = registry
            .register_template_text("no separator", "user/bad.blk")
            .unwrap_err();
        assert!(err.to_string().starts_with("template 'user/bad.blk'"));
    }
}
