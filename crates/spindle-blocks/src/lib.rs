//! Block definitions for spindle.
//!
//! A block definition is the code generation contract for one block type. It
//! comes in exactly two variants:
//!
//! - [`FixedBlock`] - written in Rust against the [`CodegenContext`] API
//!   (ADC, DAC, pots, mixer, delay; see [`builtin`]).
//! - [`TemplateBlock`] - loaded from a template file whose body is assembly
//!   text with typed `${...}` placeholders (see [`template`]).
//!
//! Both satisfy the same contract through [`BlockDefinition`]: `validate`
//! against the graph before anything is generated, then `generate` against the
//! shared context in schedule order.
//!
//! # Example
//!
//! ```rust
//! use spindle_blocks::{BlockDefinition, BlockEnv, TemplateBlock};
//! use spindle_core::{CodegenContext, CompileOptions, Graph, Section};
//!
//! let text = "type = \"demo.clear\"\nname = \"Clear\"\ncategory = \"math\"\n---\nclr\n";
//! let def = BlockDefinition::Template(TemplateBlock::parse(text).unwrap());
//!
//! let graph = Graph::new("demo");
//! let mut ctx = CodegenContext::new(&graph, CompileOptions::default());
//! let params = def.info().default_params();
//! def.generate(&BlockEnv::new("c", &params), &mut ctx).unwrap();
//! assert_eq!(ctx.section(Section::Main).len(), 1);
//! ```

use std::collections::BTreeMap;

use spindle_core::{BlockInstance, CodegenContext, Graph};

pub mod builtin;
pub mod error;
pub mod info;
pub mod template;

pub use builtin::{FixedBlock, fixed_blocks};
pub use error::{GenerateError, TemplateError};
pub use info::{BlockCategory, BlockInfo};
pub use template::TemplateBlock;

/// What a block sees while generating: its id and resolved parameters.
#[derive(Debug, Clone, Copy)]
pub struct BlockEnv<'a> {
    /// Block instance id.
    pub id: &'a str,
    /// Every declared parameter, defaulted and clamped by the compiler.
    pub params: &'a BTreeMap<String, f64>,
}

impl<'a> BlockEnv<'a> {
    /// Creates an environment.
    pub fn new(id: &'a str, params: &'a BTreeMap<String, f64>) -> Self {
        Self { id, params }
    }

    /// Value of a parameter; zero if absent.
    pub fn param(&self, id: &str) -> f64 {
        self.params.get(id).copied().unwrap_or(0.0)
    }
}

/// A registered block type.
#[derive(Debug, Clone)]
pub enum BlockDefinition {
    /// Hand-written code generation.
    Fixed(FixedBlock),
    /// Template-driven code generation.
    Template(TemplateBlock),
}

impl BlockDefinition {
    /// Block metadata.
    pub fn info(&self) -> &BlockInfo {
        match self {
            BlockDefinition::Fixed(b) => b.info(),
            BlockDefinition::Template(t) => t.info(),
        }
    }

    /// Type identifier.
    pub fn type_id(&self) -> &str {
        &self.info().type_id
    }

    /// Returns `true` if the block reads and writes delay memory.
    pub fn is_memory_bearing(&self) -> bool {
        self.info().memory_bearing
    }

    /// Returns `true` for template-backed definitions.
    pub fn is_template(&self) -> bool {
        matches!(self, BlockDefinition::Template(_))
    }

    /// Reasons `block` cannot be compiled in `graph`; empty when it can.
    ///
    /// Checks required inputs, then any block-specific rule.
    pub fn validate(&self, block: &BlockInstance, graph: &Graph) -> Vec<String> {
        let mut problems: Vec<String> = self
            .info()
            .inputs
            .iter()
            .filter(|p| p.required && !graph.is_input_connected(&block.id, &p.id))
            .map(|p| format!("required input '{}' is not connected", p.id))
            .collect();
        if let BlockDefinition::Fixed(fixed) = self {
            if let Err(message) = fixed.validate(block, graph) {
                problems.push(message);
            }
        }
        problems
    }

    /// Generates code for one instance into `ctx`.
    pub fn generate(&self, env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
        tracing::trace!(block = env.id, type_id = self.type_id(), "generate");
        match self {
            BlockDefinition::Fixed(b) => b.generate(env, ctx),
            BlockDefinition::Template(t) => t.generate(env, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEEDS_INPUT: &str = r#"
type = "t.needs"
name = "Needs"
category = "math"

[[inputs]]
id = "in"
required = true

[[outputs]]
id = "out"
---
rdax ${input.in}, 1.0
wrax ${output.out}, 0.0
"#;

    #[test]
    fn required_inputs_are_validated() {
        let def = BlockDefinition::Template(TemplateBlock::parse(NEEDS_INPUT).unwrap());
        let g = Graph::new("t").with_block(BlockInstance::new("n", "t.needs"));
        let problems = def.validate(&g.blocks[0], &g);
        assert_eq!(problems, ["required input 'in' is not connected"]);
    }

    #[test]
    fn fixed_validation_is_included() {
        let dac = fixed_blocks()
            .into_iter()
            .find(|b| b.info().type_id == "io.dac")
            .map(BlockDefinition::Fixed)
            .unwrap();
        let g = Graph::new("t").with_block(BlockInstance::new("d", "io.dac"));
        assert_eq!(dac.validate(&g.blocks[0], &g).len(), 1);
        assert!(!dac.is_memory_bearing());
        assert!(!dac.is_template());
    }

    #[test]
    fn env_params_default_to_zero() {
        let params = BTreeMap::from([("gain".to_string(), 0.25)]);
        let env = BlockEnv::new("b", &params);
        assert_eq!(env.param("gain"), 0.25);
        assert_eq!(env.param("missing"), 0.0);
    }
}
