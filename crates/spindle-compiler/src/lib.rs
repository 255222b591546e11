//! Graph-to-assembly compiler for spindle.
//!
//! [`GraphCompiler::compile`] turns a [`Graph`] into assembly text for the
//! target chip in four phases:
//!
//! 1. **Validation** - block types resolve, connections reference real ports
//!    of matching signal kind, each input has at most one driver, parameters
//!    are numeric, and each block's own rules hold. All problems are collected
//!    before returning.
//! 2. **Scheduling** - a topological sort of the dataflow graph. A cycle not
//!    broken by a memory-bearing block is fatal.
//! 3. **Generation** - each block's definition emits IR into a fresh
//!    [`CodegenContext`] in schedule order. The first resource violation
//!    aborts.
//! 4. **Rendering** - sections are concatenated in fixed order. The output is
//!    byte-identical for identical input.
//!
//! Compilation never panics and never returns `Err`: everything that goes
//! wrong is a [`Diagnostic`](spindle_core::Diagnostic) in the
//! [`CompileResult`].
//!
//! # Example
//!
//! ```rust
//! use spindle_compiler::GraphCompiler;
//! use spindle_core::{BlockInstance, CompileOptions, Graph};
//! use spindle_registry::BlockRegistry;
//!
//! let graph = Graph::new("thru")
//!     .with_block(BlockInstance::new("in", "io.adc"))
//!     .with_block(BlockInstance::new("out", "io.dac"))
//!     .with_connection("in", "left", "out", "left");
//!
//! let compiler = GraphCompiler::new(BlockRegistry::builtin());
//! let result = compiler.compile(&graph, &CompileOptions::default());
//! assert!(result.success);
//! assert!(result.assembly.unwrap().contains("wrax\tDACL, 0.0"));
//! ```

mod render;
mod schedule;
mod validate;

use spindle_blocks::BlockEnv;
use spindle_core::{CodegenContext, CompileOptions, DiagnosticKind, Diagnostics, Graph, Location};
use spindle_registry::BlockRegistry;

pub use render::Usage;

/// Outcome of a compile or check.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    /// `true` iff `diagnostics` holds no fatal entry.
    pub success: bool,
    /// Assembly text; `None` on failure and in check mode.
    pub assembly: Option<String>,
    /// Every problem found, in discovery order.
    pub diagnostics: Diagnostics,
    /// Block ids in generation order, once scheduling succeeded.
    pub schedule: Vec<String>,
    /// Resource totals, once generation succeeded.
    pub usage: Option<Usage>,
}

impl CompileResult {
    fn failed(diagnostics: Diagnostics, schedule: Vec<String>) -> Self {
        Self {
            success: false,
            assembly: None,
            diagnostics,
            schedule,
            usage: None,
        }
    }
}

/// Compiles graphs against a block registry.
///
/// Holds only a shared reference to the registry; every call builds its own
/// context, so one compiler may serve concurrent compiles.
#[derive(Clone, Copy)]
pub struct GraphCompiler<'r> {
    registry: &'r BlockRegistry,
}

impl<'r> GraphCompiler<'r> {
    /// Creates a compiler over `registry`.
    pub fn new(registry: &'r BlockRegistry) -> Self {
        Self { registry }
    }

    /// Validates and schedules `graph` without generating code.
    pub fn check(&self, graph: &Graph) -> CompileResult {
        let mut diagnostics = Diagnostics::new();
        let resolved = validate::validate(graph, self.registry, &mut diagnostics);
        if diagnostics.has_fatal() {
            return CompileResult::failed(diagnostics, Vec::new());
        }
        let ids: Vec<&str> = resolved.iter().map(|b| b.instance.id.as_str()).collect();
        match self.order(graph, &resolved, &ids, &mut diagnostics) {
            Some(order) => CompileResult {
                success: true,
                assembly: None,
                diagnostics,
                schedule: order.iter().map(|&i| ids[i].to_string()).collect(),
                usage: None,
            },
            None => CompileResult::failed(diagnostics, Vec::new()),
        }
    }

    /// Compiles `graph` into assembly text.
    pub fn compile(&self, graph: &Graph, options: &CompileOptions) -> CompileResult {
        let mut diagnostics = Diagnostics::new();

        // 1. Validation
        let resolved = validate::validate(graph, self.registry, &mut diagnostics);
        if diagnostics.has_fatal() {
            tracing::debug!(errors = diagnostics.fatal_count(), "validation failed");
            return CompileResult::failed(diagnostics, Vec::new());
        }

        // 2. Scheduling
        let ids: Vec<&str> = resolved.iter().map(|b| b.instance.id.as_str()).collect();
        let Some(order) = self.order(graph, &resolved, &ids, &mut diagnostics) else {
            return CompileResult::failed(diagnostics, Vec::new());
        };
        let schedule: Vec<String> = order.iter().map(|&i| ids[i].to_string()).collect();
        tracing::debug!(order = ?schedule, "schedule");

        // 3. Generation
        let mut ctx = CodegenContext::new(graph, *options);
        for &i in &order {
            let block = &resolved[i];
            let id = block.instance.id.as_str();
            ctx.begin_block(id);
            let env = BlockEnv::new(id, &block.params);
            if let Err(e) = block.definition.generate(&env, &mut ctx) {
                diagnostics.push(e.to_diagnostic(id));
                if e.is_resource() {
                    tracing::debug!(block = id, "generation aborted: {e}");
                    return CompileResult::failed(diagnostics, schedule);
                }
            }
        }
        if diagnostics.has_fatal() {
            return CompileResult::failed(diagnostics, schedule);
        }

        let init_end = if ctx.has_init_code() {
            ctx.unique_label("init_end")
        } else {
            String::new()
        };
        let program = ctx.finish();
        diagnostics.extend(program.warnings.iter().cloned());

        let usage = Usage {
            registers: (program.registers_used, options.register_count),
            memory: (program.memory_used, options.memory_size),
            instructions: (program.instruction_count, options.program_size),
        };
        tracing::debug!(
            registers = usage.registers.0,
            memory = usage.memory.0,
            instructions = usage.instructions.0,
            "generated"
        );

        // 4. Rendering
        let assembly = render::render(&graph.metadata, &program, usage, &init_end);
        CompileResult {
            success: !diagnostics.has_fatal(),
            assembly: Some(assembly),
            diagnostics,
            schedule,
            usage: Some(usage),
        }
    }

    fn order(
        &self,
        graph: &Graph,
        resolved: &[validate::ResolvedBlock<'_>],
        ids: &[&str],
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<usize>> {
        let memory_bearing = |id: &str| {
            resolved
                .iter()
                .any(|b| b.instance.id == id && b.definition.is_memory_bearing())
        };
        match schedule::schedule(graph, ids, memory_bearing) {
            Ok(order) => Some(order),
            Err(cycle) => {
                let names: Vec<String> = cycle.blocks.iter().map(|b| format!("'{b}'")).collect();
                let location = cycle
                    .blocks
                    .first()
                    .map_or(Location::Program, |b| Location::Block(b.clone()));
                diagnostics.fatal(
                    DiagnosticKind::GraphValidation,
                    location,
                    format!(
                        "dataflow cycle detected through {}; route feedback through a delay block",
                        names.join(", ")
                    ),
                );
                None
            }
        }
    }
}

/// Compiles with the process-wide built-in registry.
pub fn compile(graph: &Graph, options: &CompileOptions) -> CompileResult {
    GraphCompiler::new(BlockRegistry::builtin()).compile(graph, options)
}
