//! Spindle Core - chip model and code generation primitives
//!
//! This crate holds everything the graph compiler and the assembler agree on:
//! the target chip's limits and register map, the signed fixed-point operand
//! formats, the serialized graph model, the section-structured IR that block
//! code generation emits, and the per-compile [`CodegenContext`] that hands
//! out registers, delay memory and constants.
//!
//! # Core Abstractions
//!
//! ## Chip
//!
//! - [`chip`] - program size, register file, memory size, register names
//!
//! ## Fixed point
//!
//! - [`FixedFormat`] - S1.14, S.10, S1.9, S4.6 and S.15
//! - [`Quantized`] - a rounded, clamped operand with its raw bits
//!
//! ## Graph
//!
//! - [`Graph`], [`BlockInstance`], [`Connection`] - the document a user edits
//!
//! ## Code generation
//!
//! - [`IrNode`] / [`Section`] - what blocks emit
//! - [`CodegenContext`] - registers, memory, constants, emission
//!
//! ## Diagnostics
//!
//! - [`Diagnostic`] / [`Diagnostics`] - severity, kind and location of every
//!   problem found by the compiler or assembler
//!
//! # Example
//!
//! ```rust
//! use spindle_core::{CodegenContext, CompileOptions, Graph, BlockInstance, Section};
//!
//! let graph = Graph::new("demo")
//!     .with_block(BlockInstance::new("in", "io.adc"))
//!     .with_block(BlockInstance::new("out", "io.dac"))
//!     .with_connection("in", "left", "out", "left");
//!
//! let mut ctx = CodegenContext::new(&graph, CompileOptions::default());
//! let reg = ctx.allocate_register("in", "left").unwrap();
//! assert_eq!(ctx.input_register("out", "left").unwrap(), Some(reg));
//! ctx.instruction(Section::Input, "rdax", &["ADCL", "1.0"]).unwrap();
//! ```

pub mod chip;
pub mod context;
pub mod diagnostic;
pub mod fixed;
pub mod graph;
pub mod ir;
pub mod param_info;

// Re-export main types at crate root
pub use chip::{Channel, RegisterAddr};
pub use context::{
    CodegenContext, CompileOptions, ContextError, GeneratedProgram, MemoryHandle, Register,
    symbol_name,
};
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Location, Severity};
pub use fixed::{FixedFormat, Quantized, format_real};
pub use graph::{BlockInstance, Connection, Graph, GraphMetadata, ParamValue, PortRef};
pub use ir::{Directive, IrNode, IrOp, Section, comment_text};
pub use param_info::{DisplayTransform, ParamDescriptor, PortDescriptor, SignalKind};
