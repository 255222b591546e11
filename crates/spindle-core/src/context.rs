//! Per-compile code generation context.
//!
//! A [`CodegenContext`] lives for exactly one compile call and is owned by the
//! compiler for that call. Every block's code generation receives it
//! explicitly. It holds:
//!
//! - the register table (abstract register ↔ producing `(block, port)`),
//! - the bump-allocated delay memory arena,
//! - the connection index used to resolve an input to its driver's register,
//! - interned constants,
//! - one IR accumulator per [`Section`].
//!
//! # Register allocation
//!
//! Registers are handed out flat and never reused. A register is recorded
//! against the output port that produces it, so every consumer of that port
//! resolves to the same register. Asking for the register of an input whose
//! driver has not generated code yet reserves the driver's register early;
//! when the driver later allocates, it receives the reserved one. This is what
//! lets memory-bearing blocks sit on a feedback loop.
//!
//! # Resource ceilings
//!
//! Exceeding the configured register count, memory size, or program size is a
//! [`ContextError`]; the compiler aborts on the first one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chip;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Location};
use crate::fixed::FixedFormat;
use crate::graph::Graph;
use crate::ir::{IrNode, Section};

/// Resource ceilings for one compile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// General registers available to the program.
    pub register_count: usize,
    /// Instruction slots available to the program.
    pub program_size: usize,
    /// Delay memory words available to the program.
    pub memory_size: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            register_count: chip::REGISTER_COUNT,
            program_size: chip::PROGRAM_SIZE,
            memory_size: chip::MEMORY_SIZE,
        }
    }
}

/// An allocated general register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(pub usize);

impl Register {
    /// Assembler name, e.g. `REG3`.
    pub fn name(self) -> String {
        chip::general_register_name(self.0)
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "REG{}", self.0)
    }
}

/// A region of delay memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryHandle {
    /// Assembler symbol naming the region.
    pub symbol: String,
    /// First word.
    pub offset: usize,
    /// Length in words.
    pub size: usize,
}

impl MemoryHandle {
    /// Operand text for the first word.
    pub fn start(&self) -> String {
        self.symbol.clone()
    }

    /// Operand text for the midpoint (`name^`).
    pub fn middle(&self) -> String {
        format!("{}^", self.symbol)
    }

    /// Operand text for the last word (`name#`).
    pub fn end(&self) -> String {
        format!("{}#", self.symbol)
    }
}

/// Resource violations during generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No general register left.
    #[error("register ceiling exceeded: all {limit} registers are allocated")]
    RegistersExhausted {
        /// Configured register count.
        limit: usize,
    },

    /// Delay memory arena is full.
    #[error("delay memory exhausted: '{symbol}' needs {size} words but only {available} of {limit} remain")]
    MemoryExhausted {
        /// Region being allocated.
        symbol: String,
        /// Requested size.
        size: usize,
        /// Words still free.
        available: usize,
        /// Configured memory size.
        limit: usize,
    },

    /// Instruction slots are used up.
    #[error("program size exceeded: more than {limit} instructions")]
    ProgramFull {
        /// Configured program size.
        limit: usize,
    },

    /// A memory region name was used twice by the same block.
    #[error("memory region '{0}' is already allocated")]
    DuplicateMemory(String),

    /// A zero-length memory region.
    #[error("memory region '{0}' must be at least one word long")]
    EmptyMemory(String),
}

impl ContextError {
    /// Name of the exhausted resource.
    pub const fn resource(&self) -> &'static str {
        match self {
            ContextError::RegistersExhausted { .. } => "register",
            ContextError::MemoryExhausted { .. }
            | ContextError::DuplicateMemory(_)
            | ContextError::EmptyMemory(_) => "memory",
            ContextError::ProgramFull { .. } => "program",
        }
    }

    /// Returns `true` when a resource ceiling was hit, as opposed to a bad
    /// memory request.
    pub const fn is_exhaustion(&self) -> bool {
        !matches!(
            self,
            ContextError::DuplicateMemory(_) | ContextError::EmptyMemory(_)
        )
    }

    /// Taxonomy entry for this error.
    pub const fn kind(&self) -> DiagnosticKind {
        if self.is_exhaustion() {
            DiagnosticKind::ResourceExhaustion
        } else {
            DiagnosticKind::Template
        }
    }

    /// Converts to a fatal diagnostic at `location`.
    pub fn to_diagnostic(&self, location: Location) -> Diagnostic {
        Diagnostic::fatal(self.kind(), location, self.to_string())
    }
}

/// Makes an assembler-safe identifier from arbitrary text.
///
/// Non-alphanumeric characters become `_`; a leading digit gets a `b` prefix.
pub fn symbol_name(parts: &[&str]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push('_');
        }
        out.extend(
            part.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' }),
        );
    }
    if out.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        out.insert(0, 'b');
    }
    out
}

type PortKey = (String, String);

/// Everything generation produced, handed to the renderer.
#[derive(Debug)]
pub struct GeneratedProgram {
    /// Emitted nodes per section, indexed by [`Section::index`].
    pub sections: [Vec<IrNode>; 5],
    /// Registers allocated.
    pub registers_used: usize,
    /// Memory words allocated.
    pub memory_used: usize,
    /// Instruction slots used, including the init guard.
    pub instruction_count: usize,
    /// Non-fatal diagnostics raised while generating.
    pub warnings: Vec<Diagnostic>,
}

/// Resource allocator and IR accumulator for one compile.
pub struct CodegenContext {
    options: CompileOptions,
    drivers: BTreeMap<PortKey, PortKey>,
    driven_outputs: BTreeSet<PortKey>,
    register_owners: Vec<PortKey>,
    registers: BTreeMap<PortKey, Register>,
    memory: Vec<MemoryHandle>,
    memory_used: usize,
    constants: BTreeMap<i32, String>,
    sections: [Vec<IrNode>; 5],
    last_block: [Option<String>; 5],
    instruction_count: usize,
    init_guard_reserved: bool,
    current_block: Option<String>,
    warnings: Vec<Diagnostic>,
    memory_names: BTreeSet<String>,
    symbols: BTreeSet<String>,
}

impl CodegenContext {
    /// Creates a context for compiling `graph` under `options`.
    ///
    /// Only the connection set is read; the context keeps its own index.
    pub fn new(graph: &Graph, options: CompileOptions) -> Self {
        let mut drivers = BTreeMap::new();
        let mut driven_outputs = BTreeSet::new();
        for c in &graph.connections {
            let from = (c.from.block_id.clone(), c.from.port_id.clone());
            let to = (c.to.block_id.clone(), c.to.port_id.clone());
            driven_outputs.insert(from.clone());
            drivers.entry(to).or_insert(from);
        }
        Self {
            options,
            drivers,
            driven_outputs,
            register_owners: Vec::new(),
            registers: BTreeMap::new(),
            memory: Vec::new(),
            memory_used: 0,
            constants: BTreeMap::new(),
            sections: Default::default(),
            last_block: Default::default(),
            instruction_count: 0,
            init_guard_reserved: false,
            current_block: None,
            warnings: Vec::new(),
            memory_names: BTreeSet::new(),
            symbols: BTreeSet::new(),
        }
    }

    /// The options this context enforces.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Marks `block_id` as the block currently generating code.
    ///
    /// Used to attribute warnings and to head each block's lines with a
    /// comment naming it.
    pub fn begin_block(&mut self, block_id: &str) {
        self.current_block = Some(block_id.to_string());
    }

    /// Id of the block currently generating code.
    pub fn current_block(&self) -> Option<&str> {
        self.current_block.as_deref()
    }

    // --- Registers ---

    /// Allocates the register for output `port_id` of `block_id`.
    ///
    /// Returns the already-recorded register if one exists for that port.
    pub fn allocate_register(
        &mut self,
        block_id: &str,
        port_id: &str,
    ) -> Result<Register, ContextError> {
        let key = (block_id.to_string(), port_id.to_string());
        if let Some(&reg) = self.registers.get(&key) {
            return Ok(reg);
        }
        let limit = self.options.register_count.min(chip::REGISTER_COUNT);
        if self.register_owners.len() >= limit {
            return Err(ContextError::RegistersExhausted {
                limit: self.options.register_count,
            });
        }
        let reg = Register(self.register_owners.len());
        tracing::trace!("alloc {reg} -> {block_id}.{port_id}");
        self.register_owners.push(key.clone());
        self.registers.insert(key, reg);
        Ok(reg)
    }

    /// Resolves input `port_id` of `block_id` to its driver's register.
    ///
    /// Returns `None` when the input is unconnected; callers decide what an
    /// unconnected input means (usually: omit the instructions, or clear).
    pub fn input_register(
        &mut self,
        block_id: &str,
        port_id: &str,
    ) -> Result<Option<Register>, ContextError> {
        let key = (block_id.to_string(), port_id.to_string());
        let Some((from_block, from_port)) = self.drivers.get(&key).cloned() else {
            return Ok(None);
        };
        self.allocate_register(&from_block, &from_port).map(Some)
    }

    /// Returns `true` if the input has a driver.
    pub fn is_input_connected(&self, block_id: &str, port_id: &str) -> bool {
        self.drivers
            .contains_key(&(block_id.to_string(), port_id.to_string()))
    }

    /// Returns `true` if the output feeds at least one input.
    pub fn is_output_connected(&self, block_id: &str, port_id: &str) -> bool {
        self.driven_outputs
            .contains(&(block_id.to_string(), port_id.to_string()))
    }

    /// The `(block, port)` that owns a register.
    pub fn register_owner(&self, reg: Register) -> Option<(&str, &str)> {
        self.register_owners
            .get(reg.0)
            .map(|(b, p)| (b.as_str(), p.as_str()))
    }

    /// Number of registers allocated so far.
    pub fn registers_used(&self) -> usize {
        self.register_owners.len()
    }

    // --- Memory ---

    /// Allocates `size` words of delay memory named `name` for `block_id`.
    ///
    /// Emits the `MEM` declaration into the header.
    pub fn allocate_memory(
        &mut self,
        block_id: &str,
        name: &str,
        size: usize,
    ) -> Result<MemoryHandle, ContextError> {
        let base = symbol_name(&[block_id, name]);
        if size == 0 {
            return Err(ContextError::EmptyMemory(base));
        }
        if self.memory_names.contains(&base) {
            return Err(ContextError::DuplicateMemory(base));
        }
        let available = self.options.memory_size.saturating_sub(self.memory_used);
        if size > available {
            return Err(ContextError::MemoryExhausted {
                symbol: base,
                size,
                available,
                limit: self.options.memory_size,
            });
        }
        self.memory_names.insert(base.clone());
        let handle = MemoryHandle {
            symbol: self.claim_symbol(&base),
            offset: self.memory_used,
            size,
        };
        self.memory_used += size;
        self.sections[Section::Header.index()].push(IrNode::mem(handle.symbol.clone(), size));
        self.memory.push(handle.clone());
        tracing::trace!("mem {} @{} +{}", handle.symbol, handle.offset, size);
        Ok(handle)
    }

    /// Delay memory words allocated so far.
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    // --- Constants ---

    /// Returns the canonical operand text for a frequently used constant.
    ///
    /// The first request for a value declares it once in the header with
    /// `EQU`; later requests return the same symbol.
    pub fn standard_constant(&mut self, value: f64) -> String {
        let q = FixedFormat::S1_14.quantize(value);
        if let Some(name) = self.constants.get(&q.raw) {
            return name.clone();
        }
        let base = match q.raw {
            0 => "k_zero".to_string(),
            0x4000 => "k_unity".to_string(),
            -0x4000 => "k_neg_unity".to_string(),
            0x2000 => "k_half".to_string(),
            raw if raw < 0 => format!("k_n{}", -raw),
            raw => format!("k_{raw}"),
        };
        let name = self.claim_symbol(&base);
        self.sections[Section::Header.index()].push(IrNode::equ(name.clone(), q.to_asm_text()));
        self.constants.insert(q.raw, name.clone());
        name
    }

    /// Formats `value` as a fixed-point operand in `format`.
    ///
    /// Out-of-range values are clamped; the clamp is recorded as a warning
    /// comment in `section` and as a warning diagnostic, never an error.
    pub fn fixed_operand(&mut self, section: Section, value: f64, format: FixedFormat) -> String {
        let q = format.quantize(value);
        if q.clamped {
            let message = format!(
                "{} value {} clamped to {}",
                format.name(),
                value,
                q.to_asm_text()
            );
            self.push_node(IrNode::comment(section, format!("warning: {message}")));
            let location = self
                .current_block
                .clone()
                .map_or(Location::Program, Location::Block);
            self.warnings.push(Diagnostic::warning(
                DiagnosticKind::Template,
                location,
                message,
            ));
        }
        q.to_asm_text()
    }

    // --- Emission ---

    /// Appends a node to its section.
    ///
    /// Instructions count against the program size; the first instruction in
    /// the init section also reserves the slot for the run-once guard.
    pub fn emit(&mut self, node: IrNode) -> Result<(), ContextError> {
        if node.is_instruction() {
            let mut needed = 1;
            if node.section == Section::Init && !self.init_guard_reserved {
                needed += 1;
            }
            if self.instruction_count + needed > self.options.program_size {
                return Err(ContextError::ProgramFull {
                    limit: self.options.program_size,
                });
            }
            if needed == 2 {
                self.init_guard_reserved = true;
            }
            self.instruction_count += needed;
        }
        self.push_node(node);
        Ok(())
    }

    /// Appends an instruction.
    pub fn instruction<S: AsRef<str>>(
        &mut self,
        section: Section,
        mnemonic: &str,
        operands: &[S],
    ) -> Result<(), ContextError> {
        self.emit(IrNode::instruction(section, mnemonic, operands))
    }

    /// Appends a full-line comment.
    pub fn comment(&mut self, section: Section, text: impl Into<String>) {
        self.push_node(IrNode::comment(section, text));
    }

    /// Returns a label name unique within this compile, derived from `base`.
    ///
    /// Labels share one namespace with memory regions and constants, and
    /// never take a predefined chip symbol.
    pub fn unique_label(&mut self, base: &str) -> String {
        self.claim_symbol(&symbol_name(&[base]))
    }

    fn claim_symbol(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut n = 1;
        while chip::is_predefined_symbol(&name) || !self.symbols.insert(name.clone()) {
            n += 1;
            name = format!("{base}_{n}");
        }
        name
    }

    /// Returns `true` once the init section holds an instruction, which is
    /// when the run-once guard is counted and must be rendered.
    pub fn has_init_code(&self) -> bool {
        self.init_guard_reserved
    }

    /// Instruction slots used so far.
    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Nodes emitted into `section` so far.
    pub fn section(&self, section: Section) -> &[IrNode] {
        &self.sections[section.index()]
    }

    /// Records a warning against the current block.
    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let location = self
            .current_block
            .clone()
            .map_or(Location::Program, Location::Block);
        self.warnings.push(Diagnostic::warning(kind, location, message));
    }

    /// Consumes the context.
    pub fn finish(self) -> GeneratedProgram {
        GeneratedProgram {
            sections: self.sections,
            registers_used: self.register_owners.len(),
            memory_used: self.memory_used,
            instruction_count: self.instruction_count,
            warnings: self.warnings,
        }
    }

    fn push_node(&mut self, node: IrNode) {
        let index = node.section.index();
        if node.section != Section::Header {
            if let Some(block) = &self.current_block {
                if self.last_block[index].as_ref() != Some(block) {
                    self.last_block[index] = Some(block.clone());
                    self.sections[index].push(IrNode::comment(node.section, block.clone()));
                }
            }
        }
        self.sections[index].push(node);
    }
}
