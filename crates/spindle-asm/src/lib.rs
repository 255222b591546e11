//! Two-pass assembler for FV-1 class DSP programs.
//!
//! Turns line-oriented assembly text into 32-bit machine words. Pass 1 walks
//! the source collecting labels, `EQU` values and `MEM` declarations; delay
//! memory is then laid out; pass 2 encodes every instruction against the
//! finished symbol table, so symbols may be used before they are defined.
//!
//! Assembly never fails outright. Problems come back as line-numbered
//! [`Diagnostic`]s, and a line that cannot be encoded still occupies its
//! program slot (as a `NOP`) so later addresses do not shift. A program is
//! usable exactly when no diagnostic is fatal.
//!
//! ```
//! use spindle_asm::{AssemblerOptions, assemble};
//!
//! let program = assemble("rdax adcl, 1.0\nwrax dacl, 0.0\n", &AssemblerOptions::default());
//! assert!(program.is_usable());
//! assert_eq!(program.instruction_count, 2);
//! assert_eq!(program.machine_code.len(), 128);
//! ```

pub mod error;
pub mod expr;
mod encode;
mod line;
pub mod output;
mod symbols;

use serde::{Deserialize, Serialize};
use spindle_core::chip::{MEMORY_SIZE, NOP_WORD, PROGRAM_SIZE};
use spindle_core::{Diagnostic, DiagnosticKind, Location};
use tracing::{debug, trace};

use crate::encode::Encoder;
use crate::line::{Statement, parse_line};
use crate::symbols::{Defined, SymbolTable};

// Re-export main types at crate root
pub use error::AsmError;
pub use expr::{Expr, Suffix, Value};
pub use output::{to_bytes, to_hex_lines, to_intel_hex};

/// Assembler behavior switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerOptions {
    /// Out-of-range real operands are fatal instead of clamped.
    pub strict: bool,
    /// Always clamp out-of-range reals with a warning, even when `strict`.
    pub clamp_reals: bool,
    /// Reserve a guard word after every `MEM` block and resolve `name#` one
    /// past the last word, as the reference assembler does.
    pub legacy_memory: bool,
    /// Read the integers `1` and `2` in fixed-point fields as `1.0` and `2.0`.
    pub spin_reals: bool,
    /// Program slots.
    pub program_size: usize,
    /// Delay memory words.
    pub memory_size: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            strict: false,
            clamp_reals: false,
            legacy_memory: false,
            spin_reals: false,
            program_size: PROGRAM_SIZE,
            memory_size: MEMORY_SIZE,
        }
    }
}

/// Output of [`assemble`].
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledProgram {
    /// Program words, `NOP`-padded to the configured program size.
    pub machine_code: Vec<u32>,
    /// Instruction lines in the source.
    pub instruction_count: usize,
    /// Delay memory words laid out by `MEM` declarations.
    pub memory_used: usize,
    /// Problems, ordered by line.
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembledProgram {
    /// `true` when no diagnostic is fatal.
    pub fn is_usable(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// Fatal diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_fatal())
    }

    /// Non-fatal diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_fatal())
    }

    /// The words that hold instructions, without padding.
    pub fn program(&self) -> &[u32] {
        let len = self.instruction_count.min(self.machine_code.len());
        &self.machine_code[..len]
    }
}

struct PendingInstruction {
    line: usize,
    pc: usize,
    mnemonic: String,
    operands: Vec<String>,
}

/// Assembles `source`.
pub fn assemble(source: &str, options: &AssemblerOptions) -> AssembledProgram {
    let mut diagnostics = Vec::new();
    let mut symbols = SymbolTable::new(options.legacy_memory);
    let mut pending = Vec::new();
    let mut pc = 0_usize;
    let mut overflow_reported = false;

    // Pass 1: symbols and instruction slots.
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let parsed = match parse_line(raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                diagnostics.push(err.at(line));
                continue;
            }
        };

        let mut defined = Vec::new();
        if let Some(label) = &parsed.label {
            defined.push((label.clone(), symbols.define_label(label, line, pc)));
        }
        match parsed.statement {
            Some(Statement::Equ { name, value }) => match Expr::parse(&value) {
                Ok(expr) => defined.push((name.clone(), symbols.define_equ(&name, line, expr))),
                Err(err) => diagnostics.push(err.at(line)),
            },
            Some(Statement::Mem { name, size }) => match Expr::parse(&size) {
                Ok(expr) => defined.push((name.clone(), symbols.define_mem(&name, line, expr))),
                Err(err) => diagnostics.push(err.at(line)),
            },
            Some(Statement::Instruction { mnemonic, operands }) => {
                if pc >= options.program_size && !overflow_reported {
                    diagnostics.push(AsmError::ProgramTooLarge(options.program_size).at(line));
                    overflow_reported = true;
                }
                pending.push(PendingInstruction {
                    line,
                    pc,
                    mnemonic,
                    operands,
                });
                pc += 1;
            }
            None => {}
        }

        for (name, outcome) in defined {
            match outcome {
                Ok(Defined::New) => {}
                Ok(Defined::ShadowsPredefined) => diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::AssemblySymbol,
                    Location::Line(line),
                    format!("'{name}' redefines a predefined symbol"),
                )),
                Err(err) => diagnostics.push(err.at(line)),
            }
        }
    }
    debug!(
        instructions = pending.len(),
        symbols = symbols.symbol_count(),
        "assembler pass 1 complete"
    );

    let (memory_used, memory_errors) = symbols.allocate_memory(options.memory_size);
    diagnostics.extend(memory_errors.into_iter().map(|(line, err)| err.at(line)));
    debug!(memory_used, "delay memory laid out");

    // Pass 2: encode.
    let mut machine_code = vec![NOP_WORD; options.program_size];
    let mut encoder = Encoder::new(&mut symbols, options);
    for instruction in &pending {
        let result = encoder.encode(&instruction.mnemonic, &instruction.operands, instruction.pc);
        for warning in encoder.take_warnings() {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::AssemblyEncoding,
                Location::Line(instruction.line),
                warning,
            ));
        }
        let word = match result {
            Ok(word) => word,
            Err(err) => {
                diagnostics.push(err.at(instruction.line));
                NOP_WORD
            }
        };
        trace!(line = instruction.line, pc = instruction.pc, "encoded {word:#010x}");
        if let Some(slot) = machine_code.get_mut(instruction.pc) {
            *slot = word;
        }
    }

    diagnostics.sort_by_key(|d| d.line().unwrap_or(0));
    debug!(
        errors = diagnostics.iter().filter(|d| d.is_fatal()).count(),
        warnings = diagnostics.iter().filter(|d| !d.is_fatal()).count(),
        "assembler pass 2 complete"
    );

    AssembledProgram {
        machine_code,
        instruction_count: pending.len(),
        memory_used,
        diagnostics,
    }
}
