//! Per-line assembler errors.

use spindle_core::{Diagnostic, DiagnosticKind, Location};
use thiserror::Error;

/// Something wrong with one source line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AsmError {
    /// Unknown instruction
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    /// Wrong number of operands
    #[error("{mnemonic} expects {expected}, found {found} operand(s)")]
    OperandCount {
        /// Instruction.
        mnemonic: String,
        /// Expected operand form, e.g. `"reg, coefficient"`.
        expected: &'static str,
        /// Operands given.
        found: usize,
    },

    /// Operand text that does not parse
    #[error("malformed operand '{text}': {reason}")]
    MalformedOperand {
        /// The operand.
        text: String,
        /// Parser message.
        reason: String,
    },

    /// Malformed `EQU`/`MEM` or label
    #[error("malformed declaration: {0}")]
    MalformedDeclaration(String),

    /// Symbol never defined
    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),

    /// Symbol defined twice
    #[error("symbol '{name}' already defined on line {first_line}")]
    DuplicateSymbol {
        /// Symbol name.
        name: String,
        /// Line of the first definition.
        first_line: usize,
    },

    /// `EQU` definitions that refer to each other
    #[error("circular definition of '{0}'")]
    CircularDefinition(String),

    /// `^`/`#` on something that is not a memory block
    #[error("'{0}' is not a memory block")]
    NotMemory(String),

    /// Integer operand outside its field
    #[error("{field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        /// Operand name.
        field: &'static str,
        /// Value given.
        value: i64,
        /// Field width.
        bits: u32,
    },

    /// Real operand outside its fixed-point range (strict mode)
    #[error("{field} value {value} is outside the {format} range [{min}, {max}]")]
    RealOutOfRange {
        /// Operand name.
        field: &'static str,
        /// Value given.
        value: f64,
        /// Fixed-point format name.
        format: &'static str,
        /// Smallest representable value.
        min: f64,
        /// Largest representable value.
        max: f64,
    },

    /// Real given where an integer is required
    #[error("{field} must be an integer, found {value}")]
    NotInteger {
        /// Operand name.
        field: &'static str,
        /// Value given.
        value: f64,
    },

    /// Skip target behind the instruction or too far ahead
    #[error("skip distance {0} is outside 0..=63")]
    SkipOutOfRange(i64),

    /// Division by zero in an expression
    #[error("division by zero")]
    DivisionByZero,

    /// Instruction beyond the last program slot
    #[error("program exceeds {0} instructions")]
    ProgramTooLarge(usize),

    /// `MEM` declarations exceed delay memory
    #[error("memory block '{name}' needs {size} words but only {available} remain")]
    MemoryExhausted {
        /// Block name.
        name: String,
        /// Words requested, including any guard word.
        size: i64,
        /// Words left.
        available: usize,
    },
}

impl AsmError {
    /// Taxonomy entry for this error.
    pub const fn kind(&self) -> DiagnosticKind {
        match self {
            AsmError::UnknownMnemonic(_)
            | AsmError::OperandCount { .. }
            | AsmError::MalformedOperand { .. }
            | AsmError::MalformedDeclaration(_)
            | AsmError::DivisionByZero => DiagnosticKind::AssemblySyntax,
            AsmError::UndefinedSymbol(_)
            | AsmError::DuplicateSymbol { .. }
            | AsmError::CircularDefinition(_)
            | AsmError::NotMemory(_) => DiagnosticKind::AssemblySymbol,
            AsmError::FieldOverflow { .. }
            | AsmError::RealOutOfRange { .. }
            | AsmError::NotInteger { .. }
            | AsmError::SkipOutOfRange(_)
            | AsmError::ProgramTooLarge(_)
            | AsmError::MemoryExhausted { .. } => DiagnosticKind::AssemblyEncoding,
        }
    }

    /// Fatal diagnostic at a 1-based line.
    pub fn at(&self, line: usize) -> Diagnostic {
        Diagnostic::fatal(self.kind(), Location::Line(line), self.to_string())
    }

    pub(crate) fn malformed(text: &str, reason: impl Into<String>) -> Self {
        AsmError::MalformedOperand {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}
