//! Error types for block definitions and code generation.

use spindle_core::{ContextError, Diagnostic, DiagnosticKind, Location};
use thiserror::Error;

/// Errors raised while loading or expanding a template.
///
/// Line numbers are 1-based within the template body (the text after the
/// `---` separator).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    /// The metadata header could not be parsed
    #[error("invalid template metadata: {0}")]
    Metadata(String),

    /// No `---` line separates metadata from body
    #[error("missing '---' separator between metadata and body")]
    MissingSeparator,

    /// Malformed directive or placeholder
    #[error("line {line}: {message}")]
    Syntax {
        /// Body line.
        line: usize,
        /// What is wrong.
        message: String,
    },

    /// A placeholder names a port, parameter or memory region the template
    /// does not declare
    #[error("line {line}: unknown {kind} '{name}'")]
    UnknownReference {
        /// Body line.
        line: usize,
        /// `input`, `output`, `param`, `mem` or `port`.
        kind: &'static str,
        /// Referenced name.
        name: String,
    },

    /// An input was read but nothing drives it
    #[error("line {line}: input '{port}' is not connected")]
    UnconnectedInput {
        /// Body line.
        line: usize,
        /// Input port id.
        port: String,
    },

    /// Division by zero while evaluating a placeholder
    #[error("line {line}: division by zero")]
    DivisionByZero {
        /// Body line.
        line: usize,
    },

    /// A register or memory reference used where a number is needed
    #[error("line {line}: '{name}' is a symbol, not a number")]
    NotANumber {
        /// Body line.
        line: usize,
        /// The offending reference.
        name: String,
    },

    /// An expanded line that is not a valid instruction or declaration
    #[error("line {line}: {message}")]
    InvalidLine {
        /// Body line.
        line: usize,
        /// What is wrong.
        message: String,
    },
}

impl TemplateError {
    /// Create a syntax error.
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Create an unknown-reference error.
    pub fn unknown(line: usize, kind: &'static str, name: impl Into<String>) -> Self {
        TemplateError::UnknownReference {
            line,
            kind,
            name: name.into(),
        }
    }
}

/// Errors raised while a block generates code.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerateError {
    /// A resource ceiling was hit
    #[error(transparent)]
    Resource(#[from] ContextError),

    /// Template expansion failed
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl GenerateError {
    /// Converts to a fatal diagnostic attributed to `block_id`.
    pub fn to_diagnostic(&self, block_id: &str) -> Diagnostic {
        let kind = match self {
            GenerateError::Resource(e) => e.kind(),
            GenerateError::Template(_) => DiagnosticKind::Template,
        };
        Diagnostic::fatal(kind, Location::Block(block_id.to_string()), self.to_string())
    }

    /// Returns `true` for resource exhaustion.
    pub fn is_resource(&self) -> bool {
        matches!(self, GenerateError::Resource(e) if e.is_exhaustion())
    }
}
