//! Structured diagnostics shared by the compiler and the assembler.
//!
//! Neither engine fails with an unstructured error on bad input. Each problem
//! becomes a [`Diagnostic`] carrying a [`DiagnosticKind`] from the error
//! taxonomy, a [`Severity`], and a [`Location`] (a block id or a 1-based source
//! line). A result is usable iff it holds no [`Severity::Fatal`] entries.

use core::fmt;

use serde::Serialize;

/// How serious a diagnostic is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Output is still produced and usable.
    Warning,
    /// The compile or assemble attempt is unusable.
    Fatal,
}

impl Severity {
    /// Lowercase label used when printing.
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Fatal => "error",
        }
    }
}

/// Error taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Bad reference, signal-kind mismatch, missing required input, or cycle.
    GraphValidation,
    /// Register, memory, or program-size ceiling exceeded.
    ResourceExhaustion,
    /// Malformed placeholder or dangling port reference in a template.
    Template,
    /// Unparsable line or wrong operand shape.
    AssemblySyntax,
    /// Undefined or duplicate symbol.
    AssemblySymbol,
    /// Operand outside its representable range.
    AssemblyEncoding,
}

impl DiagnosticKind {
    /// Short name for display.
    pub const fn name(self) -> &'static str {
        match self {
            DiagnosticKind::GraphValidation => "graph",
            DiagnosticKind::ResourceExhaustion => "resource",
            DiagnosticKind::Template => "template",
            DiagnosticKind::AssemblySyntax => "syntax",
            DiagnosticKind::AssemblySymbol => "symbol",
            DiagnosticKind::AssemblyEncoding => "encoding",
        }
    }
}

/// Where a diagnostic applies.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// A block in the graph, by id.
    Block(String),
    /// A 1-based line in assembler source.
    Line(usize),
    /// The program or graph as a whole.
    Program,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Block(id) => write!(f, "block '{id}'"),
            Location::Line(n) => write!(f, "line {n}"),
            Location::Program => f.write_str("program"),
        }
    }
}

/// One reported problem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Fatal or warning.
    pub severity: Severity,
    /// Taxonomy entry.
    pub kind: DiagnosticKind,
    /// Block id or line number.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a fatal diagnostic.
    pub fn fatal(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            kind,
            location,
            message: message.into(),
        }
    }

    /// Creates a warning.
    pub fn warning(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            location,
            message: message.into(),
        }
    }

    /// Returns `true` for fatal diagnostics.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// The 1-based line number, if this diagnostic points at a source line.
    pub fn line(&self) -> Option<usize> {
        match self.location {
            Location::Line(n) => Some(n),
            _ => None,
        }
    }

    /// The block id, if this diagnostic points at a block.
    pub fn block_id(&self) -> Option<&str> {
        match &self.location {
            Location::Block(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity.label(),
            self.kind.name(),
            self.location,
            self.message
        )
    }
}

/// Ordered collection of diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Appends a fatal diagnostic.
    pub fn fatal(&mut self, kind: DiagnosticKind, location: Location, message: impl Into<String>) {
        self.push(Diagnostic::fatal(kind, location, message));
    }

    /// Appends a warning.
    pub fn warning(&mut self, kind: DiagnosticKind, location: Location, message: impl Into<String>) {
        self.push(Diagnostic::warning(kind, location, message));
    }

    /// Appends every diagnostic from `other`.
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(other);
    }

    /// Returns `true` if any diagnostic is fatal.
    pub fn has_fatal(&self) -> bool {
        self.items.iter().any(Diagnostic::is_fatal)
    }

    /// Number of fatal diagnostics.
    pub fn fatal_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_fatal()).count()
    }

    /// Iterates over fatal diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_fatal())
    }

    /// Iterates over warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_fatal())
    }

    /// Iterates over all diagnostics in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the collection.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(items: Vec<Diagnostic>) -> Self {
        Self { items }
    }
}
