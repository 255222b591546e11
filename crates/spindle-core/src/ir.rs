//! Intermediate representation emitted by block code generation.
//!
//! Blocks never write assembly text directly. They append [`IrNode`]s to one of
//! five [`Section`]s, and the renderer concatenates the sections in the fixed
//! order header → init → input → main → output. Within a section, nodes keep
//! the order in which they were emitted.

use core::fmt;

/// Program section a node belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Declarations (`EQU`, `MEM`) and banner comments.
    Header,
    /// Code run once, on the first sample only.
    Init,
    /// Reads from the physical inputs.
    Input,
    /// Per-sample processing.
    Main,
    /// Writes to the physical outputs and delay lines.
    Output,
}

impl Section {
    /// All sections in render order.
    pub const ALL: [Section; 5] = [
        Section::Header,
        Section::Init,
        Section::Input,
        Section::Main,
        Section::Output,
    ];

    /// Position in [`Section::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Section::Header => 0,
            Section::Init => 1,
            Section::Input => 2,
            Section::Main => 3,
            Section::Output => 4,
        }
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Section::Header => "header",
            Section::Init => "init",
            Section::Input => "input",
            Section::Main => "main",
            Section::Output => "output",
        }
    }

    /// Parses a section name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Section::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Assembler declaration kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// `EQU name value`.
    Equ,
    /// `MEM name size`.
    Mem,
}

/// What an IR node does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrOp {
    /// A chip instruction; the mnemonic is stored lowercase.
    Instruction(String),
    /// A label definition.
    Label(String),
    /// A full-line comment; the text is in `comment`.
    Comment,
    /// A declaration; `operands` holds name then value.
    Directive(Directive),
}

/// One line of generated assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrNode {
    /// Target section.
    pub section: Section,
    /// Operation.
    pub op: IrOp,
    /// Operand texts, in order.
    pub operands: Vec<String>,
    /// Trailing (or, for [`IrOp::Comment`], whole-line) comment.
    pub comment: Option<String>,
}

impl IrNode {
    /// An instruction line.
    pub fn instruction<S: AsRef<str>>(section: Section, mnemonic: &str, operands: &[S]) -> Self {
        Self {
            section,
            op: IrOp::Instruction(mnemonic.to_ascii_lowercase()),
            operands: operands.iter().map(|o| o.as_ref().to_string()).collect(),
            comment: None,
        }
    }

    /// A label definition.
    pub fn label(section: Section, name: impl Into<String>) -> Self {
        Self {
            section,
            op: IrOp::Label(name.into()),
            operands: Vec::new(),
            comment: None,
        }
    }

    /// A full-line comment.
    pub fn comment(section: Section, text: impl Into<String>) -> Self {
        Self {
            section,
            op: IrOp::Comment,
            operands: Vec::new(),
            comment: Some(text.into()),
        }
    }

    /// `EQU name value` in the header.
    pub fn equ(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            section: Section::Header,
            op: IrOp::Directive(Directive::Equ),
            operands: vec![name.into(), value.into()],
            comment: None,
        }
    }

    /// `MEM name size` in the header.
    pub fn mem(name: impl Into<String>, size: usize) -> Self {
        Self {
            section: Section::Header,
            op: IrOp::Directive(Directive::Mem),
            operands: vec![name.into(), size.to_string()],
            comment: None,
        }
    }

    /// Attaches a trailing comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns `true` if this node occupies a program slot.
    pub fn is_instruction(&self) -> bool {
        matches!(self.op, IrOp::Instruction(_))
    }

    /// Renders the node as one line of assembly, without a newline.
    pub fn render(&self) -> String {
        let mut line = match &self.op {
            IrOp::Instruction(mnemonic) if self.operands.is_empty() => format!("\t{mnemonic}"),
            IrOp::Instruction(mnemonic) => {
                format!("\t{mnemonic}\t{}", self.operands.join(", "))
            }
            IrOp::Label(name) => format!("{name}:"),
            IrOp::Comment => {
                return format!("; {}", comment_text(self.comment.as_deref().unwrap_or_default()));
            }
            IrOp::Directive(Directive::Equ) => format!("equ\t{}", self.operands.join("\t")),
            IrOp::Directive(Directive::Mem) => format!("mem\t{}", self.operands.join("\t")),
        };
        if let Some(comment) = &self.comment {
            line.push_str("\t; ");
            line.push_str(&comment_text(comment));
        }
        line
    }
}

/// Makes arbitrary text safe to place after `;` on one assembly line.
///
/// Control characters, line breaks included, become spaces.
pub fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
