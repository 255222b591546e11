//! Source line splitting: comments, labels, declarations, instructions.

use crate::error::AsmError;

/// What a line asks for, after its label.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Statement {
    /// `EQU name expr` or `name EQU expr`.
    Equ { name: String, value: String },
    /// `MEM name size` or `name MEM size`.
    Mem { name: String, size: String },
    /// Anything else: a mnemonic and its comma-separated operands.
    Instruction {
        mnemonic: String,
        operands: Vec<String>,
    },
}

/// One parsed source line.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SourceLine {
    pub label: Option<String>,
    pub statement: Option<Statement>,
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses one line of assembler source.
pub(crate) fn parse_line(raw: &str) -> Result<SourceLine, AsmError> {
    let text = raw.split(';').next().unwrap_or_default().trim();
    let mut line = SourceLine::default();
    if text.is_empty() {
        return Ok(line);
    }

    let mut rest = text;
    if let Some((head, tail)) = text.split_once(':') {
        let head = head.trim();
        if is_identifier(head) {
            line.label = Some(head.to_string());
            rest = tail.trim();
        } else if !head.contains(char::is_whitespace) {
            return Err(AsmError::MalformedDeclaration(format!(
                "'{head}' is not a valid label"
            )));
        }
    }
    if rest.is_empty() {
        return Ok(line);
    }

    let (first, after) = split_word(rest);
    let (second, tail) = split_word(after);
    let statement = if first.eq_ignore_ascii_case("EQU") || first.eq_ignore_ascii_case("MEM") {
        let (name, value) = split_declaration(after);
        declaration(first, name, value)?
    } else if second.eq_ignore_ascii_case("EQU") || second.eq_ignore_ascii_case("MEM") {
        let name = first.trim_end_matches(',');
        let value = tail.trim_start_matches(',').trim();
        declaration(second, name, value)?
    } else {
        Statement::Instruction {
            mnemonic: first.to_ascii_uppercase(),
            operands: split_operands(after)?,
        }
    };
    line.statement = Some(statement);
    Ok(line)
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim_start()),
        None => (text, ""),
    }
}

/// `name, value` or `name value`.
fn split_declaration(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(text.len());
    let name = &text[..end];
    let value = text[end..].trim_start().trim_start_matches(',').trim();
    (name, value)
}

fn declaration(keyword: &str, name: &str, value: &str) -> Result<Statement, AsmError> {
    let keyword = keyword.to_ascii_uppercase();
    if !is_identifier(name) {
        return Err(AsmError::MalformedDeclaration(format!(
            "{keyword} needs a symbol name, found '{name}'"
        )));
    }
    if value.is_empty() {
        return Err(AsmError::MalformedDeclaration(format!(
            "{keyword} {name} has no value"
        )));
    }
    let (name, value) = (name.to_string(), value.to_string());
    Ok(if keyword == "EQU" {
        Statement::Equ { name, value }
    } else {
        Statement::Mem { name, size: value }
    })
}

/// Splits on commas outside parentheses.
fn split_operands(text: &str) -> Result<Vec<String>, AsmError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut operands = Vec::new();
    let mut depth = 0_i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                operands.push(text[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    operands.push(text[start..].trim().to_string());
    if operands.iter().any(String::is_empty) {
        return Err(AsmError::malformed(text.trim(), "empty operand"));
    }
    Ok(operands)
}
