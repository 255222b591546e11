//! Template body parsing.
//!
//! A body is assembly text with `${...}` placeholders and `@` directives. It is
//! parsed once when the template is loaded; expansion walks the parsed tree.

use std::collections::BTreeSet;

use spindle_core::{FixedFormat, Section};

use super::expr::{Expr, Reference};
use crate::error::TemplateError;
use crate::info::BlockInfo;

/// How a placeholder's value is written into the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderFormat {
    /// Symbols as-is, numbers as reals.
    Plain,
    /// Rounded and clamped into a fixed-point format.
    Fixed(FixedFormat),
    /// Rounded to an integer.
    Int,
}

impl PlaceholderFormat {
    fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("int") {
            return Some(PlaceholderFormat::Int);
        }
        FixedFormat::from_name(name).map(PlaceholderFormat::Fixed)
    }
}

/// A piece of a body line.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// Literal text.
    Text(String),
    /// `${expr}` or `${expr:format}`.
    Placeholder {
        /// Parsed expression.
        expr: Expr,
        /// Output format.
        format: PlaceholderFormat,
    },
}

/// One parsed body element.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyItem {
    /// `@section <name>`: later lines go to this section.
    Section(Section),
    /// A line of assembly, possibly with placeholders.
    Line {
        /// 1-based body line.
        line: usize,
        /// Text and placeholders in order.
        segments: Vec<Segment>,
    },
    /// `@if [!]connected(<port>)` ... `@else` ... `@endif`.
    If {
        /// 1-based line of the `@if`.
        line: usize,
        /// Port tested.
        port: String,
        /// `true` for `!connected(..)`.
        negate: bool,
        /// Items when the condition holds.
        then: Vec<BodyItem>,
        /// Items otherwise.
        otherwise: Vec<BodyItem>,
    },
}

/// `@mem <name> <size>` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryDecl {
    /// 1-based body line.
    pub line: usize,
    /// Region name, block-scoped.
    pub name: String,
    /// Size in words.
    pub size: Expr,
}

/// A parsed body: memory declarations plus the item tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
    /// Regions allocated before expansion, in declaration order.
    pub memory: Vec<MemoryDecl>,
    /// Top-level items.
    pub items: Vec<BodyItem>,
}

struct Frame {
    line: usize,
    port: String,
    negate: bool,
    then: Vec<BodyItem>,
    otherwise: Option<Vec<BodyItem>>,
}

impl Body {
    /// Parses body text and checks every reference against `info`.
    pub fn parse(text: &str, info: &BlockInfo) -> Result<Self, TemplateError> {
        let mut memory = Vec::new();
        let mut root: Vec<BodyItem> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            let item = if let Some(directive) = trimmed.strip_prefix('@') {
                let (word, rest) = split_word(directive);
                match word {
                    "section" => {
                        let section = Section::from_name(rest.trim()).ok_or_else(|| {
                            TemplateError::syntax(line, format!("unknown section '{}'", rest.trim()))
                        })?;
                        BodyItem::Section(section)
                    }
                    "mem" => {
                        if !stack.is_empty() {
                            return Err(TemplateError::syntax(
                                line,
                                "@mem must not appear inside @if",
                            ));
                        }
                        let (name, size) = split_word(rest.trim());
                        if name.is_empty() || size.trim().is_empty() {
                            return Err(TemplateError::syntax(line, "expected '@mem <name> <size>'"));
                        }
                        if memory.iter().any(|m: &MemoryDecl| m.name == name) {
                            return Err(TemplateError::syntax(
                                line,
                                format!("memory '{name}' declared twice"),
                            ));
                        }
                        let size =
                            Expr::parse(size.trim()).map_err(|m| TemplateError::syntax(line, m))?;
                        memory.push(MemoryDecl {
                            line,
                            name: name.to_string(),
                            size,
                        });
                        continue;
                    }
                    "if" => {
                        let (port, negate) = parse_condition(rest.trim())
                            .ok_or_else(|| {
                                TemplateError::syntax(
                                    line,
                                    "expected '@if connected(<port>)' or '@if !connected(<port>)'",
                                )
                            })?;
                        if info.input_port(&port).is_none() && info.output_port(&port).is_none() {
                            return Err(TemplateError::unknown(line, "port", port));
                        }
                        stack.push(Frame {
                            line,
                            port,
                            negate,
                            then: Vec::new(),
                            otherwise: None,
                        });
                        continue;
                    }
                    "else" => {
                        match stack.last_mut() {
                            Some(frame) if frame.otherwise.is_none() => {
                                frame.otherwise = Some(Vec::new());
                            }
                            Some(_) => return Err(TemplateError::syntax(line, "duplicate @else")),
                            None => return Err(TemplateError::syntax(line, "@else without @if")),
                        }
                        continue;
                    }
                    "endif" => {
                        let frame = stack
                            .pop()
                            .ok_or_else(|| TemplateError::syntax(line, "@endif without @if"))?;
                        BodyItem::If {
                            line: frame.line,
                            port: frame.port,
                            negate: frame.negate,
                            then: frame.then,
                            otherwise: frame.otherwise.unwrap_or_default(),
                        }
                    }
                    other => {
                        return Err(TemplateError::syntax(
                            line,
                            format!("unknown directive '@{other}'"),
                        ));
                    }
                }
            } else if trimmed.is_empty() {
                continue;
            } else {
                BodyItem::Line {
                    line,
                    segments: parse_segments(trimmed, line)?,
                }
            };

            match stack.last_mut() {
                Some(frame) => match &mut frame.otherwise {
                    Some(otherwise) => otherwise.push(item),
                    None => frame.then.push(item),
                },
                None => root.push(item),
            }
        }

        if let Some(frame) = stack.last() {
            return Err(TemplateError::syntax(frame.line, "@if without matching @endif"));
        }

        let body = Body {
            memory,
            items: root,
        };
        body.check(info)?;
        Ok(body)
    }

    fn check(&self, info: &BlockInfo) -> Result<(), TemplateError> {
        let declared: BTreeSet<&str> = self.memory.iter().map(|m| m.name.as_str()).collect();
        for decl in &self.memory {
            check_refs(&decl.size, decl.line, info, &declared)?;
            if let Some(r) = decl
                .size
                .references()
                .into_iter()
                .find(|r| !matches!(r, Reference::Param(_)))
            {
                return Err(TemplateError::syntax(
                    decl.line,
                    format!("memory size may only use parameters, found {r}"),
                ));
            }
        }
        check_items(&self.items, info, &declared)
    }
}

fn check_items(
    items: &[BodyItem],
    info: &BlockInfo,
    declared: &BTreeSet<&str>,
) -> Result<(), TemplateError> {
    for item in items {
        match item {
            BodyItem::Section(_) => {}
            BodyItem::Line { line, segments } => {
                for segment in segments {
                    if let Segment::Placeholder { expr, .. } = segment {
                        check_refs(expr, *line, info, declared)?;
                    }
                }
            }
            BodyItem::If {
                then, otherwise, ..
            } => {
                check_items(then, info, declared)?;
                check_items(otherwise, info, declared)?;
            }
        }
    }
    Ok(())
}

fn check_refs(
    expr: &Expr,
    line: usize,
    info: &BlockInfo,
    declared: &BTreeSet<&str>,
) -> Result<(), TemplateError> {
    for reference in expr.references() {
        let ok = match reference {
            Reference::Param(id) => info.param_descriptor(id).is_some(),
            Reference::Input(id) => info.input_port(id).is_some(),
            Reference::Output(id) => info.output_port(id).is_some(),
            Reference::Memory(name, _) => declared.contains(name.as_str()),
            Reference::Scratch(_) | Reference::Label(_) => true,
        };
        if !ok {
            let (kind, name) = match reference {
                Reference::Param(n) => ("param", n),
                Reference::Input(n) => ("input", n),
                Reference::Output(n) => ("output", n),
                Reference::Memory(n, _) => ("mem", n),
                Reference::Scratch(n) | Reference::Label(n) => ("reference", n),
            };
            return Err(TemplateError::unknown(line, kind, name.clone()));
        }
    }
    Ok(())
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    }
}

fn parse_condition(text: &str) -> Option<(String, bool)> {
    let (negate, rest) = match text.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let inner = rest
        .strip_prefix("connected")?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?
        .trim();
    let valid = !inner.is_empty() && inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| (inner.to_string(), negate))
}

fn parse_segments(text: &str, line: usize) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| TemplateError::syntax(line, "unterminated placeholder '${'"))?;
        let inner = &after[..end];
        let (expr_text, format) = match inner.split_once(':') {
            Some((e, f)) => {
                let format = PlaceholderFormat::parse(f.trim()).ok_or_else(|| {
                    TemplateError::syntax(line, format!("unknown format '{}'", f.trim()))
                })?;
                (e, format)
            }
            None => (inner, PlaceholderFormat::Plain),
        };
        let expr = Expr::parse(expr_text.trim()).map_err(|m| TemplateError::syntax(line, m))?;
        segments.push(Segment::Placeholder { expr, format });
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}
