//! Template expansion against a code generation context.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use spindle_core::chip::SAMPLE_RATE;
use spindle_core::{CodegenContext, IrNode, MemoryHandle, Section, format_real};

use super::body::{Body, BodyItem, PlaceholderFormat, Segment};
use super::expr::{BinOp, Expr, Function, MemPoint, Reference};
use crate::BlockEnv;
use crate::error::{GenerateError, TemplateError};

/// Result of evaluating a placeholder.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    Number(f64),
    Symbol(String),
}

/// One expansion of one template body for one block instance.
pub(crate) struct Expander<'a> {
    env: &'a BlockEnv<'a>,
    memory: BTreeMap<String, MemoryHandle>,
    labels: BTreeMap<String, String>,
    section: Section,
}

impl<'a> Expander<'a> {
    pub(crate) fn new(env: &'a BlockEnv<'a>) -> Self {
        Self {
            env,
            memory: BTreeMap::new(),
            labels: BTreeMap::new(),
            section: Section::Main,
        }
    }

    pub(crate) fn run(mut self, body: &Body, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
        for decl in &body.memory {
            let size = self.number(&decl.size, decl.line, ctx)?;
            if !size.is_finite() || size < 1.0 {
                return Err(TemplateError::InvalidLine {
                    line: decl.line,
                    message: format!("memory '{}' size {} is not a positive length", decl.name, size),
                }
                .into());
            }
            let handle = ctx.allocate_memory(self.env.id, &decl.name, size.round() as usize)?;
            self.memory.insert(decl.name.clone(), handle);
        }
        self.items(&body.items, ctx)
    }

    fn items(&mut self, items: &[BodyItem], ctx: &mut CodegenContext) -> Result<(), GenerateError> {
        for item in items {
            match item {
                BodyItem::Section(section) => self.section = *section,
                BodyItem::Line { line, segments } => {
                    let text = self.render(segments, *line, ctx)?;
                    self.emit_line(&text, *line, ctx)?;
                }
                BodyItem::If {
                    port,
                    negate,
                    then,
                    otherwise,
                    ..
                } => {
                    let connected = ctx.is_input_connected(self.env.id, port)
                        || ctx.is_output_connected(self.env.id, port);
                    if connected != *negate {
                        self.items(then, ctx)?;
                    } else {
                        self.items(otherwise, ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn render(
        &mut self,
        segments: &[Segment],
        line: usize,
        ctx: &mut CodegenContext,
    ) -> Result<String, GenerateError> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder { expr, format } => {
                    let value = self.eval(expr, line, ctx)?;
                    let text = match (value, format) {
                        (Value::Symbol(s), PlaceholderFormat::Plain) => s,
                        (Value::Symbol(s), _) => {
                            return Err(TemplateError::NotANumber { line, name: s }.into());
                        }
                        (Value::Number(n), PlaceholderFormat::Plain) => format_real(n),
                        (Value::Number(n), PlaceholderFormat::Int) => {
                            format!("{}", n.round() as i64)
                        }
                        (Value::Number(n), PlaceholderFormat::Fixed(f)) => {
                            ctx.fixed_operand(self.section, n, *f)
                        }
                    };
                    out.push_str(&text);
                }
            }
        }
        Ok(out)
    }

    /// Turns one expanded line into an IR node in the current section.
    fn emit_line(
        &mut self,
        text: &str,
        line: usize,
        ctx: &mut CodegenContext,
    ) -> Result<(), GenerateError> {
        let (code, comment) = match text.split_once(';') {
            Some((code, comment)) => (code.trim(), Some(comment.trim())),
            None => (text.trim(), None),
        };
        if code.is_empty() {
            if let Some(comment) = comment {
                ctx.comment(self.section, comment);
            }
            return Ok(());
        }
        if let Some(label) = code.strip_suffix(':') {
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(invalid(line, format!("malformed label '{code}'")));
            }
            ctx.emit(IrNode::label(self.section, label))?;
            return Ok(());
        }

        let (mnemonic, rest) = match code.find(char::is_whitespace) {
            Some(i) => (&code[..i], code[i..].trim()),
            None => (code, ""),
        };
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        if operands.iter().any(|o| o.is_empty()) {
            return Err(invalid(line, format!("empty operand in '{code}'")));
        }

        let mut node = if self.section == Section::Header {
            match (mnemonic.to_ascii_lowercase().as_str(), operands.as_slice()) {
                ("equ", [name, value]) => IrNode::equ(*name, *value),
                ("mem", [name, size]) => {
                    let size = size
                        .parse::<usize>()
                        .map_err(|_| invalid(line, format!("memory size '{size}' is not an integer")))?;
                    IrNode::mem(*name, size)
                }
                _ => {
                    return Err(invalid(
                        line,
                        format!("header lines must be 'equ name, value' or 'mem name, size', found '{code}'"),
                    ));
                }
            }
        } else {
            IrNode::instruction(self.section, mnemonic, &operands)
        };
        if let Some(comment) = comment.filter(|c| !c.is_empty()) {
            node = node.with_comment(comment);
        }
        ctx.emit(node)?;
        Ok(())
    }

    fn number(
        &mut self,
        expr: &Expr,
        line: usize,
        ctx: &mut CodegenContext,
    ) -> Result<f64, GenerateError> {
        match self.eval(expr, line, ctx)? {
            Value::Number(n) => Ok(n),
            Value::Symbol(name) => Err(TemplateError::NotANumber { line, name }.into()),
        }
    }

    fn eval(
        &mut self,
        expr: &Expr,
        line: usize,
        ctx: &mut CodegenContext,
    ) -> Result<Value, GenerateError> {
        let value = match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Ref(reference) => self.resolve(reference, line, ctx)?,
            Expr::Neg(inner) => Value::Number(-self.number(inner, line, ctx)?),
            Expr::Binary(op, lhs, rhs) => {
                let a = self.number(lhs, line, ctx)?;
                let b = self.number(rhs, line, ctx)?;
                Value::Number(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            return Err(TemplateError::DivisionByZero { line }.into());
                        }
                        a / b
                    }
                })
            }
            Expr::Call(func, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.number(arg, line, ctx)?);
                }
                Value::Number(call(*func, &values, line)?)
            }
        };
        Ok(value)
    }

    fn resolve(
        &mut self,
        reference: &Reference,
        line: usize,
        ctx: &mut CodegenContext,
    ) -> Result<Value, GenerateError> {
        let id = self.env.id;
        Ok(match reference {
            Reference::Param(name) => Value::Number(self.env.param(name)),
            Reference::Input(port) => match ctx.input_register(id, port)? {
                Some(reg) => Value::Symbol(reg.name()),
                None => {
                    return Err(TemplateError::UnconnectedInput {
                        line,
                        port: port.clone(),
                    }
                    .into());
                }
            },
            Reference::Output(port) => Value::Symbol(ctx.allocate_register(id, port)?.name()),
            Reference::Scratch(name) => {
                Value::Symbol(ctx.allocate_register(id, &format!("reg.{name}"))?.name())
            }
            Reference::Memory(name, point) => {
                let handle = self
                    .memory
                    .get(name)
                    .ok_or_else(|| TemplateError::unknown(line, "mem", name.clone()))?;
                Value::Symbol(match point {
                    MemPoint::Start => handle.start(),
                    MemPoint::Middle => handle.middle(),
                    MemPoint::End => handle.end(),
                })
            }
            Reference::Label(name) => {
                if let Some(label) = self.labels.get(name) {
                    Value::Symbol(label.clone())
                } else {
                    let label = ctx.unique_label(&format!("{id}_{name}"));
                    self.labels.insert(name.clone(), label.clone());
                    Value::Symbol(label)
                }
            }
        })
    }
}

fn invalid(line: usize, message: String) -> GenerateError {
    TemplateError::InvalidLine { line, message }.into()
}

fn call(func: Function, args: &[f64], line: usize) -> Result<f64, TemplateError> {
    Ok(match (func, args) {
        (Function::Min, [a, b]) => a.min(*b),
        (Function::Max, [a, b]) => a.max(*b),
        (Function::Clamp, [x, lo, hi]) => x.max(*lo).min(*hi),
        (Function::Db, [db]) => 10f64.powf(db / 20.0),
        (Function::RemapScale, [a0, a1, b0, b1]) => remap(*a0, *a1, *b0, *b1, line)?.0,
        (Function::RemapOffset, [a0, a1, b0, b1]) => remap(*a0, *a1, *b0, *b1, line)?.1,
        (Function::Onepole, [hz]) => 1.0 - (-2.0 * PI * hz / SAMPLE_RATE).exp(),
        _ => {
            return Err(TemplateError::syntax(
                line,
                format!("{}() takes {} argument(s)", func.name(), func.arity()),
            ));
        }
    })
}

/// Slope and intercept of the line through `(a0, b0)` and `(a1, b1)`.
fn remap(a0: f64, a1: f64, b0: f64, b1: f64, line: usize) -> Result<(f64, f64), TemplateError> {
    if a1 == a0 {
        return Err(TemplateError::DivisionByZero { line });
    }
    let scale = (b1 - b0) / (a1 - a0);
    Ok((scale, b0 - a0 * scale))
}
