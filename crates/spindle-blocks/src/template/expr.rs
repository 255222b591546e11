//! Placeholder expression grammar.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := number
//!          | '(' expr ')'
//!          | func '(' expr (',' expr)* ')'
//!          | namespace '.' ident ('^' | '#')?
//! ```
//!
//! Namespaces are `param`, `input`, `output`, `reg`, `mem` and `label`. The
//! `^`/`#` suffixes only apply to `mem` references.

use core::fmt;

/// A named function callable from a placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
    /// `clamp(x, lo, hi)`
    Clamp,
    /// `db(x)`: decibels to linear gain.
    Db,
    /// `remap_scale(a0, a1, b0, b1)`: slope of the line mapping `a0..a1` onto `b0..b1`.
    RemapScale,
    /// `remap_offset(a0, a1, b0, b1)`: intercept of the same line.
    RemapOffset,
    /// `onepole(hz)`: one-pole low-pass coefficient at the chip sample rate.
    Onepole,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "min" => Function::Min,
            "max" => Function::Max,
            "clamp" => Function::Clamp,
            "db" => Function::Db,
            "remap_scale" => Function::RemapScale,
            "remap_offset" => Function::RemapOffset,
            "onepole" => Function::Onepole,
            _ => return None,
        })
    }

    /// Number of arguments.
    pub const fn arity(self) -> usize {
        match self {
            Function::Db | Function::Onepole => 1,
            Function::Min | Function::Max => 2,
            Function::Clamp => 3,
            Function::RemapScale | Function::RemapOffset => 4,
        }
    }

    /// Name as written in templates.
    pub const fn name(self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Clamp => "clamp",
            Function::Db => "db",
            Function::RemapScale => "remap_scale",
            Function::RemapOffset => "remap_offset",
            Function::Onepole => "onepole",
        }
    }
}

/// Which word of a memory region a `mem` reference names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemPoint {
    /// First word.
    Start,
    /// Midpoint (`^`).
    Middle,
    /// Last word (`#`).
    End,
}

/// A reference to something in the block's environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// `param.<id>`
    Param(String),
    /// `input.<port>`: the driving register.
    Input(String),
    /// `output.<port>`: the register allocated for the output.
    Output(String),
    /// `reg.<name>`: a block-private scratch register.
    Scratch(String),
    /// `mem.<name>`: a region declared with `@mem`.
    Memory(String, MemPoint),
    /// `label.<name>`: a label unique to this block instance.
    Label(String),
}

impl Reference {
    fn namespace(&self) -> &'static str {
        match self {
            Reference::Param(_) => "param",
            Reference::Input(_) => "input",
            Reference::Output(_) => "output",
            Reference::Scratch(_) => "reg",
            Reference::Memory(..) => "mem",
            Reference::Label(_) => "label",
        }
    }

    fn name(&self) -> &str {
        match self {
            Reference::Param(n)
            | Reference::Input(n)
            | Reference::Output(n)
            | Reference::Scratch(n)
            | Reference::Memory(n, _)
            | Reference::Label(n) => n,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace(), self.name())?;
        match self {
            Reference::Memory(_, MemPoint::Middle) => f.write_str("^"),
            Reference::Memory(_, MemPoint::End) => f.write_str("#"),
            _ => Ok(()),
        }
    }
}

/// Binary arithmetic operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Parsed placeholder expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Environment reference.
    Ref(Reference),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Function call with checked arity.
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Parses an expression, rejecting trailing input.
    pub fn parse(text: &str) -> Result<Expr, String> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(format!("unexpected {tok} in '{text}'")),
        }
    }

    /// Visits every reference in the expression.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(r) => out.push(r),
            Expr::Neg(e) => e.collect(out),
            Expr::Binary(_, a, b) => {
                a.collect(out);
                b.collect(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect(out)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Punct(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(s) => write!(f, "'{s}'"),
            Token::Punct(c) => write!(f, "'{c}'"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                let mut j = i + 1;
                if j < chars.len() && matches!(chars[j], '+' | '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| format!("malformed number '{literal}'"))?;
            tokens.push(Token::Number(value));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if "+-*/(),.^#".contains(c) {
            tokens.push(Token::Punct(c));
            i += 1;
        } else {
            return Err(format!("unexpected character '{c}'"));
        }
    }
    Ok(tokens)
}

/// Deepest nesting of parentheses, calls and unary minus accepted.
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(tok) => format!("expected '{c}', found {tok}"),
                None => format!("expected '{c}' before end of expression"),
            })
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat('+') {
                BinOp::Add
            } else if self.eat('-') {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinOp::Mul
            } else if self.eat('/') {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.depth >= MAX_NESTING {
            return Err(format!("expression nested deeper than {MAX_NESTING} levels"));
        }
        self.depth += 1;
        let expr = if self.eat('-') {
            self.unary().map(|inner| Expr::Neg(Box::new(inner)))
        } else {
            self.primary()
        };
        self.depth -= 1;
        expr
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Punct('(')) => {
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.eat('(') {
                    let func = Function::from_name(&name)
                        .ok_or_else(|| format!("unknown function '{name}'"))?;
                    let mut args = Vec::new();
                    if !self.eat(')') {
                        loop {
                            args.push(self.expr()?);
                            if self.eat(')') {
                                break;
                            }
                            self.expect(',')?;
                        }
                    }
                    if args.len() != func.arity() {
                        return Err(format!(
                            "{}() takes {} argument(s), got {}",
                            func.name(),
                            func.arity(),
                            args.len()
                        ));
                    }
                    return Ok(Expr::Call(func, args));
                }
                self.expect('.')
                    .map_err(|_| format!("'{name}' must be qualified, e.g. param.{name}"))?;
                let Some(Token::Ident(item)) = self.next() else {
                    return Err(format!("expected a name after '{name}.'"));
                };
                let reference = match name.as_str() {
                    "param" => Reference::Param(item),
                    "input" => Reference::Input(item),
                    "output" => Reference::Output(item),
                    "reg" => Reference::Scratch(item),
                    "label" => Reference::Label(item),
                    "mem" => {
                        let point = if self.eat('^') {
                            MemPoint::Middle
                        } else if self.eat('#') {
                            MemPoint::End
                        } else {
                            MemPoint::Start
                        };
                        Reference::Memory(item, point)
                    }
                    other => return Err(format!("unknown namespace '{other}'")),
                };
                Ok(Expr::Ref(reference))
            }
            Some(tok) => Err(format!("unexpected {tok}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
