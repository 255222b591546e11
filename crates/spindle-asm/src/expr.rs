//! Operand expressions.
//!
//! Literals: decimal integers, reals (`0.5`, `-1.0`, `1e-3`), hexadecimal
//! (`$1F`, `0x1F`) and binary (`%1010`, `0b1010`). Symbols may carry a memory
//! suffix: `name^` (midpoint) or `name#` (end).
//!
//! Operators, loosest first: `|`, `^^` (xor; a lone `^` also works where it
//! cannot be a suffix), `&`, `<<` `>>`, `+` `-`, `*` `/`, and unary `-` `~`.
//! Integer arithmetic stays integer; anything touching a real is real.

use crate::error::AsmError;

/// Memory symbol suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suffix {
    /// Plain name.
    None,
    /// `^`: midpoint.
    Mid,
    /// `#`: end.
    End,
}

/// An evaluated operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// Integer: raw bits, addresses, register numbers.
    Int(i64),
    /// Real: converted to fixed point by the field that consumes it.
    Real(f64),
}

impl Value {
    /// Numeric value as a float.
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(i) => i as f64,
            Value::Real(r) => r,
        }
    }
}

/// Binary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Real literal.
    Real(f64),
    /// Symbol reference.
    Symbol(String, Suffix),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Bitwise not.
    Not(Box<Expr>),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parses operand text.
    pub fn parse(text: &str) -> Result<Expr, AsmError> {
        let tokens = tokenize(text).map_err(|reason| AsmError::malformed(text, reason))?;
        if tokens.is_empty() {
            return Err(AsmError::malformed(text, "empty expression"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser
            .binary(0)
            .map_err(|reason| AsmError::malformed(text, reason))?;
        if parser.pos < parser.tokens.len() {
            return Err(AsmError::malformed(
                text,
                format!("unexpected {:?}", parser.tokens[parser.pos]),
            ));
        }
        Ok(expr)
    }

    /// If the expression is a bare symbol, its name.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name, Suffix::None) => Some(name),
            _ => None,
        }
    }

    /// Evaluates with `resolve` supplying symbol values.
    pub fn eval(
        &self,
        resolve: &mut dyn FnMut(&str, Suffix) -> Result<Value, AsmError>,
    ) -> Result<Value, AsmError> {
        Ok(match self {
            Expr::Int(i) => Value::Int(*i),
            Expr::Real(r) => Value::Real(*r),
            Expr::Symbol(name, suffix) => resolve(name, *suffix)?,
            Expr::Neg(e) => match e.eval(resolve)? {
                Value::Int(i) => Value::Int(i.wrapping_neg()),
                Value::Real(r) => Value::Real(-r),
            },
            Expr::Not(e) => Value::Int(!int_operand(e.eval(resolve)?)?),
            Expr::Binary(op, a, b) => {
                let (a, b) = (a.eval(resolve)?, b.eval(resolve)?);
                apply(*op, a, b)?
            }
        })
    }
}

fn int_operand(value: Value) -> Result<i64, AsmError> {
    match value {
        Value::Int(i) => Ok(i),
        Value::Real(r) => Err(AsmError::NotInteger {
            field: "bitwise operand",
            value: r,
        }),
    }
}

fn apply(op: BinOp, a: Value, b: Value) -> Result<Value, AsmError> {
    match op {
        BinOp::Or | BinOp::Xor | BinOp::And | BinOp::Shl | BinOp::Shr => {
            let (x, y) = (int_operand(a)?, int_operand(b)?);
            let shift = (y.clamp(0, 63)) as u32;
            Ok(Value::Int(match op {
                BinOp::Or => x | y,
                BinOp::Xor => x ^ y,
                BinOp::And => x & y,
                BinOp::Shl => x.wrapping_shl(shift),
                _ => x.wrapping_shr(shift),
            }))
        }
        _ => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match op {
                BinOp::Add => x.wrapping_add(y),
                BinOp::Sub => x.wrapping_sub(y),
                BinOp::Mul => x.wrapping_mul(y),
                _ => {
                    if y == 0 {
                        return Err(AsmError::DivisionByZero);
                    }
                    x.wrapping_div(y)
                }
            })),
            (a, b) => {
                let (x, y) = (a.as_f64(), b.as_f64());
                Ok(Value::Real(match op {
                    BinOp::Add => x + y,
                    BinOp::Sub => x - y,
                    BinOp::Mul => x * y,
                    _ => {
                        if y == 0.0 {
                            return Err(AsmError::DivisionByZero);
                        }
                        x / y
                    }
                }))
            }
        },
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Int(i64),
    Real(f64),
    Ident(String, Suffix),
    Op(&'static str),
}

const OPERATORS: &[&str] = &["<<", ">>", "^^", "+", "-", "*", "/", "|", "&", "^", "~", "(", ")"];

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let rest = &text[i..];
        if let Some(digits) = rest.strip_prefix('$') {
            let (value, len) = radix_literal(digits, 16)?;
            tokens.push(Token::Int(value));
            i += 1 + len;
        } else if let Some(digits) = rest.strip_prefix('%') {
            let (value, len) = radix_literal(digits, 2)?;
            tokens.push(Token::Int(value));
            i += 1 + len;
        } else if let Some(digits) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            let (value, len) = radix_literal(digits, 16)?;
            tokens.push(Token::Int(value));
            i += 2 + len;
        } else if let Some(digits) = rest
            .strip_prefix("0b")
            .or_else(|| rest.strip_prefix("0B"))
            .filter(|d| d.starts_with(['0', '1']))
        {
            let (value, len) = radix_literal(digits, 2)?;
            tokens.push(Token::Int(value));
            i += 2 + len;
        } else if c.is_ascii_digit() || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) {
            let len = decimal_len(rest);
            let literal = &rest[..len];
            if literal.contains(['.', 'e', 'E']) {
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("malformed number '{literal}'"))?;
                tokens.push(Token::Real(value));
            } else {
                let value = literal
                    .parse::<i64>()
                    .map_err(|_| format!("integer '{literal}' is too large"))?;
                tokens.push(Token::Int(value));
            }
            i += len;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len());
            let name = rest[..len].to_string();
            i += len;
            let suffix = match bytes.get(i) {
                Some(b'#') => {
                    i += 1;
                    Suffix::End
                }
                Some(b'^') if bytes.get(i + 1) != Some(&b'^') => {
                    i += 1;
                    Suffix::Mid
                }
                _ => Suffix::None,
            };
            tokens.push(Token::Ident(name, suffix));
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token::Op(op));
            i += op.len();
        } else {
            return Err(format!("unexpected character '{c}'"));
        }
    }
    Ok(tokens)
}

fn radix_literal(digits: &str, radix: u32) -> Result<(i64, usize), String> {
    let len = digits
        .find(|c: char| !(c.is_digit(radix) || c == '_'))
        .unwrap_or(digits.len());
    let cleaned: String = digits[..len].chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err("missing digits after radix prefix".to_string());
    }
    let value = i64::from_str_radix(&cleaned, radix)
        .map_err(|_| format!("literal '{cleaned}' is too large"))?;
    Ok((value, len))
}

fn decimal_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

/// Binding power table: (operator, precedence, op).
const BINARY: &[(&str, u8, BinOp)] = &[
    ("|", 1, BinOp::Or),
    ("^^", 2, BinOp::Xor),
    ("^", 2, BinOp::Xor),
    ("&", 3, BinOp::And),
    ("<<", 4, BinOp::Shl),
    (">>", 4, BinOp::Shr),
    ("+", 5, BinOp::Add),
    ("-", 5, BinOp::Sub),
    ("*", 6, BinOp::Mul),
    ("/", 6, BinOp::Div),
];

/// Deepest nesting of parentheses and unary operators accepted.
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek_binary(&self) -> Option<(u8, BinOp)> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => BINARY
                .iter()
                .find(|(text, _, _)| text == op)
                .map(|&(_, prec, bin)| (prec, bin)),
            _ => None,
        }
    }

    /// Precedence climbing; all binary operators are left-associative.
    fn binary(&mut self, min_prec: u8) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        while let Some((prec, op)) = self.peek_binary() {
            if prec <= min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.depth >= MAX_NESTING {
            return Err(format!("expression nested deeper than {MAX_NESTING} levels"));
        }
        self.depth += 1;
        let expr = self.operand();
        self.depth -= 1;
        expr
    }

    fn operand(&mut self) -> Result<Expr, String> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Op("-")) => Ok(match self.unary()? {
                Expr::Int(i) => Expr::Int(-i),
                Expr::Real(r) => Expr::Real(-r),
                other => Expr::Neg(Box::new(other)),
            }),
            Some(Token::Op("+")) => self.unary(),
            Some(Token::Op("~")) => Ok(Expr::Not(Box::new(self.unary()?))),
            Some(Token::Op("(")) => {
                let inner = self.binary(0)?;
                match self.tokens.get(self.pos) {
                    Some(Token::Op(")")) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Real(r)) => Ok(Expr::Real(r)),
            Some(Token::Ident(name, suffix)) => Ok(Expr::Symbol(name, suffix)),
            Some(Token::Op(op)) => Err(format!("unexpected '{op}'")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Value {
        Expr::parse(text)
            .unwrap()
            .eval(&mut |name, suffix| match (name, suffix) {
                ("K", Suffix::None) => Ok(Value::Int(10)),
                ("half", Suffix::None) => Ok(Value::Real(0.5)),
                ("buf", Suffix::Mid) => Ok(Value::Int(50)),
                ("buf", Suffix::End) => Ok(Value::Int(99)),
                _ => Err(AsmError::UndefinedSymbol(name.to_string())),
            })
            .unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42"), Value::Int(42));
        assert_eq!(eval("-1.0"), Value::Real(-1.0));
        assert_eq!(eval("1e-3"), Value::Real(0.001));
        assert_eq!(eval("$1F"), Value::Int(31));
        assert_eq!(eval("0x1f"), Value::Int(31));
        assert_eq!(eval("%1010"), Value::Int(10));
        assert_eq!(eval("0b1010"), Value::Int(10));
        assert_eq!(eval("$FF_FF"), Value::Int(0xFFFF));
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("10 - 2 - 3"), Value::Int(5));
        assert_eq!(eval("1 << 4 | 1"), Value::Int(17));
        assert_eq!(eval("$F0 & $3C ^^ $FF"), Value::Int(0xF0 & 0x3C ^ 0xFF));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("~0 & $FF"), Value::Int(0xFF));
    }

    #[test]
    fn symbols_and_suffixes() {
        assert_eq!(eval("K * 2"), Value::Int(20));
        assert_eq!(eval("buf# - buf^"), Value::Int(49));
        assert_eq!(eval("half * 2"), Value::Real(1.0));
        assert_eq!(eval("-half"), Value::Real(-0.5));
    }

    #[test]
    fn errors() {
        assert!(Expr::parse("").is_err());
        assert!(Expr::parse("(1").is_err());
        assert!(Expr::parse("1 2").is_err());
        assert!(Expr::parse("1 @ 2").is_err());
        let err = Expr::parse("1/0").unwrap().eval(&mut |_, _| Ok(Value::Int(0)));
        assert_eq!(err, Err(AsmError::DivisionByZero));
        let err = Expr::parse("0.5 | 1").unwrap().eval(&mut |_, _| Ok(Value::Int(0)));
        assert!(matches!(err, Err(AsmError::NotInteger { .. })));
    }

    #[test]
    fn nesting_is_bounded() {
        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(eval(&shallow), Value::Int(1));
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(Expr::parse(&deep), Err(AsmError::MalformedOperand { .. })));
        assert!(Expr::parse(&"-".repeat(100_000)).is_err());
    }

    #[test]
    fn bare_symbol() {
        assert_eq!(Expr::parse("loop").unwrap().as_symbol(), Some("loop"));
        assert_eq!(Expr::parse("buf#").unwrap().as_symbol(), None);
    }
}
