//! Symbol table: labels, `EQU` values, and `MEM` blocks.
//!
//! Names are case-insensitive and stored upper-cased. User definitions shadow
//! the chip's predefined register names and constants.

use std::collections::HashMap;

use spindle_core::chip::{PREDEFINED_CONSTANTS, register_by_name};

use crate::error::AsmError;
use crate::expr::{Expr, Suffix, Value};

#[derive(Clone, Debug)]
enum Definition {
    Label(usize),
    Equ(Expr),
    Mem(Expr),
}

#[derive(Clone, Debug)]
struct Entry {
    line: usize,
    definition: Definition,
}

/// An allocated delay-memory block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MemoryBlock {
    start: usize,
    size: usize,
}

/// Outcome of a definition that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Defined {
    New,
    ShadowsPredefined,
}

#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    entries: HashMap<String, Entry>,
    mem_order: Vec<String>,
    memory: HashMap<String, MemoryBlock>,
    cache: HashMap<String, Value>,
    legacy_memory: bool,
}

fn predefined(key: &str) -> Option<i64> {
    if let Some(addr) = register_by_name(key) {
        return Some(i64::from(addr.0));
    }
    PREDEFINED_CONSTANTS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, value)| value)
}

impl SymbolTable {
    pub fn new(legacy_memory: bool) -> Self {
        Self {
            legacy_memory,
            ..Self::default()
        }
    }

    fn define(&mut self, name: &str, line: usize, definition: Definition) -> Result<Defined, AsmError> {
        let key = name.to_ascii_uppercase();
        if let Some(existing) = self.entries.get(&key) {
            return Err(AsmError::DuplicateSymbol {
                name: name.to_string(),
                first_line: existing.line,
            });
        }
        if matches!(definition, Definition::Mem(_)) {
            self.mem_order.push(key.clone());
        }
        let shadows = predefined(&key).is_some();
        self.entries.insert(key, Entry { line, definition });
        Ok(if shadows {
            Defined::ShadowsPredefined
        } else {
            Defined::New
        })
    }

    pub fn define_label(&mut self, name: &str, line: usize, pc: usize) -> Result<Defined, AsmError> {
        self.define(name, line, Definition::Label(pc))
    }

    pub fn define_equ(&mut self, name: &str, line: usize, value: Expr) -> Result<Defined, AsmError> {
        self.define(name, line, Definition::Equ(value))
    }

    pub fn define_mem(&mut self, name: &str, line: usize, size: Expr) -> Result<Defined, AsmError> {
        self.define(name, line, Definition::Mem(size))
    }

    pub fn symbol_count(&self) -> usize {
        self.entries.len()
    }

    /// Address of a label, if `name` is one.
    pub fn label(&self, name: &str) -> Option<usize> {
        match self.entries.get(&name.to_ascii_uppercase())?.definition {
            Definition::Label(pc) => Some(pc),
            _ => None,
        }
    }

    /// Lays out `MEM` blocks in declaration order from address 0.
    ///
    /// Returns the words used and a per-line error list. A block that fails
    /// is left unallocated; references to it later report it undefined.
    pub fn allocate_memory(&mut self, memory_size: usize) -> (usize, Vec<(usize, AsmError)>) {
        let mut next = 0_usize;
        let mut errors = Vec::new();
        for key in self.mem_order.clone() {
            let Some(Entry {
                line,
                definition: Definition::Mem(size_expr),
            }) = self.entries.get(&key).cloned()
            else {
                continue;
            };
            let size = match self.eval(&size_expr) {
                Ok(Value::Int(size)) if size > 0 => size,
                Ok(Value::Int(size)) => {
                    errors.push((
                        line,
                        AsmError::MalformedDeclaration(format!("MEM {key} has size {size}")),
                    ));
                    continue;
                }
                Ok(Value::Real(value)) => {
                    errors.push((line, AsmError::NotInteger { field: "memory size", value }));
                    continue;
                }
                Err(err) => {
                    errors.push((line, err));
                    continue;
                }
            };
            let reserved = size.saturating_add(i64::from(self.legacy_memory));
            let available = memory_size.saturating_sub(next);
            if reserved > available as i64 {
                errors.push((
                    line,
                    AsmError::MemoryExhausted {
                        name: key.clone(),
                        size: reserved,
                        available,
                    },
                ));
                continue;
            }
            self.memory.insert(
                key,
                MemoryBlock {
                    start: next,
                    size: size as usize,
                },
            );
            next += reserved as usize;
        }
        (next, errors)
    }

    /// Evaluates an expression against this table.
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, AsmError> {
        let mut stack = Vec::new();
        self.eval_with(expr, &mut stack)
    }

    fn eval_with(&mut self, expr: &Expr, stack: &mut Vec<String>) -> Result<Value, AsmError> {
        expr.eval(&mut |name, suffix| self.resolve(name, suffix, stack))
    }

    fn resolve(&mut self, name: &str, suffix: Suffix, stack: &mut Vec<String>) -> Result<Value, AsmError> {
        let key = name.to_ascii_uppercase();
        if suffix != Suffix::None {
            let block = match self.entries.get(&key) {
                Some(Entry {
                    definition: Definition::Mem(_),
                    ..
                }) => self.memory.get(&key),
                Some(_) => return Err(AsmError::NotMemory(name.to_string())),
                None => None,
            };
            let block = block.ok_or_else(|| AsmError::UndefinedSymbol(name.to_string()))?;
            return Ok(Value::Int(self.memory_address(*block, suffix) as i64));
        }

        let Some(entry) = self.entries.get(&key).cloned() else {
            return predefined(&key)
                .map(Value::Int)
                .ok_or_else(|| AsmError::UndefinedSymbol(name.to_string()));
        };
        match entry.definition {
            Definition::Label(pc) => Ok(Value::Int(pc as i64)),
            Definition::Mem(_) => self
                .memory
                .get(&key)
                .map(|block| Value::Int(block.start as i64))
                .ok_or_else(|| AsmError::UndefinedSymbol(name.to_string())),
            Definition::Equ(expr) => {
                if let Some(value) = self.cache.get(&key) {
                    return Ok(*value);
                }
                if stack.contains(&key) {
                    return Err(AsmError::CircularDefinition(name.to_string()));
                }
                stack.push(key.clone());
                let value = self.eval_with(&expr, stack);
                stack.pop();
                let value = value?;
                self.cache.insert(key, value);
                Ok(value)
            }
        }
    }

    fn memory_address(&self, block: MemoryBlock, suffix: Suffix) -> usize {
        match suffix {
            Suffix::None => block.start,
            Suffix::Mid => block.start + block.size / 2,
            Suffix::End if self.legacy_memory => block.start + block.size,
            Suffix::End => block.start + block.size - 1,
        }
    }
}
