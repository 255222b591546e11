//! Instruction encoding.
//!
//! Every instruction is one 32-bit word with the opcode in bits 4..0 and its
//! operand fields packed above it.

use spindle_core::FixedFormat;

use crate::error::AsmError;
use crate::expr::{Expr, Value};
use crate::symbols::SymbolTable;
use crate::AssemblerOptions;

/// Encodes one instruction at a time against a resolved symbol table.
pub(crate) struct Encoder<'a> {
    symbols: &'a mut SymbolTable,
    options: &'a AssemblerOptions,
    warnings: Vec<String>,
}

impl<'a> Encoder<'a> {
    pub fn new(symbols: &'a mut SymbolTable, options: &'a AssemblerOptions) -> Self {
        Self {
            symbols,
            options,
            warnings: Vec::new(),
        }
    }

    /// Warnings raised since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Encodes `mnemonic` at program counter `pc`.
    pub fn encode(&mut self, mnemonic: &str, operands: &[String], pc: usize) -> Result<u32, AsmError> {
        let ops = operands
            .iter()
            .map(|text| Expr::parse(text))
            .collect::<Result<Vec<_>, _>>()?;
        let count = |n: usize, expected: &'static str| {
            if ops.len() == n {
                Ok(())
            } else {
                Err(AsmError::OperandCount {
                    mnemonic: mnemonic.to_string(),
                    expected,
                    found: ops.len(),
                })
            }
        };

        let word = match mnemonic {
            "RDA" | "WRA" | "WRAP" => {
                count(2, "address, coefficient")?;
                let opcode = match mnemonic {
                    "RDA" => 0b00000,
                    "WRA" => 0b00010,
                    _ => 0b00011,
                };
                let c = self.real(&ops[1], FixedFormat::S1_9, "coefficient")?;
                let addr = self.unsigned(&ops[0], 16, "address")?;
                (c << 21) | (addr << 5) | opcode
            }
            "RMPA" => {
                count(1, "coefficient")?;
                (self.real(&ops[0], FixedFormat::S1_9, "coefficient")? << 21) | 0b00001
            }
            "RDAX" | "RDFX" | "WRAX" | "WRHX" | "WRLX" | "MAXX" => {
                count(2, "register, coefficient")?;
                let opcode = match mnemonic {
                    "RDAX" => 0b00100,
                    "RDFX" => 0b00101,
                    "WRAX" => 0b00110,
                    "WRHX" => 0b00111,
                    "WRLX" => 0b01000,
                    _ => 0b01001,
                };
                let reg = self.unsigned(&ops[0], 6, "register")?;
                let c = self.real(&ops[1], FixedFormat::S1_14, "coefficient")?;
                (c << 16) | (reg << 5) | opcode
            }
            "LDAX" => {
                count(1, "register")?;
                (self.unsigned(&ops[0], 6, "register")? << 5) | 0b00101
            }
            "ABSA" => {
                count(0, "no operands")?;
                0b01001
            }
            "MULX" => {
                count(1, "register")?;
                (self.unsigned(&ops[0], 6, "register")? << 5) | 0b01010
            }
            "LOG" | "EXP" | "SOF" => {
                count(2, "coefficient, offset")?;
                let (opcode, d_format) = match mnemonic {
                    "LOG" => (0b01011, FixedFormat::S4_6),
                    "EXP" => (0b01100, FixedFormat::S_10),
                    _ => (0b01101, FixedFormat::S_10),
                };
                let c = self.real(&ops[0], FixedFormat::S1_14, "coefficient")?;
                let d = self.real(&ops[1], d_format, "offset")?;
                (c << 16) | (d << 5) | opcode
            }
            "AND" | "OR" | "XOR" => {
                count(1, "mask")?;
                let opcode = match mnemonic {
                    "AND" => 0b01110,
                    "OR" => 0b01111,
                    _ => 0b10000,
                };
                (self.bits(&ops[0], 24, "mask")? << 8) | opcode
            }
            "CLR" => {
                count(0, "no operands")?;
                0b01110
            }
            "NOT" => {
                count(0, "no operands")?;
                (0x00FF_FFFF << 8) | 0b10000
            }
            "SKP" => {
                count(2, "condition, target")?;
                let cond = self.unsigned(&ops[0], 5, "condition")?;
                let n = self.skip_distance(&ops[1], pc)?;
                (cond << 27) | (n << 21) | 0b10001
            }
            "JMP" => {
                count(1, "target")?;
                (self.skip_distance(&ops[0], pc)? << 21) | 0b10001
            }
            "NOP" => {
                count(0, "no operands")?;
                0b10001
            }
            "WLDS" => {
                count(3, "oscillator, frequency, amplitude")?;
                let osc = self.unsigned(&ops[0], 1, "oscillator")?;
                let freq = self.unsigned(&ops[1], 9, "frequency")?;
                let amp = self.unsigned(&ops[2], 15, "amplitude")?;
                (osc << 29) | (freq << 20) | (amp << 5) | 0b10010
            }
            "WLDR" => {
                count(3, "ramp, frequency, amplitude")?;
                let osc = self.ramp(&ops[0])?;
                let freq = self.signed(&ops[1], 16, "frequency")?;
                let amp = match self.int(&ops[2], "amplitude")? {
                    4096 => 0,
                    2048 => 1,
                    1024 => 2,
                    512 => 3,
                    _ => {
                        return Err(AsmError::malformed(
                            &operands[2],
                            "ramp amplitude must be 512, 1024, 2048 or 4096",
                        ));
                    }
                };
                (1 << 30) | (osc << 29) | (freq << 13) | (amp << 5) | 0b10010
            }
            "JAM" => {
                count(1, "ramp")?;
                (1 << 7) | (self.ramp(&ops[0])? << 6) | 0b10011
            }
            "CHO" => self.cho(&ops)?,
            "RAW" => {
                count(1, "word")?;
                self.bits(&ops[0], 32, "word")?
            }
            _ => return Err(AsmError::UnknownMnemonic(mnemonic.to_string())),
        };
        Ok(word)
    }

    fn cho(&mut self, ops: &[Expr]) -> Result<u32, AsmError> {
        let operand_count = |expected| AsmError::OperandCount {
            mnemonic: "CHO".to_string(),
            expected,
            found: ops.len(),
        };
        let Some(first) = ops.first() else {
            return Err(operand_count("type, oscillator, flags, value"));
        };
        let kind = self.unsigned(first, 2, "CHO type")?;
        let (flags, value) = match kind {
            // RDA
            0 => {
                if ops.len() != 4 {
                    return Err(operand_count("RDA, oscillator, flags, address"));
                }
                (
                    self.unsigned(&ops[2], 6, "flags")?,
                    self.unsigned(&ops[3], 16, "address")?,
                )
            }
            // SOF
            2 => {
                if ops.len() != 4 {
                    return Err(operand_count("SOF, oscillator, flags, offset"));
                }
                (
                    self.unsigned(&ops[2], 6, "flags")?,
                    self.real(&ops[3], FixedFormat::S_15, "offset")?,
                )
            }
            // RDAL
            3 => {
                let flags = match ops.len() {
                    2 => 0,
                    3 => self.unsigned(&ops[2], 6, "flags")?,
                    _ => return Err(operand_count("RDAL, oscillator[, flags]")),
                };
                (flags, 0)
            }
            other => {
                return Err(AsmError::FieldOverflow {
                    field: "CHO type",
                    value: i64::from(other),
                    bits: 2,
                });
            }
        };
        let osc = self.unsigned(&ops[1], 2, "oscillator")?;
        Ok((kind << 30) | (flags << 24) | (osc << 21) | (value << 5) | 0b10100)
    }

    fn value(&mut self, expr: &Expr) -> Result<Value, AsmError> {
        self.symbols.eval(expr)
    }

    fn int(&mut self, expr: &Expr, field: &'static str) -> Result<i64, AsmError> {
        match self.value(expr)? {
            Value::Int(value) => Ok(value),
            Value::Real(value) => Err(AsmError::NotInteger { field, value }),
        }
    }

    fn unsigned(&mut self, expr: &Expr, bits: u32, field: &'static str) -> Result<u32, AsmError> {
        let value = self.int(expr, field)?;
        if (0..1_i64 << bits).contains(&value) {
            Ok(value as u32)
        } else {
            Err(AsmError::FieldOverflow { field, value, bits })
        }
    }

    fn signed(&mut self, expr: &Expr, bits: u32, field: &'static str) -> Result<u32, AsmError> {
        let value = self.int(expr, field)?;
        let half = 1_i64 << (bits - 1);
        if (-half..half).contains(&value) {
            Ok((value as u32) & mask(bits))
        } else {
            Err(AsmError::FieldOverflow { field, value, bits })
        }
    }

    /// Raw bit pattern that fits the field read either signed or unsigned.
    fn bits(&mut self, expr: &Expr, bits: u32, field: &'static str) -> Result<u32, AsmError> {
        let value = self.int(expr, field)?;
        fit_bits(value, bits, field)
    }

    /// Ramp oscillator selector; accepts `RMP0`/`RMP1` as well as 0/1.
    fn ramp(&mut self, expr: &Expr) -> Result<u32, AsmError> {
        let mut value = self.int(expr, "ramp")?;
        if value >= 2 {
            value -= 2;
        }
        if (0..=1).contains(&value) {
            Ok(value as u32)
        } else {
            Err(AsmError::FieldOverflow {
                field: "ramp",
                value,
                bits: 1,
            })
        }
    }

    fn skip_distance(&mut self, expr: &Expr, pc: usize) -> Result<u32, AsmError> {
        let distance = match expr.as_symbol().and_then(|name| self.symbols.label(name)) {
            Some(target) => target as i64 - (pc as i64 + 1),
            None => self.int(expr, "skip distance")?,
        };
        if (0..=63).contains(&distance) {
            Ok(distance as u32)
        } else {
            Err(AsmError::SkipOutOfRange(distance))
        }
    }

    /// Fixed-point operand. Reals are quantized; integers are raw bits.
    fn real(&mut self, expr: &Expr, format: FixedFormat, field: &'static str) -> Result<u32, AsmError> {
        let value = match self.value(expr)? {
            Value::Int(i @ (1 | 2)) if self.options.spin_reals => i as f64,
            Value::Int(raw) => return fit_bits(raw, format.bits(), field),
            Value::Real(value) => value,
        };
        let q = format.quantize(value);
        if q.clamped {
            if self.options.strict && !self.options.clamp_reals {
                return Err(AsmError::RealOutOfRange {
                    field,
                    value,
                    format: format.name(),
                    min: format.min_value(),
                    max: format.max_value(),
                });
            }
            self.warnings.push(format!(
                "{field} value {value} is outside the {} range; clamped to {}",
                format.name(),
                q.value()
            ));
        }
        Ok(q.field_bits())
    }
}

const fn mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

fn fit_bits(value: i64, bits: u32, field: &'static str) -> Result<u32, AsmError> {
    let signed_min = -(1_i64 << (bits - 1));
    let unsigned_max = (1_i64 << bits) - 1;
    if (signed_min..=unsigned_max).contains(&value) {
        Ok((value as u32) & mask(bits))
    } else {
        Err(AsmError::FieldOverflow { field, value, bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_with(options: &AssemblerOptions, line: &str) -> Result<u32, AsmError> {
        let mut symbols = SymbolTable::new(options.legacy_memory);
        let mut encoder = Encoder::new(&mut symbols, options);
        let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
        let operands: Vec<String> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(|s| s.trim().to_string()).collect()
        };
        encoder.encode(mnemonic, &operands, 0)
    }

    fn encode(line: &str) -> u32 {
        encode_with(&AssemblerOptions::default(), line).unwrap()
    }

    #[test]
    fn register_coefficient_forms() {
        // 1.0 in S1.14 is 0x4000; ADCL is 0x14.
        assert_eq!(encode("RDAX ADCL, 1.0"), (0x4000 << 16) | (0x14 << 5) | 0b00100);
        assert_eq!(encode("WRAX DACL, 0.0"), (0x16 << 5) | 0b00110);
        assert_eq!(encode("LDAX REG0"), (0x20 << 5) | 0b00101);
        assert_eq!(encode("ABSA"), 0b01001);
        assert_eq!(encode("MULX POT0"), (0x10 << 5) | 0b01010);
    }

    #[test]
    fn negative_coefficient_is_twos_complement() {
        // -1.0 in S1.14 is 0xC000.
        assert_eq!(encode("WRAX REG1, -1.0") >> 16, 0xC000);
        // -0.5 in S.10 is 0x600 in 11 bits.
        assert_eq!((encode("SOF 1.0, -0.5") >> 5) & 0x7FF, 0x600);
    }

    #[test]
    fn logic_and_pseudo_ops() {
        assert_eq!(encode("CLR"), 0x0000_000E);
        assert_eq!(encode("NOT"), 0xFFFF_FF10);
        assert_eq!(encode("AND $FFFF00"), 0xFFFF_000E);
        assert_eq!(encode("NOP"), spindle_core::chip::NOP_WORD);
        assert_eq!(encode("SKP RUN, 3"), (0x10 << 27) | (3 << 21) | 0b10001);
    }

    #[test]
    fn delay_memory_forms() {
        assert_eq!(encode("RDA 1000, 0.5"), (0x100 << 21) | (1000 << 5));
        assert_eq!(encode("RMPA 1.0"), (0x200 << 21) | 0b00001);
    }

    #[test]
    fn oscillator_forms() {
        assert_eq!(
            encode("WLDS SIN1, 12, 100"),
            (1 << 29) | (12 << 20) | (100 << 5) | 0b10010
        );
        assert_eq!(
            encode("WLDR RMP1, -16384, 1024"),
            (1 << 30) | (1 << 29) | (0xC000 << 13) | (2 << 5) | 0b10010
        );
        assert_eq!(encode("JAM RMP1"), (1 << 7) | (1 << 6) | 0b10011);
        assert_eq!(
            encode("CHO RDAL, SIN0"),
            (3 << 30) | 0b10100
        );
        assert_eq!(
            encode("CHO RDA, RMP0, REG | COMPC, 100"),
            (0x06 << 24) | (2 << 21) | (100 << 5) | 0b10100
        );
    }

    #[test]
    fn integer_in_real_field_is_raw_bits() {
        assert_eq!(encode("SOF 0, 0"), 0b01101);
        assert_eq!(encode("RDAX ADCL, $7FFF") >> 16, 0x7FFF);
        assert!(matches!(
            encode_with(&AssemblerOptions::default(), "RDAX ADCL, $1FFFF"),
            Err(AsmError::FieldOverflow { .. })
        ));
    }

    #[test]
    fn spin_reals_reads_small_integers_as_reals() {
        let options = AssemblerOptions {
            spin_reals: true,
            ..AssemblerOptions::default()
        };
        assert_eq!(encode_with(&options, "SOF 1, 0").unwrap() >> 16, 0x4000);
        assert_eq!(encode("SOF 1, 0") >> 16, 0x0001);
    }

    #[test]
    fn out_of_range_real_clamps_or_fails() {
        let lenient = AssemblerOptions::default();
        let mut symbols = SymbolTable::new(false);
        let mut encoder = Encoder::new(&mut symbols, &lenient);
        let word = encoder
            .encode("SOF", &["3.0".to_string(), "0".to_string()], 0)
            .unwrap();
        assert_eq!(word >> 16, 0x7FFF);
        assert_eq!(encoder.take_warnings().len(), 1);

        let strict = AssemblerOptions {
            strict: true,
            ..AssemblerOptions::default()
        };
        assert!(matches!(
            encode_with(&strict, "SOF 3.0, 0"),
            Err(AsmError::RealOutOfRange { .. })
        ));

        let permissive = AssemblerOptions {
            strict: true,
            clamp_reals: true,
            ..AssemblerOptions::default()
        };
        assert!(encode_with(&permissive, "SOF 3.0, 0").is_ok());
    }

    #[test]
    fn shape_errors() {
        let options = AssemblerOptions::default();
        assert!(matches!(
            encode_with(&options, "RDAX ADCL"),
            Err(AsmError::OperandCount { .. })
        ));
        assert!(matches!(
            encode_with(&options, "FROB 1"),
            Err(AsmError::UnknownMnemonic(_))
        ));
        assert!(matches!(
            encode_with(&options, "SKP RUN, 64"),
            Err(AsmError::SkipOutOfRange(64))
        ));
        assert!(matches!(
            encode_with(&options, "RDAX 0.5, 1.0"),
            Err(AsmError::NotInteger { .. })
        ));
        assert!(matches!(
            encode_with(&options, "WLDR RMP0, 0, 300"),
            Err(AsmError::MalformedOperand { .. })
        ));
    }
}
