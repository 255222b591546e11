//! Physical model of the target chip.
//!
//! The target is a fixed-point audio DSP that runs one short program per
//! sample. Everything the compiler and assembler need to know about the part
//! lives here: register addresses, resource ceilings, and the symbols the
//! reference assembler predefines.

/// Number of instruction slots in one program.
pub const PROGRAM_SIZE: usize = 128;

/// Number of general-purpose registers (`REG0`..`REG31`).
pub const REGISTER_COUNT: usize = 32;

/// Size of the delay memory in words.
pub const MEMORY_SIZE: usize = 32768;

/// Sample rate the chip runs at with the reference crystal.
pub const SAMPLE_RATE: f64 = 32768.0;

/// Address of `REG0`; general registers are contiguous from here.
pub const REG_BASE: u8 = 0x20;

/// The machine word for `SKP 0,0`, used to pad programs.
pub const NOP_WORD: u32 = 0x0000_0011;

/// A register address on the chip (0x00..=0x3F).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterAddr(pub u8);

/// Named special-function registers.
pub const SPECIAL_REGISTERS: &[(&str, u8)] = &[
    ("SIN0_RATE", 0x00),
    ("SIN0_RANGE", 0x01),
    ("SIN1_RATE", 0x02),
    ("SIN1_RANGE", 0x03),
    ("RMP0_RATE", 0x04),
    ("RMP0_RANGE", 0x05),
    ("RMP1_RATE", 0x06),
    ("RMP1_RANGE", 0x07),
    ("POT0", 0x10),
    ("POT1", 0x11),
    ("POT2", 0x12),
    ("ADCL", 0x14),
    ("ADCR", 0x15),
    ("DACL", 0x16),
    ("DACR", 0x17),
    ("ADDR_PTR", 0x18),
];

/// Integer constants predefined by the reference assembler: oscillator
/// selectors, `CHO` types and flags, and `SKP` conditions.
pub const PREDEFINED_CONSTANTS: &[(&str, i64)] = &[
    ("SIN0", 0),
    ("SIN1", 1),
    ("RMP0", 2),
    ("RMP1", 3),
    ("RDA", 0),
    ("SOF", 2),
    ("RDAL", 3),
    ("SIN", 0x00),
    ("COS", 0x01),
    ("REG", 0x02),
    ("COMPC", 0x04),
    ("COMPA", 0x08),
    ("RPTR2", 0x10),
    ("NA", 0x20),
    ("RUN", 0x10),
    ("ZRC", 0x08),
    ("ZRO", 0x04),
    ("GEZ", 0x02),
    ("NEG", 0x01),
];

/// Returns `true` if `name` is a register or predefined constant the
/// assembler already knows, case-insensitively.
pub fn is_predefined_symbol(name: &str) -> bool {
    register_by_name(name).is_some()
        || PREDEFINED_CONSTANTS
            .iter()
            .any(|(known, _)| known.eq_ignore_ascii_case(name))
}

/// Returns the assembler name of general register `index` (`REG<index>`).
pub fn general_register_name(index: usize) -> String {
    format!("REG{index}")
}

/// Looks up a register by name, case-insensitively.
///
/// Accepts both special registers (`ADCL`, `POT0`, ...) and general registers
/// (`REG0`..`REG31`).
pub fn register_by_name(name: &str) -> Option<RegisterAddr> {
    let upper = name.to_ascii_uppercase();
    if let Some(&(_, addr)) = SPECIAL_REGISTERS.iter().find(|(n, _)| *n == upper) {
        return Some(RegisterAddr(addr));
    }
    let index: usize = upper.strip_prefix("REG")?.parse().ok()?;
    (index < REGISTER_COUNT).then(|| RegisterAddr(REG_BASE + index as u8))
}

/// Which physical input or output a stereo channel maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Left channel.
    Left,
    /// Right channel.
    Right,
}

impl Channel {
    /// ADC register name for this channel.
    pub const fn adc(self) -> &'static str {
        match self {
            Channel::Left => "ADCL",
            Channel::Right => "ADCR",
        }
    }

    /// DAC register name for this channel.
    pub const fn dac(self) -> &'static str {
        match self {
            Channel::Left => "DACL",
            Channel::Right => "DACR",
        }
    }
}

/// Name of pot register `index` (0..=2).
pub fn pot_register(index: usize) -> Option<&'static str> {
    match index {
        0 => Some("POT0"),
        1 => Some("POT1"),
        2 => Some("POT2"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_registers_resolve_case_insensitively() {
        assert_eq!(register_by_name("adcl"), Some(RegisterAddr(0x14)));
        assert_eq!(register_by_name("DacR"), Some(RegisterAddr(0x17)));
        assert_eq!(register_by_name("pot2"), Some(RegisterAddr(0x12)));
    }

    #[test]
    fn general_registers_cover_reg0_to_reg31() {
        assert_eq!(register_by_name("REG0"), Some(RegisterAddr(0x20)));
        assert_eq!(register_by_name("reg31"), Some(RegisterAddr(0x3F)));
        assert_eq!(register_by_name("REG32"), None);
        assert_eq!(register_by_name("REGX"), None);
    }

    #[test]
    fn general_register_names_round_trip() {
        for i in 0..REGISTER_COUNT {
            let name = general_register_name(i);
            assert_eq!(register_by_name(&name), Some(RegisterAddr(REG_BASE + i as u8)));
        }
    }

    #[test]
    fn predefined_symbols() {
        assert!(is_predefined_symbol("run"));
        assert!(is_predefined_symbol("Adcl"));
        assert!(is_predefined_symbol("reg5"));
        assert!(!is_predefined_symbol("delay_line"));
    }

    #[test]
    fn pot_registers() {
        assert_eq!(pot_register(1), Some("POT1"));
        assert_eq!(pot_register(3), None);
    }
}
