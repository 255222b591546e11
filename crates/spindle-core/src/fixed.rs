//! Signed fixed-point operand formats.
//!
//! Every real-valued operand field on the chip is a two's-complement fixed
//! point number. The formats differ only in total width and in where the
//! binary point sits:
//!
//! | Format | Bits | Range |
//! |--------|------|-------|
//! | S1.14  | 16   | -2.0 ..= 1.99994 |
//! | S.10   | 11   | -1.0 ..= 0.99902 |
//! | S1.9   | 11   | -2.0 ..= 1.99805 |
//! | S4.6   | 11   | -16.0 ..= 15.984 |
//! | S.15   | 16   | -1.0 ..= 0.99997 |
//!
//! Conversion rounds to the nearest grid point (ties to even) and then clamps
//! into the representable range. Clamping is reported through
//! [`Quantized::clamped`] so callers can decide whether it is a warning or an
//! error; conversion itself never fails.

use core::fmt;

/// A chip-native signed fixed-point format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixedFormat {
    /// 16-bit, 14 fractional bits. The wide gain format.
    S1_14,
    /// 11-bit, 10 fractional bits. The narrow offset format.
    S_10,
    /// 11-bit, 9 fractional bits. Delay memory coefficients.
    S1_9,
    /// 11-bit, 6 fractional bits. `LOG` offsets.
    S4_6,
    /// 16-bit, 15 fractional bits. `CHO SOF` offsets.
    S_15,
}

impl FixedFormat {
    /// Total field width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            FixedFormat::S1_14 | FixedFormat::S_15 => 16,
            FixedFormat::S_10 | FixedFormat::S1_9 | FixedFormat::S4_6 => 11,
        }
    }

    /// Number of fractional bits.
    pub const fn frac_bits(self) -> u32 {
        match self {
            FixedFormat::S1_14 => 14,
            FixedFormat::S_10 => 10,
            FixedFormat::S1_9 => 9,
            FixedFormat::S4_6 => 6,
            FixedFormat::S_15 => 15,
        }
    }

    /// Smallest raw integer value.
    pub const fn min_raw(self) -> i32 {
        -(1 << (self.bits() - 1))
    }

    /// Largest raw integer value.
    pub const fn max_raw(self) -> i32 {
        (1 << (self.bits() - 1)) - 1
    }

    /// Mask covering the field width.
    pub const fn mask(self) -> u32 {
        (1u32 << self.bits()) - 1
    }

    /// Scale factor between real and raw values.
    pub fn scale(self) -> f64 {
        f64::from(1u32 << self.frac_bits())
    }

    /// Smallest representable real value.
    pub fn min_value(self) -> f64 {
        f64::from(self.min_raw()) / self.scale()
    }

    /// Largest representable real value.
    pub fn max_value(self) -> f64 {
        f64::from(self.max_raw()) / self.scale()
    }

    /// Distance between adjacent grid points.
    pub fn step(self) -> f64 {
        1.0 / self.scale()
    }

    /// Conventional name, e.g. `S1.14`.
    pub const fn name(self) -> &'static str {
        match self {
            FixedFormat::S1_14 => "S1.14",
            FixedFormat::S_10 => "S.10",
            FixedFormat::S1_9 => "S1.9",
            FixedFormat::S4_6 => "S4.6",
            FixedFormat::S_15 => "S.15",
        }
    }

    /// Parses a format name, case-insensitively (`s1.14`, `S.10`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "S1.14" => Some(FixedFormat::S1_14),
            "S.10" => Some(FixedFormat::S_10),
            "S1.9" => Some(FixedFormat::S1_9),
            "S4.6" => Some(FixedFormat::S4_6),
            "S.15" => Some(FixedFormat::S_15),
            _ => None,
        }
    }

    /// Converts a real value to this format.
    ///
    /// Non-finite input is clamped: NaN maps to zero, infinities to the ends
    /// of the range.
    pub fn quantize(self, value: f64) -> Quantized {
        if value.is_nan() {
            return Quantized {
                format: self,
                raw: 0,
                input: value,
                clamped: true,
            };
        }
        let scaled = (value * self.scale()).round_ties_even();
        let (min, max) = (f64::from(self.min_raw()), f64::from(self.max_raw()));
        let clamped = scaled < min || scaled > max;
        Quantized {
            format: self,
            raw: scaled.clamp(min, max) as i32,
            input: value,
            clamped,
        }
    }
}

impl fmt::Display for FixedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The result of converting a real value into a [`FixedFormat`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantized {
    /// Target format.
    pub format: FixedFormat,
    /// Signed raw grid value, within `format.min_raw()..=format.max_raw()`.
    pub raw: i32,
    /// The value that was converted.
    pub input: f64,
    /// `true` if `input` fell outside the representable range.
    pub clamped: bool,
}

impl Quantized {
    /// Real value of the grid point.
    pub fn value(&self) -> f64 {
        f64::from(self.raw) / self.format.scale()
    }

    /// Two's-complement bit pattern, masked to the field width.
    pub fn field_bits(&self) -> u32 {
        (self.raw as u32) & self.format.mask()
    }

    /// Assembly text for the grid point; see [`format_real`].
    pub fn to_asm_text(&self) -> String {
        format_real(self.value())
    }
}

/// Formats a real for assembly source.
///
/// Always contains a decimal point so the assembler reads it back as a real,
/// and carries enough digits to land on the same grid point for every format.
pub fn format_real(value: f64) -> String {
    let mut text = format!("{value:.10}");
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    if text == "-0.0" {
        text = "0.0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_match_chip_documentation() {
        assert_eq!(FixedFormat::S1_14.min_value(), -2.0);
        assert!((FixedFormat::S1_14.max_value() - 1.999_938_964_843_75).abs() < 1e-12);
        assert_eq!(FixedFormat::S_10.min_value(), -1.0);
        assert!((FixedFormat::S_10.max_value() - 0.999_023_437_5).abs() < 1e-12);
        assert_eq!(FixedFormat::S1_9.min_raw(), -1024);
        assert_eq!(FixedFormat::S4_6.min_value(), -16.0);
    }

    #[test]
    fn unity_gain_encodes_as_0x4000() {
        let q = FixedFormat::S1_14.quantize(1.0);
        assert_eq!(q.raw, 0x4000);
        assert!(!q.clamped);
        assert_eq!(q.field_bits(), 0x4000);
    }

    #[test]
    fn negative_values_are_twos_complement() {
        let q = FixedFormat::S1_14.quantize(-1.0);
        assert_eq!(q.field_bits(), 0xC000);
        let q = FixedFormat::S_10.quantize(-1.0);
        assert_eq!(q.field_bits(), 0x400);
    }

    #[test]
    fn out_of_range_clamps_and_flags() {
        let q = FixedFormat::S1_14.quantize(2.5);
        assert!(q.clamped);
        assert_eq!(q.raw, FixedFormat::S1_14.max_raw());

        let q = FixedFormat::S_10.quantize(-3.0);
        assert!(q.clamped);
        assert_eq!(q.raw, -1024);
    }

    #[test]
    fn just_below_top_rounds_up_and_clamps() {
        // 0.9999 * 1024 rounds to 1024, one past the top grid point.
        let q = FixedFormat::S_10.quantize(0.9999);
        assert!(q.clamped);
        assert_eq!(q.raw, 1023);
    }

    #[test]
    fn ties_round_to_even() {
        // 2.5 and 3.5 grid steps.
        let step = FixedFormat::S_10.step();
        assert_eq!(FixedFormat::S_10.quantize(2.5 * step).raw, 2);
        assert_eq!(FixedFormat::S_10.quantize(3.5 * step).raw, 4);
        assert_eq!(FixedFormat::S_10.quantize(-2.5 * step).raw, -2);
    }

    #[test]
    fn nan_is_clamped_to_zero() {
        let q = FixedFormat::S1_14.quantize(f64::NAN);
        assert!(q.clamped);
        assert_eq!(q.raw, 0);
    }

    #[test]
    fn format_names_parse_back() {
        for fmt in [
            FixedFormat::S1_14,
            FixedFormat::S_10,
            FixedFormat::S1_9,
            FixedFormat::S4_6,
            FixedFormat::S_15,
        ] {
            assert_eq!(FixedFormat::from_name(fmt.name()), Some(fmt));
        }
        assert_eq!(FixedFormat::from_name("s1.14"), Some(FixedFormat::S1_14));
        assert_eq!(FixedFormat::from_name("q15"), None);
    }

    #[test]
    fn format_real_keeps_a_decimal_point() {
        assert_eq!(format_real(1.0), "1.0");
        assert_eq!(format_real(0.5), "0.5");
        assert_eq!(format_real(-0.0), "0.0");
        assert_eq!(format_real(-1.25), "-1.25");
        assert_eq!(format_real(0.000_122_070_312_5), "0.0001220703");
    }

    #[test]
    fn text_reparses_to_same_grid_point() {
        for raw in [-32768, -12345, -1, 0, 1, 777, 32767] {
            let value = f64::from(raw) / FixedFormat::S1_14.scale();
            let text = format_real(value);
            let back: f64 = text.parse().unwrap();
            assert_eq!(FixedFormat::S1_14.quantize(back).raw, raw, "text {text}");
        }
    }
}
