//! Property-based tests for fixed-point conversion.
//!
//! Checks rounding error bounds, clamping, and the text round trip the
//! compiler relies on when it writes operands into assembly.

use proptest::prelude::*;
use spindle_core::FixedFormat;

const FORMATS: [FixedFormat; 5] = [
    FixedFormat::S1_14,
    FixedFormat::S_10,
    FixedFormat::S1_9,
    FixedFormat::S4_6,
    FixedFormat::S_15,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// In-range values land within half a step of the input.
    #[test]
    fn in_range_error_is_half_step(variant in 0usize..5, unit in 0.0f64..1.0) {
        let format = FORMATS[variant];
        let value = format.min_value() + unit * (format.max_value() - format.min_value());
        let q = format.quantize(value);
        prop_assert!(!q.clamped, "{} clamped {}", format, value);
        prop_assert!((q.value() - value).abs() <= format.step() / 2.0 + 1e-12);
    }

    /// Anything outside the range saturates to the nearest end and is flagged.
    #[test]
    fn out_of_range_saturates(variant in 0usize..5, excess in 0.01f64..1000.0, negative in any::<bool>()) {
        let format = FORMATS[variant];
        let (value, expected) = if negative {
            (format.min_value() - excess, format.min_raw())
        } else {
            (format.max_value() + excess, format.max_raw())
        };
        let q = format.quantize(value);
        prop_assert!(q.clamped);
        prop_assert_eq!(q.raw, expected);
    }

    /// Raw values always fit the field mask.
    #[test]
    fn field_bits_fit_mask(variant in 0usize..5, value in -100.0f64..100.0) {
        let format = FORMATS[variant];
        let q = format.quantize(value);
        prop_assert_eq!(q.field_bits() & !format.mask(), 0);
        prop_assert!(q.raw >= format.min_raw() && q.raw <= format.max_raw());
    }

    /// The assembly text of a quantized value parses back to the same grid point.
    #[test]
    fn asm_text_is_stable(variant in 0usize..5, value in -20.0f64..20.0) {
        let format = FORMATS[variant];
        let q = format.quantize(value);
        let text = q.to_asm_text();
        prop_assert!(text.contains('.'));
        let reparsed: f64 = text.parse().unwrap();
        prop_assert_eq!(format.quantize(reparsed).raw, q.raw);
    }
}
