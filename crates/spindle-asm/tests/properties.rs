//! Property-based tests for literal parsing and fixed-point operand packing.

use proptest::prelude::*;
use spindle_asm::{AsmError, AssemblerOptions, Expr, Value, assemble};

fn literal(text: &str) -> Value {
    Expr::parse(text)
        .unwrap()
        .eval(&mut |name, _| Err(AsmError::UndefinedSymbol(name.to_string())))
        .unwrap()
}

fn sign_extend(bits: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((bits << shift) as i32) >> shift
}

/// Assembles a single line and returns its word.
fn word(line: &str) -> u32 {
    let program = assemble(line, &AssemblerOptions::default());
    assert!(program.is_usable(), "{line}: {:?}", program.diagnostics);
    program.machine_code[0]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every radix prefix reads back the same integer.
    #[test]
    fn radix_prefixes_agree(n in any::<u32>()) {
        let expected = Value::Int(i64::from(n));
        for text in [
            n.to_string(),
            format!("${n:X}"),
            format!("0x{n:x}"),
            format!("%{n:b}"),
            format!("0b{n:b}"),
        ] {
            prop_assert_eq!(literal(&text), expected, "{}", text);
        }
    }

    /// The RDAX coefficient field decodes to the written real within half a step.
    #[test]
    fn rdax_coefficient_round_trips(value in -2.0f64..1.9999) {
        let text = format!("{value:.6}");
        let written: f64 = text.parse().unwrap();
        let w = word(&format!("rdax reg0, {text}"));
        prop_assert_eq!(w & 0x1F, 0b00100);
        prop_assert_eq!((w >> 5) & 0x3F, 0x20);
        let decoded = f64::from(sign_extend(w >> 16, 16)) / 16384.0;
        prop_assert!((decoded - written).abs() <= 0.5 / 16384.0 + 1e-12, "{} -> {}", text, decoded);
    }

    /// Both SOF fields decode to their reals; the offset uses the narrow format.
    #[test]
    fn sof_fields_round_trip(c in -2.0f64..1.9999, d in -1.0f64..0.999) {
        let (c_text, d_text) = (format!("{c:.6}"), format!("{d:.6}"));
        let w = word(&format!("sof {c_text}, {d_text}"));
        prop_assert_eq!(w & 0x1F, 0b01101);
        let c_decoded = f64::from(sign_extend(w >> 16, 16)) / 16384.0;
        let d_decoded = f64::from(sign_extend((w >> 5) & 0x7FF, 11)) / 1024.0;
        let c_written: f64 = c_text.parse().unwrap();
        let d_written: f64 = d_text.parse().unwrap();
        prop_assert!((c_decoded - c_written).abs() <= 0.5 / 16384.0 + 1e-12);
        prop_assert!((d_decoded - d_written).abs() <= 0.5 / 1024.0 + 1e-12);
    }
}
