//! Property-based tests for fixed-point placeholder formatting.
//!
//! Whatever number a placeholder evaluates to, the operand written for a
//! `:s1.14` or `:s.10` format lies inside that format's range and on its grid.

use std::collections::BTreeMap;

use proptest::prelude::*;
use spindle_blocks::{BlockEnv, TemplateBlock};
use spindle_core::{CodegenContext, CompileOptions, FixedFormat, Graph, Section};

const SOF: &str = r#"
type = "t.sof"
name = "Sof"
category = "math"

[[params]]
id = "g"
default = 0
min = -100
max = 100

[[params]]
id = "d"
default = 0
min = -100
max = 100
---
sof ${param.g * 2 - 1:s1.14}, ${param.d:s.10}
"#;

/// Expands the template and returns the two `sof` operands.
fn operands(g: f64, d: f64) -> (f64, f64) {
    let template = TemplateBlock::parse(SOF).unwrap();
    let graph = Graph::new("p");
    let mut ctx = CodegenContext::new(&graph, CompileOptions::default());
    let params = BTreeMap::from([("g".to_string(), g), ("d".to_string(), d)]);
    template
        .generate(&BlockEnv::new("s", &params), &mut ctx)
        .unwrap();
    let node = ctx
        .section(Section::Main)
        .iter()
        .find(|n| n.is_instruction())
        .unwrap();
    (
        node.operands[0].parse().unwrap(),
        node.operands[1].parse().unwrap(),
    )
}

fn assert_on_grid(format: FixedFormat, value: f64, written: f64) -> Result<(), TestCaseError> {
    // Operand text carries ten decimals.
    let slack = 1e-9;
    prop_assert!(written >= format.min_value() - slack && written <= format.max_value() + slack);
    let expected = value.clamp(format.min_value(), format.max_value());
    prop_assert!(
        (written - expected).abs() <= format.step() / 2.0 + slack,
        "{} wrote {} for {}",
        format,
        written,
        value
    );
    let steps = written / format.step();
    prop_assert!((steps - steps.round()).abs() < 1e-4);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn formatted_operands_stay_in_range(g in -50.0f64..50.0, d in -50.0f64..50.0) {
        let (c, offset) = operands(g, d);
        assert_on_grid(FixedFormat::S1_14, g * 2.0 - 1.0, c)?;
        assert_on_grid(FixedFormat::S_10, d, offset)?;
    }
}
