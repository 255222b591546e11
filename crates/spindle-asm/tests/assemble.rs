//! End-to-end assembler tests.

use spindle_asm::{AssemblerOptions, assemble, to_intel_hex};
use spindle_core::DiagnosticKind;
use spindle_core::chip::NOP_WORD;

fn default_assemble(source: &str) -> spindle_asm::AssembledProgram {
    assemble(source, &AssemblerOptions::default())
}

#[test]
fn minimal_program() {
    let program = default_assemble("rdax adcl, 1.0\nwrax dacl, 0.0\n");
    assert!(program.is_usable());
    assert_eq!(program.errors().count(), 0);
    assert_eq!(program.instruction_count, 2);
    assert_eq!(program.program(), &[0x4000_0284, 0x0000_02C6]);
    assert_eq!(program.machine_code.len(), 128);
    assert!(program.machine_code[2..].iter().all(|w| *w == NOP_WORD));
}

#[test]
fn comments_labels_and_case() {
    let source = "\
; pass-through
START:  RDAX ADCL, 1.0   ; read
        wrax DACL, 0.0
";
    let program = default_assemble(source);
    assert!(program.is_usable());
    assert_eq!(program.program(), &[0x4000_0284, 0x0000_02C6]);
}

#[test]
fn duplicate_label_is_one_symbol_error() {
    let source = "loop: clr\nloop: clr\n";
    let program = default_assemble(source);
    let errors: Vec<_> = program.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::AssemblySymbol);
    assert_eq!(errors[0].line(), Some(2));
}

#[test]
fn forward_references_resolve() {
    let source = "\
        skp run, init_done
        wrax gain_reg, 0.0
init_done:
        rdax adcl, level
        wrax dacl, 0.0
level   equ 0.5
gain_reg equ reg7
";
    let program = default_assemble(source);
    assert!(program.is_usable(), "{:?}", program.diagnostics);
    // skp RUN, 1
    assert_eq!(program.machine_code[0], (0x10 << 27) | (1 << 21) | 0b10001);
    assert_eq!(program.machine_code[1], (0x27 << 5) | 0b00110);
    assert_eq!(program.machine_code[2] >> 16, 0x2000);
}

#[test]
fn undefined_symbol_keeps_slot() {
    let program = default_assemble("rdax nowhere, 1.0\nwrax dacl, 0.0\n");
    assert!(!program.is_usable());
    let errors: Vec<_> = program.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), Some(1));
    assert!(errors[0].message.contains("nowhere"));
    assert_eq!(program.machine_code[0], NOP_WORD);
    assert_eq!(program.machine_code[1], 0x0000_02C6);
}

#[test]
fn errors_on_several_lines_are_all_reported() {
    let source = "frob 1\nrdax adcl\nsof 1.0, 0.0\nskp run, 99\n";
    let program = default_assemble(source);
    let lines: Vec<_> = program.errors().filter_map(|d| d.line()).collect();
    assert_eq!(lines, vec![1, 2, 4]);
}

#[test]
fn legacy_memory_changes_only_memory_operands() {
    let source = "\
delay   mem 1000
        rdax adcl, 0.5
        wra delay, 0.0
        rda delay#, 0.5
        wrax dacl, 0.0
";
    let normal = default_assemble(source);
    let legacy = assemble(
        source,
        &AssemblerOptions {
            legacy_memory: true,
            ..AssemblerOptions::default()
        },
    );
    assert!(normal.is_usable() && legacy.is_usable());
    let differing: Vec<usize> = (0..normal.machine_code.len())
        .filter(|&i| normal.machine_code[i] != legacy.machine_code[i])
        .collect();
    assert_eq!(differing, vec![2]);
    assert_eq!((normal.machine_code[2] >> 5) & 0xFFFF, 999);
    assert_eq!((legacy.machine_code[2] >> 5) & 0xFFFF, 1000);
    assert_eq!(normal.memory_used, 1000);
    assert_eq!(legacy.memory_used, 1001);
}

#[test]
fn out_of_range_real_warns_by_default_and_fails_when_strict() {
    let source = "sof 2.5, 0.0\n";
    let lenient = default_assemble(source);
    assert!(lenient.is_usable());
    assert_eq!(lenient.warnings().count(), 1);
    assert_eq!(lenient.machine_code[0] >> 16, 0x7FFF);

    let strict = assemble(
        source,
        &AssemblerOptions {
            strict: true,
            ..AssemblerOptions::default()
        },
    );
    assert!(!strict.is_usable());
    assert_eq!(strict.errors().next().unwrap().kind, DiagnosticKind::AssemblyEncoding);

    let permissive = assemble(
        source,
        &AssemblerOptions {
            strict: true,
            clamp_reals: true,
            ..AssemblerOptions::default()
        },
    );
    assert!(permissive.is_usable());
}

#[test]
fn program_overflow_is_fatal_once() {
    let source = "clr\n".repeat(6);
    let program = assemble(
        &source,
        &AssemblerOptions {
            program_size: 4,
            ..AssemblerOptions::default()
        },
    );
    let errors: Vec<_> = program.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), Some(5));
    assert_eq!(program.machine_code.len(), 4);
}

#[test]
fn memory_overflow_is_fatal() {
    let program = assemble(
        "a mem 600\nb mem 600\nclr\n",
        &AssemblerOptions {
            memory_size: 1000,
            ..AssemblerOptions::default()
        },
    );
    let errors: Vec<_> = program.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), Some(2));
}

#[test]
fn huge_memory_block_with_guard_word_is_reported() {
    let program = assemble(
        "big mem $7FFFFFFFFFFFFFFF\nclr\n",
        &AssemblerOptions {
            legacy_memory: true,
            ..AssemblerOptions::default()
        },
    );
    assert!(!program.is_usable());
    let errors: Vec<_> = program.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), Some(1));
    assert_eq!(program.memory_used, 0);
}

#[test]
fn redefining_predefined_symbol_warns() {
    let program = default_assemble("pot0 equ reg2\nrdax pot0, 1.0\n");
    assert!(program.is_usable());
    assert_eq!(program.warnings().count(), 1);
    assert_eq!((program.machine_code[0] >> 5) & 0x3F, 0x22);
}

#[test]
fn diagnostics_are_ordered_by_line() {
    let source = "clr\nx equ 1\nfrob\nx equ 2\nsof 9.0, 0\n";
    let program = default_assemble(source);
    let lines: Vec<_> = program.diagnostics.iter().filter_map(|d| d.line()).collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted);
    assert_eq!(lines, vec![3, 4, 5]);
}

#[test]
fn intel_hex_of_assembled_program() {
    let program = default_assemble("rdax adcl, 1.0\nwrax dacl, 0.0\n");
    let image = to_intel_hex(&program.machine_code, 0).unwrap();
    assert!(image.starts_with(":1000000040000284000002C6"));
    assert_eq!(image.lines().count(), 33);
    assert!(image.ends_with(":00000001FF\n"));
}
