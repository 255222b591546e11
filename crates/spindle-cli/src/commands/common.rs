//! Shared CLI helpers used across multiple commands.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use clap::{Args, ValueEnum};
use spindle_asm::{AssembledProgram, AssemblerOptions, to_bytes, to_hex_lines, to_intel_hex};
use spindle_config::ProjectConfig;
use spindle_core::Diagnostic;

/// Machine code serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One 0xXXXXXXXX word per line
    Hex,
    /// Raw big-endian bytes
    Bin,
    /// Intel HEX image
    Ihex,
}

impl OutputFormat {
    pub fn is_binary(self) -> bool {
        self == OutputFormat::Bin
    }
}

/// Machine code output options shared by `compile` and `assemble`.
#[derive(Args, Debug)]
pub struct MachineCodeArgs {
    /// Machine code format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Ihex)]
    pub format: OutputFormat,

    /// EEPROM program slot for Intel HEX output
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=7))]
    pub slot: u8,

    /// Out-of-range real operands are errors
    #[arg(long)]
    pub strict: bool,

    /// Clamp out-of-range reals with a warning, even in strict mode
    #[arg(long)]
    pub clamp_reals: bool,

    /// Reproduce the reference assembler's delay memory layout
    #[arg(long)]
    pub legacy_memory: bool,

    /// Read integer 1 and 2 in coefficient fields as 1.0 and 2.0
    #[arg(long)]
    pub spin_reals: bool,
}

impl MachineCodeArgs {
    /// Project assembler settings with command-line switches applied.
    pub fn options(&self, config: &ProjectConfig) -> AssemblerOptions {
        let mut options = config.assembler;
        options.strict |= self.strict;
        options.clamp_reals |= self.clamp_reals;
        options.legacy_memory |= self.legacy_memory;
        options.spin_reals |= self.spin_reals;
        options
    }

    /// Serializes assembled words in the selected format.
    pub fn encode(&self, words: &[u32]) -> anyhow::Result<Vec<u8>> {
        Ok(match self.format {
            OutputFormat::Hex => to_hex_lines(words).into_bytes(),
            OutputFormat::Bin => to_bytes(words),
            OutputFormat::Ihex => to_intel_hex(words, usize::from(self.slot))
                .with_context(|| format!("slot {} is outside the image", self.slot))?
                .into_bytes(),
        })
    }
}

/// Prints diagnostics to stderr, prefixed with the input name.
pub fn report<'a>(source: &str, diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for diagnostic in diagnostics {
        eprintln!("{source}: {diagnostic}");
    }
}

/// Fails with a summary if the assembler reported fatal diagnostics.
pub fn ensure_usable(source: &str, program: &AssembledProgram) -> anyhow::Result<()> {
    report(source, &program.diagnostics);
    let errors = program.errors().count();
    if errors > 0 {
        anyhow::bail!("assembly failed with {errors} error(s)");
    }
    Ok(())
}

/// Writes to `path`, or stdout when no path is given.
pub fn write_output(path: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("failed to write '{}'", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
