//! Assembler command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use spindle_asm::assemble;
use spindle_config::ProjectConfig;

use super::common::{MachineCodeArgs, ensure_usable, write_output};

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Assembly source file
    input: PathBuf,

    /// Output file (default: stdout; required for bin)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[command(flatten)]
    machine: MachineCodeArgs,
}

pub fn run(args: AssembleArgs, config: &ProjectConfig) -> anyhow::Result<()> {
    if args.output.is_none() && args.machine.format.is_binary() {
        anyhow::bail!("binary output needs --output");
    }
    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;

    let options = args.machine.options(config);
    let program = assemble(&source, &options);
    ensure_usable(&args.input.display().to_string(), &program)?;
    tracing::info!(
        instructions = program.instruction_count,
        memory = program.memory_used,
        "assembled {}",
        args.input.display()
    );

    let bytes = args.machine.encode(&program.machine_code)?;
    write_output(args.output.as_deref(), &bytes)
}
