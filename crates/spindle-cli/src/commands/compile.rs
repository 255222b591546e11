//! Graph compilation command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use spindle_asm::assemble;
use spindle_compiler::GraphCompiler;
use spindle_config::{ProjectConfig, build_registry, load_graph};

use super::common::{MachineCodeArgs, ensure_usable, report, write_output};

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Graph document (JSON)
    input: PathBuf,

    /// Write assembly here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also assemble and write machine code to this file
    #[arg(short = 'b', long, value_name = "FILE")]
    binary: Option<PathBuf>,

    /// Register ceiling
    #[arg(long, value_name = "N")]
    registers: Option<usize>,

    /// Program size ceiling in instructions
    #[arg(long, value_name = "N")]
    program_size: Option<usize>,

    /// Delay memory ceiling in words
    #[arg(long, value_name = "N")]
    memory_size: Option<usize>,

    /// Skip templates in the user configuration directory
    #[arg(long)]
    no_user_templates: bool,

    #[command(flatten)]
    machine: MachineCodeArgs,
}

pub fn run(args: CompileArgs, config: &ProjectConfig) -> anyhow::Result<()> {
    let registry = build_registry(config, !args.no_user_templates)?;
    let graph = load_graph(&args.input)?;

    let mut options = config.compile;
    if let Some(n) = args.registers {
        options.register_count = n;
    }
    if let Some(n) = args.program_size {
        options.program_size = n;
    }
    if let Some(n) = args.memory_size {
        options.memory_size = n;
    }

    let source = args.input.display().to_string();
    let result = GraphCompiler::new(&registry).compile(&graph, &options);
    report(&source, result.diagnostics.iter());
    let Some(assembly) = result.assembly.filter(|_| result.success) else {
        anyhow::bail!(
            "compilation failed with {} error(s)",
            result.diagnostics.fatal_count()
        );
    };
    if let Some(usage) = result.usage {
        tracing::info!(
            registers = usage.registers.0,
            memory = usage.memory.0,
            instructions = usage.instructions.0,
            "compiled {source}"
        );
    }
    write_output(args.output.as_deref(), assembly.as_bytes())?;

    if let Some(binary) = &args.binary {
        let mut asm_options = args.machine.options(config);
        asm_options.program_size = options.program_size;
        asm_options.memory_size = options.memory_size;
        let program = assemble(&assembly, &asm_options);
        ensure_usable(&source, &program).context("generated assembly did not assemble")?;
        let bytes = args.machine.encode(&program.machine_code)?;
        write_output(Some(binary), &bytes)?;
    }
    Ok(())
}
