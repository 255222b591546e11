//! Spindle CLI - compile block graphs and assemble programs for FV-1 class chips.

mod commands;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use spindle_config::ProjectConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spindle")]
#[command(author, version, about = "Spindle FV-1 block compiler and assembler", long_about = None)]
struct Cli {
    /// Project file (default: nearest spindle.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a graph document to assembly (and optionally machine code)
    Compile(commands::compile::CompileArgs),

    /// Assemble a source file to machine code
    Assemble(commands::assemble::AssembleArgs),

    /// Validate and schedule a graph without generating code
    Check(commands::check::CheckArgs),

    /// List available blocks and their ports and parameters
    Blocks(commands::blocks::BlocksArgs),
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        1 => "debug".into(),
        _ => "trace".into(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = ProjectConfig::discover(cli.config.as_deref(), &cwd)?;
    tracing::debug!(root = ?config.root, "project configuration");

    match cli.command {
        Commands::Compile(args) => commands::compile::run(args, &config),
        Commands::Assemble(args) => commands::assemble::run(args, &config),
        Commands::Check(args) => commands::check::run(args, &config),
        Commands::Blocks(args) => commands::blocks::run(args, &config),
    }
}
