//! Graph check command: validation and scheduling only.

use std::path::PathBuf;

use clap::Args;
use spindle_compiler::GraphCompiler;
use spindle_config::{ProjectConfig, build_registry, load_graph};

use super::common::report;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Graph document (JSON)
    input: PathBuf,

    /// Print the generation order
    #[arg(long)]
    schedule: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Skip templates in the user configuration directory
    #[arg(long)]
    no_user_templates: bool,
}

pub fn run(args: CheckArgs, config: &ProjectConfig) -> anyhow::Result<()> {
    let registry = build_registry(config, !args.no_user_templates)?;
    let graph = load_graph(&args.input)?;
    let source = args.input.display().to_string();

    let result = GraphCompiler::new(&registry).check(&graph);
    if args.json {
        let summary = serde_json::json!({
            "source": source,
            "success": result.success,
            "schedule": result.schedule,
            "diagnostics": result.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        if !result.success {
            anyhow::bail!(
                "check failed with {} error(s)",
                result.diagnostics.fatal_count()
            );
        }
        return Ok(());
    }

    report(&source, result.diagnostics.iter());
    if !result.success {
        anyhow::bail!(
            "check failed with {} error(s)",
            result.diagnostics.fatal_count()
        );
    }

    if args.schedule {
        for (i, id) in result.schedule.iter().enumerate() {
            println!("{:3}  {id}", i + 1);
        }
    }
    println!(
        "{source}: ok ({} blocks, {} connections, {} warning(s))",
        graph.blocks.len(),
        graph.connections.len(),
        result.diagnostics.warnings().count()
    );
    Ok(())
}
