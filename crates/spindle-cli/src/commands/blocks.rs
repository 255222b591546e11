//! Block listing and information command.

use clap::Args;
use spindle_blocks::{BlockCategory, BlockDefinition};
use spindle_config::{ProjectConfig, build_registry};

#[derive(Args, Debug)]
pub struct BlocksArgs {
    /// Show details for a specific block type
    #[arg(value_name = "TYPE")]
    block: Option<String>,

    /// Only list blocks in this category (io, math, mix, memory, ...)
    #[arg(short, long)]
    category: Option<String>,

    /// Print metadata as JSON
    #[arg(long)]
    json: bool,

    /// Skip templates in the user configuration directory
    #[arg(long)]
    no_user_templates: bool,
}

fn parse_category(name: &str) -> anyhow::Result<BlockCategory> {
    BlockCategory::ALL
        .into_iter()
        .find(|c| format!("{c:?}").eq_ignore_ascii_case(name) || c.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow::anyhow!("unknown category: {name}"))
}

pub fn run(args: BlocksArgs, config: &ProjectConfig) -> anyhow::Result<()> {
    let registry = build_registry(config, !args.no_user_templates)?;

    if let Some(type_id) = &args.block {
        let def = registry
            .get(type_id)
            .ok_or_else(|| anyhow::anyhow!("unknown block type: {type_id}"))?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(def.info())?);
        } else {
            print_details(def);
        }
        return Ok(());
    }

    let categories = match &args.category {
        Some(name) => vec![parse_category(name)?],
        None => registry.categories(),
    };

    if args.json {
        let infos: Vec<_> = categories
            .iter()
            .flat_map(|c| registry.blocks_in_category(*c))
            .map(BlockDefinition::info)
            .collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("Available Blocks");
    println!("================");
    for category in categories {
        println!();
        println!("{} - {}", category.name(), category.description());
        for def in registry.blocks_in_category(category) {
            let info = def.info();
            println!("  {:20} {}", info.type_id, info.description);
        }
    }
    println!();
    println!("Use 'spindle blocks <type>' for ports and parameters.");
    Ok(())
}

fn print_details(def: &BlockDefinition) {
    let info = def.info();
    println!("{} ({})", info.name, info.type_id);
    println!("{}", "=".repeat(info.name.len() + info.type_id.len() + 3));
    println!();
    if !info.description.is_empty() {
        println!("{}", info.description);
        println!();
    }
    let kind = if def.is_template() { "template" } else { "built-in" };
    println!("Category: {}  Kind: {kind}", info.category.name());
    if def.is_memory_bearing() {
        println!("Uses delay memory; may close feedback loops.");
    }

    for (title, ports) in [("Inputs", &info.inputs), ("Outputs", &info.outputs)] {
        if ports.is_empty() {
            continue;
        }
        println!();
        println!("{title}:");
        for port in ports {
            let required = if port.required { "  (required)" } else { "" };
            println!("  {:12} {:8}{required}", port.id, port.kind.name());
        }
    }

    if !info.params.is_empty() {
        println!();
        println!("Parameters:");
        println!("  {:12}  {:24}  {:>10}  Range", "Name", "Description", "Default");
        for param in &info.params {
            let range = if param.options.is_empty() {
                format!("{} .. {}", param.min, param.max)
            } else {
                param.options.join(" | ")
            };
            println!(
                "  {:12}  {:24}  {:>10}  {range}",
                param.id,
                param.name,
                param.display(param.default)
            );
        }
    }
}
