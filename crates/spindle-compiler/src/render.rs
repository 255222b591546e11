//! Assembly text rendering.

use spindle_core::{GeneratedProgram, GraphMetadata, IrNode, Section, comment_text};

/// Resource totals echoed into the program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Registers used / available.
    pub registers: (usize, usize),
    /// Memory words used / available.
    pub memory: (usize, usize),
    /// Instruction slots used / available.
    pub instructions: (usize, usize),
}

/// Renders generated sections into assembly text.
///
/// Sections are written in the fixed order header, init, input, main, output.
/// When `init_end` is non-empty the init section is wrapped in
/// `skp run, <init_end>` ... `<init_end>:` so it only executes on the first
/// sample.
pub(crate) fn render(
    metadata: &GraphMetadata,
    program: &GeneratedProgram,
    usage: Usage,
    init_end: &str,
) -> String {
    let mut out = String::new();
    let name = metadata.name.as_deref().unwrap_or("untitled");
    out.push_str(&format!("; {}\n", comment_text(name)));
    if let Some(author) = &metadata.author {
        out.push_str(&format!("; author: {}\n", comment_text(author)));
    }
    if let Some(description) = &metadata.description {
        for line in description.lines() {
            out.push_str(&format!("; {}\n", comment_text(line)));
        }
    }
    out.push_str("; generated by spindle\n");
    out.push_str(&format!(
        "; registers: {}/{}  memory: {}/{}  instructions: {}/{}\n",
        usage.registers.0,
        usage.registers.1,
        usage.memory.0,
        usage.memory.1,
        usage.instructions.0,
        usage.instructions.1,
    ));

    for section in Section::ALL {
        let nodes = &program.sections[section.index()];
        if nodes.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!("; --- {section} ---\n"));
        if section == Section::Init && !init_end.is_empty() {
            let guard = IrNode::instruction(Section::Init, "skp", &["RUN", init_end]);
            push_line(&mut out, &guard);
            for node in nodes {
                push_line(&mut out, node);
            }
            push_line(&mut out, &IrNode::label(Section::Init, init_end));
        } else {
            for node in nodes {
                push_line(&mut out, node);
            }
        }
    }
    out
}

fn push_line(out: &mut String, node: &IrNode) {
    let line = node.render();
    tracing::trace!("{line}");
    out.push_str(&line);
    out.push('\n');
}
