//! Batched graph validation.
//!
//! Every check runs to completion and reports into one [`Diagnostics`]; nothing
//! here stops at the first problem.

use std::collections::{BTreeMap, BTreeSet};

use spindle_blocks::BlockDefinition;
use spindle_core::{
    BlockInstance, DiagnosticKind, Diagnostics, Graph, Location, ParamDescriptor, ParamValue,
};
use spindle_registry::BlockRegistry;

/// A block that passed lookup, with its parameters resolved.
pub(crate) struct ResolvedBlock<'a> {
    pub(crate) instance: &'a BlockInstance,
    pub(crate) definition: &'a BlockDefinition,
    pub(crate) params: BTreeMap<String, f64>,
}

/// Validates `graph` against `registry`.
///
/// Returns resolved blocks in document order. Blocks whose type is unknown are
/// left out; the caller must not proceed if `diagnostics` holds a fatal entry.
pub(crate) fn validate<'a>(
    graph: &'a Graph,
    registry: &'a BlockRegistry,
    diagnostics: &mut Diagnostics,
) -> Vec<ResolvedBlock<'a>> {
    let mut seen = BTreeSet::new();
    let mut resolved = Vec::with_capacity(graph.blocks.len());

    for block in &graph.blocks {
        let location = Location::Block(block.id.clone());
        if block.id.trim().is_empty() {
            diagnostics.fatal(DiagnosticKind::GraphValidation, location, "block id is empty");
            continue;
        }
        if !seen.insert(block.id.as_str()) {
            diagnostics.fatal(
                DiagnosticKind::GraphValidation,
                location,
                format!("duplicate block id '{}'", block.id),
            );
            continue;
        }
        let Some(definition) = registry.get(&block.block_type) else {
            diagnostics.fatal(
                DiagnosticKind::GraphValidation,
                location,
                format!("unknown block type '{}'", block.block_type),
            );
            continue;
        };
        let params = resolve_params(block, definition, diagnostics);
        resolved.push(ResolvedBlock {
            instance: block,
            definition,
            params,
        });
    }

    check_connections(graph, &resolved, diagnostics);

    for block in &resolved {
        for problem in block.definition.validate(block.instance, graph) {
            diagnostics.fatal(
                DiagnosticKind::GraphValidation,
                Location::Block(block.instance.id.clone()),
                problem,
            );
        }
    }

    resolved
}

/// Defaults, range-clamps and type-checks parameter values.
fn resolve_params(
    block: &BlockInstance,
    definition: &BlockDefinition,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, f64> {
    let info = definition.info();
    let location = || Location::Block(block.id.clone());

    for id in block.parameters.keys() {
        if info.param_descriptor(id).is_none() {
            diagnostics.warning(
                DiagnosticKind::GraphValidation,
                location(),
                format!("unknown parameter '{id}' for block type '{}' is ignored", info.type_id),
            );
        }
    }

    let mut params = BTreeMap::new();
    for desc in &info.params {
        let value = match block.parameters.get(&desc.id) {
            None => desc.default,
            Some(raw) => match numeric_value(raw, desc) {
                Some(v) if v.is_finite() => {
                    if desc.contains(v) {
                        v
                    } else {
                        let clamped = desc.clamp(v);
                        diagnostics.warning(
                            DiagnosticKind::GraphValidation,
                            location(),
                            format!(
                                "parameter '{}' value {} is outside [{}, {}]; using {}",
                                desc.id, v, desc.min, desc.max, clamped
                            ),
                        );
                        clamped
                    }
                }
                _ => {
                    diagnostics.fatal(
                        DiagnosticKind::GraphValidation,
                        location(),
                        format!("parameter '{}' needs a number, got {}", desc.id, describe(raw)),
                    );
                    desc.default
                }
            },
        };
        params.insert(desc.id.clone(), value);
    }
    params
}

/// Numbers as-is; option labels of selectors map to their index.
fn numeric_value(raw: &ParamValue, desc: &ParamDescriptor) -> Option<f64> {
    if let ParamValue::Text(text) = raw {
        if let Some(index) = desc
            .options
            .iter()
            .position(|o| o.eq_ignore_ascii_case(text.trim()))
        {
            return Some(index as f64);
        }
    }
    raw.as_f64()
}

fn describe(raw: &ParamValue) -> String {
    match raw {
        ParamValue::Number(n) => n.to_string(),
        ParamValue::Bool(b) => b.to_string(),
        ParamValue::Text(s) => format!("'{s}'"),
    }
}

fn check_connections(graph: &Graph, resolved: &[ResolvedBlock<'_>], diagnostics: &mut Diagnostics) {
    let by_id: BTreeMap<&str, &BlockDefinition> = resolved
        .iter()
        .map(|b| (b.instance.id.as_str(), b.definition))
        .collect();
    let known: BTreeSet<&str> = graph.blocks.iter().map(|b| b.id.as_str()).collect();
    let mut driven = BTreeSet::new();

    for conn in &graph.connections {
        let (from, to) = (&conn.from, &conn.to);
        let location = Location::Block(to.block_id.clone());
        let describe = format!(
            "{}.{} -> {}.{}",
            from.block_id, from.port_id, to.block_id, to.port_id
        );

        let mut endpoint_ok = true;
        for block_id in [&from.block_id, &to.block_id] {
            if !known.contains(block_id.as_str()) {
                diagnostics.fatal(
                    DiagnosticKind::GraphValidation,
                    location.clone(),
                    format!("connection {describe} references missing block '{block_id}'"),
                );
                endpoint_ok = false;
            }
        }
        if !endpoint_ok {
            continue;
        }
        // unknown types were already reported
        let (Some(src), Some(dst)) = (
            by_id.get(from.block_id.as_str()),
            by_id.get(to.block_id.as_str()),
        ) else {
            continue;
        };

        let out_port = src.info().output_port(&from.port_id);
        let in_port = dst.info().input_port(&to.port_id);
        if out_port.is_none() {
            diagnostics.fatal(
                DiagnosticKind::GraphValidation,
                location.clone(),
                format!(
                    "connection {describe}: '{}' has no output port '{}'",
                    src.type_id(),
                    from.port_id
                ),
            );
        }
        if in_port.is_none() {
            diagnostics.fatal(
                DiagnosticKind::GraphValidation,
                location.clone(),
                format!(
                    "connection {describe}: '{}' has no input port '{}'",
                    dst.type_id(),
                    to.port_id
                ),
            );
        }
        if let (Some(out_port), Some(in_port)) = (out_port, in_port) {
            if out_port.kind != in_port.kind {
                diagnostics.fatal(
                    DiagnosticKind::GraphValidation,
                    location.clone(),
                    format!(
                        "connection {describe}: signal kind mismatch ({} to {})",
                        out_port.kind.name(),
                        in_port.kind.name()
                    ),
                );
            }
        }
        if !driven.insert((to.block_id.as_str(), to.port_id.as_str())) {
            diagnostics.fatal(
                DiagnosticKind::GraphValidation,
                location,
                format!("input '{}' of block '{}' has more than one driver", to.port_id, to.block_id),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::Severity;

    fn run(graph: &Graph) -> (Vec<String>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let resolved = validate(graph, BlockRegistry::builtin(), &mut diagnostics);
        let ids = resolved.iter().map(|b| b.instance.id.clone()).collect();
        (ids, diagnostics)
    }

    fn messages(d: &Diagnostics, severity: Severity) -> Vec<String> {
        d.iter()
            .filter(|x| x.severity == severity)
            .map(|x| x.message.clone())
            .collect()
    }

    #[test]
    fn valid_graph_passes() {
        let g = Graph::new("ok")
            .with_block(BlockInstance::new("in", "io.adc"))
            .with_block(BlockInstance::new("out", "io.dac"))
            .with_connection("in", "left", "out", "left");
        let (ids, d) = run(&g);
        assert_eq!(ids, ["in", "out"]);
        assert!(d.is_empty(), "{:?}", d);
    }

    #[test]
    fn all_problems_are_reported_together() {
        let g = Graph::new("bad")
            .with_block(BlockInstance::new("in", "io.adc"))
            .with_block(BlockInstance::new("in", "io.adc"))
            .with_block(BlockInstance::new("x", "no.such"))
            .with_block(BlockInstance::new("p", "io.pot"))
            .with_block(BlockInstance::new("out", "io.dac"))
            .with_connection("in", "left", "out", "left")
            .with_connection("in", "right", "out", "left")
            .with_connection("p", "value", "out", "right")
            .with_connection("ghost", "out", "out", "right")
            .with_connection("in", "middle", "out", "left");
        let (_, d) = run(&g);
        let fatal = messages(&d, Severity::Fatal);
        assert!(fatal.iter().any(|m| m.contains("duplicate block id 'in'")));
        assert!(fatal.iter().any(|m| m.contains("unknown block type 'no.such'")));
        assert!(fatal.iter().any(|m| m.contains("more than one driver")));
        assert!(fatal.iter().any(|m| m.contains("signal kind mismatch")));
        assert!(fatal.iter().any(|m| m.contains("missing block 'ghost'")));
        assert!(fatal.iter().any(|m| m.contains("no output port 'middle'")));
        assert!(d.iter().all(|x| x.kind == DiagnosticKind::GraphValidation));
    }

    #[test]
    fn block_validation_rejects_unwired_dac() {
        let g = Graph::new("t").with_block(BlockInstance::new("out", "io.dac"));
        let (_, d) = run(&g);
        assert_eq!(d.fatal_count(), 1);
        assert_eq!(d.errors().next().unwrap().block_id(), Some("out"));
    }

    #[test]
    fn required_template_input() {
        let g = Graph::new("t")
            .with_block(BlockInstance::new("g", "math.gain"))
            .with_block(BlockInstance::new("out", "io.dac"))
            .with_connection("g", "out", "out", "left");
        let (_, d) = run(&g);
        let fatal = messages(&d, Severity::Fatal);
        assert_eq!(fatal, ["required input 'in' is not connected"]);
    }

    #[test]
    fn parameters_are_defaulted_clamped_and_checked() {
        let mut g = Graph::new("t").with_block(
            BlockInstance::new("g", "math.gain")
                .with_param("gain", 5.0)
                .with_param("bogus", 1.0),
        );
        g.blocks.push(BlockInstance::new("p", "io.pot"));
        g.blocks[1]
            .parameters
            .insert("pot".into(), ParamValue::Text("pot2".into()));
        g.blocks.push(BlockInstance::new("d", "memory.delay"));
        g.blocks[2]
            .parameters
            .insert("length".into(), ParamValue::Text("long".into()));

        let mut diagnostics = Diagnostics::new();
        let resolved = validate(&g, BlockRegistry::builtin(), &mut diagnostics);
        assert_eq!(resolved[0].params["gain"], 1.99);
        assert_eq!(resolved[1].params["pot"], 2.0);
        assert_eq!(resolved[2].params["length"], 8192.0);
        assert_eq!(resolved[2].params["level"], 1.0);

        let warnings = messages(&diagnostics, Severity::Warning);
        assert!(warnings.iter().any(|m| m.contains("unknown parameter 'bogus'")));
        assert!(warnings.iter().any(|m| m.contains("outside")));
        let fatal = messages(&diagnostics, Severity::Fatal);
        assert!(fatal.iter().any(|m| m.contains("needs a number, got 'long'")));
    }
}
