//! Loading graphs and user templates from disk.

use std::path::Path;

use spindle_compiler::GraphCompiler;
use spindle_config::{ConfigError, ProjectConfig, build_registry, load_graph, load_template_dir};
use spindle_registry::BlockRegistry;
use tempfile::TempDir;

const HALF_TEMPLATE: &str = r#"type = "user.half"
name = "Half"
category = "math"
description = "Halves a signal"

[[inputs]]
id = "in"
name = "In"
required = true

[[outputs]]
id = "out"
name = "Out"
---
@section main
@if connected(out)
rdax ${input.in}, 0.5
wrax ${output.out}, 0.0
@endif
"#;

const GRAPH: &str = r#"{
    "metadata": { "name": "halved" },
    "blocks": [
        { "id": "in", "type": "io.adc" },
        { "id": "h", "type": "user.half" },
        { "id": "out", "type": "io.dac" }
    ],
    "connections": [
        { "from": { "blockId": "in", "portId": "left" }, "to": { "blockId": "h", "portId": "in" } },
        { "from": { "blockId": "h", "portId": "out" }, "to": { "blockId": "out", "portId": "left" } }
    ]
}"#;

fn write(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(name), text).unwrap();
}

#[test]
fn project_templates_compile() {
    let project = TempDir::new().unwrap();
    std::fs::create_dir(project.path().join("blocks")).unwrap();
    write(&project.path().join("blocks"), "half.blk", HALF_TEMPLATE);
    write(project.path(), "spindle.toml", "template_dirs = [\"blocks\"]\n");
    write(project.path(), "patch.json", GRAPH);

    let config = ProjectConfig::discover(None, project.path()).unwrap();
    let registry = build_registry(&config, false).unwrap();
    assert!(registry.contains("user.half"));
    assert_eq!(registry.len(), BlockRegistry::new().len() + 1);

    let graph = load_graph(project.path().join("patch.json")).unwrap();
    let result = GraphCompiler::new(&registry).compile(&graph, &config.compile);
    assert!(result.success, "{:?}", result.diagnostics);
    assert!(result.assembly.unwrap().contains("rdax\tREG0, 0.5"));
}

#[test]
fn template_colliding_with_builtin_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "gain.blk",
        &HALF_TEMPLATE.replace("user.half", "math.gain"),
    );
    let mut registry = BlockRegistry::new();
    let err = load_template_dir(&mut registry, dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Template { .. }));
    assert!(err.to_string().contains("math.gain"));
}

#[test]
fn malformed_template_reports_its_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.blk", "type = \"user.broken\"\nno separator here\n");
    let mut registry = BlockRegistry::new();
    let err = load_template_dir(&mut registry, dir.path()).unwrap_err();
    assert!(err.to_string().contains("broken.blk"), "got: {err}");
}

#[test]
fn missing_template_dir_is_an_error() {
    let project = TempDir::new().unwrap();
    write(project.path(), "spindle.toml", "template_dirs = [\"nope\"]\n");
    let config = ProjectConfig::discover(None, project.path()).unwrap();
    assert!(matches!(
        build_registry(&config, false),
        Err(ConfigError::ReadDir { .. })
    ));
}

#[test]
fn graph_errors() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_graph(dir.path().join("missing.json")),
        Err(ConfigError::ReadFile { .. })
    ));
    write(dir.path(), "bad.json", "{ \"blocks\": [ { \"id\": 1 } ] }");
    let err = load_graph(dir.path().join("bad.json")).unwrap_err();
    assert!(matches!(err, ConfigError::GraphParse { .. }));
    assert!(err.to_string().contains("bad.json"));
}
