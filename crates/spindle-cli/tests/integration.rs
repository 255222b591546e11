//! Integration tests for the `spindle` binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const GRAPH: &str = r#"{
    "metadata": { "name": "Half" },
    "blocks": [
        { "id": "in", "type": "io.adc" },
        { "id": "g", "type": "math.gain", "parameters": { "gain": 0.5 } },
        { "id": "out", "type": "io.dac" }
    ],
    "connections": [
        { "from": { "blockId": "in", "portId": "left" }, "to": { "blockId": "g", "portId": "in" } },
        { "from": { "blockId": "g", "portId": "out" }, "to": { "blockId": "out", "portId": "left" } }
    ]
}"#;

const CYCLE: &str = r#"{
    "blocks": [
        { "id": "in", "type": "io.adc" },
        { "id": "mix", "type": "mix.mixer" },
        { "id": "g", "type": "math.gain" },
        { "id": "out", "type": "io.dac" }
    ],
    "connections": [
        { "from": { "blockId": "in", "portId": "left" }, "to": { "blockId": "mix", "portId": "in1" } },
        { "from": { "blockId": "mix", "portId": "out" }, "to": { "blockId": "g", "portId": "in" } },
        { "from": { "blockId": "g", "portId": "out" }, "to": { "blockId": "mix", "portId": "in2" } },
        { "from": { "blockId": "g", "portId": "out" }, "to": { "blockId": "out", "portId": "left" } }
    ]
}"#;

/// Runs `spindle` inside `dir`, isolated from any user templates.
fn spindle(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spindle"))
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run spindle")
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("half.json"), GRAPH).unwrap();
    std::fs::write(dir.path().join("cycle.json"), CYCLE).unwrap();
    std::fs::write(
        dir.path().join("thru.spn"),
        "; pass-through\nrdax adcl, 1.0\nwrax dacl, 0.0\n",
    )
    .unwrap();
    dir
}

#[test]
fn help_lists_subcommands() {
    let dir = workspace();
    let output = spindle(dir.path(), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["compile", "assemble", "check", "blocks"] {
        assert!(stdout.contains(command), "help should mention '{command}'");
    }
}

#[test]
fn compile_writes_assembly_to_stdout() {
    let dir = workspace();
    let output = spindle(dir.path(), &["compile", "half.json", "--no-user-templates"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("; Half\n"));
    assert!(stdout.contains("wrax\tDACL, 0.0"));
}

#[test]
fn compile_with_binary_output() {
    let dir = workspace();
    let output = spindle(
        dir.path(),
        &["compile", "half.json", "-o", "half.spn", "-b", "half.hex", "-f", "hex"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let assembly = std::fs::read_to_string(dir.path().join("half.spn")).unwrap();
    assert!(assembly.contains("; generated by spindle"));
    let words = std::fs::read_to_string(dir.path().join("half.hex")).unwrap();
    assert_eq!(words.lines().count(), 128);
    assert!(words.lines().all(|l| l.starts_with("0x") && l.len() == 10));
}

#[test]
fn compile_reports_cycle() {
    let dir = workspace();
    let output = spindle(dir.path(), &["compile", "cycle.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cycle"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn register_override_is_applied() {
    let dir = workspace();
    let output = spindle(dir.path(), &["compile", "half.json", "--registers", "1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("register"), "stderr: {stderr}");
}

#[test]
fn project_file_sets_ceilings() {
    let dir = workspace();
    std::fs::write(dir.path().join("spindle.toml"), "[compile]\nregister_count = 1\n").unwrap();
    let output = spindle(dir.path(), &["compile", "half.json"]);
    assert!(!output.status.success());

    let output = spindle(dir.path(), &["compile", "half.json", "--registers", "8"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn explicit_config_must_exist() {
    let dir = workspace();
    let output = spindle(dir.path(), &["--config", "missing.toml", "blocks"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.toml"));
}

#[test]
fn assemble_intel_hex_to_stdout() {
    let dir = workspace();
    let output = spindle(dir.path(), &["assemble", "thru.spn"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(":1000000040000284000002C6"));
    assert!(stdout.trim_end().ends_with(":00000001FF"));
}

#[test]
fn assemble_slot_moves_the_image() {
    let dir = workspace();
    let output = spindle(dir.path(), &["assemble", "thru.spn", "--slot", "2"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with(":10040000"));

    let output = spindle(dir.path(), &["assemble", "thru.spn", "--slot", "8"]);
    assert!(!output.status.success());
}

#[test]
fn assemble_binary_needs_output_path() {
    let dir = workspace();
    let output = spindle(dir.path(), &["assemble", "thru.spn", "-f", "bin"]);
    assert!(!output.status.success());

    let output = spindle(dir.path(), &["assemble", "thru.spn", "-f", "bin", "-o", "thru.bin"]);
    assert!(output.status.success());
    let bytes = std::fs::read(dir.path().join("thru.bin")).unwrap();
    assert_eq!(bytes.len(), 512);
    assert_eq!(&bytes[..4], &[0x40, 0x00, 0x02, 0x84]);
}

#[test]
fn assemble_errors_carry_line_numbers() {
    let dir = workspace();
    std::fs::write(dir.path().join("bad.spn"), "clr\nfrob 1\nsof 9.0, 0\n").unwrap();
    let output = spindle(dir.path(), &["assemble", "bad.spn"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
    assert!(stderr.contains("line 3"), "stderr: {stderr}");

    let output = spindle(dir.path(), &["assemble", "bad.spn", "--strict"]);
    assert!(!output.status.success());
}

#[test]
fn check_prints_schedule() {
    let dir = workspace();
    let output = spindle(dir.path(), &["check", "half.json", "--schedule"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let order: Vec<&str> = stdout
        .lines()
        .filter_map(|l| l.split_whitespace().nth(1))
        .take(3)
        .collect();
    assert_eq!(order, ["in", "g", "out"]);
    assert!(stdout.contains("ok"));
}

#[test]
fn check_json_reports_schedule_and_diagnostics() {
    let dir = workspace();
    let output = spindle(dir.path(), &["check", "half.json", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["schedule"], serde_json::json!(["in", "g", "out"]));

    let output = spindle(dir.path(), &["check", "cycle.json", "--json"]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    let fatal = json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["severity"] == "fatal")
        .unwrap();
    assert_eq!(fatal["kind"], "graph_validation");
    assert!(fatal["message"].as_str().unwrap().contains("cycle"));
}

#[test]
fn blocks_lists_builtins_and_details() {
    let dir = workspace();
    let output = spindle(dir.path(), &["blocks"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for type_id in ["io.adc", "io.dac", "mix.mixer", "memory.delay", "math.gain", "filter.lpf1"] {
        assert!(stdout.contains(type_id), "listing should contain '{type_id}'");
    }

    let output = spindle(dir.path(), &["blocks", "memory.delay"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("length"));
    assert!(stdout.contains("delay memory"));

    let output = spindle(dir.path(), &["blocks", "--category", "io", "--json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);

    let output = spindle(dir.path(), &["blocks", "no.such"]);
    assert!(!output.status.success());
}

#[test]
fn user_templates_are_loaded_from_config_dir() {
    let dir = workspace();
    let blocks = dir.path().join("xdg").join("spindle").join("blocks");
    std::fs::create_dir_all(&blocks).unwrap();
    std::fs::write(
        blocks.join("half.blk"),
        "type = \"user.half\"\nname = \"Half\"\ncategory = \"math\"\n\n[[inputs]]\nid = \"in\"\nname = \"In\"\n\n[[outputs]]\nid = \"out\"\nname = \"Out\"\n---\n@if connected(out)\nrdax ${input.in}, 0.5\nwrax ${output.out}, 0.0\n@endif\n",
    )
    .unwrap();

    let output = spindle(dir.path(), &["blocks"]);
    if cfg!(target_os = "linux") {
        assert!(String::from_utf8_lossy(&output.stdout).contains("user.half"));
    }
    let output = spindle(dir.path(), &["blocks", "--no-user-templates"]);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("user.half"));
}

#[test]
fn missing_user_template_dir_is_not_created() {
    let dir = workspace();
    let output = spindle(dir.path(), &["blocks"]);
    assert!(output.status.success());
    assert!(!dir.path().join("xdg").join("spindle").exists());
}
