//! Integration tests for Knit CLI
//!
//! Tests end-to-end command behavior using the CLI binary.
//! Uses tempfile for isolated test directories.

use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the knit binary (built by cargo)
fn knit_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_knit"));
    cmd.env_remove("KNIT_STRATEGY").env_remove("RUST_LOG");
    cmd
}

/// Run knit command with the given args in the specified directory
fn run_knit(dir: &Path, args: &[&str]) -> Output {
    knit_binary()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute knit command")
}

/// Run knit with `stdin` piped in
fn run_knit_with_stdin(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = knit_binary()
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn knit command");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for knit")
}

/// Get stdout as string
fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as string
fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).expect("Failed to write input");
    path
}

/// Two chunks under one topic, chained with `next`.
fn document_payload() -> Value {
    json!({
        "nodes": [
            {"id": "topic-1", "class": "knit:Topic", "friendlyName": "Intro"},
            {
                "id": "chunk-1",
                "class": "knit:Chunk",
                "attributes": {"schema:text": "hello"},
                "relationships": {"knit:hasParent": "topic-1", "knit:next": "chunk-2"}
            },
            {
                "id": "chunk-2",
                "class": "knit:Chunk",
                "attributes": {"schema:text": "world"},
                "relationships": {"knit:hasParent": ["topic-1"]}
            }
        ],
        "metadata": {"source": "doc.md"}
    })
}

fn edges(graph: &Value) -> Vec<(String, String, String, bool)> {
    graph["edges"]
        .as_array()
        .expect("edges array")
        .iter()
        .map(|e| {
            (
                e["source"].as_str().unwrap().to_string(),
                e["target"].as_str().unwrap().to_string(),
                e["type"].as_str().unwrap().to_string(),
                e["isReverse"].as_bool().unwrap(),
            )
        })
        .collect()
}

fn edge(source: &str, target: &str, predicate: &str, reverse: bool) -> (String, String, String, bool) {
    (source.to_string(), target.to_string(), predicate.to_string(), reverse)
}

// ============================================================================
// Help and listing
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = run_knit(dir.path(), &["--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("build"));
    assert!(out.contains("batch"));
    assert!(out.contains("strategies"));
}

#[test]
fn test_no_command_prints_help() {
    let dir = TempDir::new().unwrap();
    let output = run_knit(dir.path(), &[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
}

#[test]
fn test_strategies_json() {
    let dir = TempDir::new().unwrap();
    let output = run_knit(dir.path(), &["strategies", "--format", "json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let list: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let builders = list["builders"].as_array().unwrap();
    assert_eq!(builders.len(), 7);
    assert_eq!(builders[0]["builder"], "graph");
    let cypher = builders.iter().find(|b| b["builder"] == "cypher").unwrap();
    assert_eq!(cypher["strategies"], json!(["cypher", "neo4j"]));
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn test_build_links_and_reverses() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "doc.json", &document_payload());

    let output = run_knit(dir.path(), &["build", "doc.json", "-o", "graph.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());

    let graph: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("graph.json")).unwrap()).unwrap();
    assert_eq!(
        edges(&graph),
        vec![
            edge("chunk-1", "topic-1", "knit:hasParent", false),
            edge("topic-1", "chunk-1", "knit:hasChild", true),
            edge("chunk-1", "chunk-2", "knit:next", false),
            edge("chunk-2", "chunk-1", "knit:previous", true),
            edge("chunk-2", "topic-1", "knit:hasParent", false),
            edge("topic-1", "chunk-2", "knit:hasChild", true),
        ]
    );
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(graph["metadata"]["source"], "doc.md");
    assert_eq!(graph["stats"]["reverseEdgeCount"], 3);

    // Summary goes to stderr
    assert!(stderr(&output).contains("graph"));
}

#[test]
fn test_build_reads_stdin_and_writes_stdout() {
    let dir = TempDir::new().unwrap();
    let payload = serde_json::to_string(&document_payload()).unwrap();

    let output = run_knit_with_stdin(dir.path(), &["build", "-", "--compact", "-q"], &payload);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert_eq!(out.lines().count(), 1);
    let graph: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(graph["stats"]["edgeCount"], 6);
    assert!(stderr(&output).is_empty());
}

#[test]
fn test_build_bare_array_payload() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "nodes.json",
        &json!([
            {"id": "a", "class": "knit:Chunk", "relationships": {"knit:mentions": "b"}},
            {"id": "b", "class": "knit:Chunk"}
        ]),
    );

    let output = run_knit(dir.path(), &["build", "nodes.json", "-q"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let graph: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(edges(&graph).contains(&edge("b", "a", "knit:mentions_REV", true)));
}

#[test]
fn test_build_cypher_statements() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "doc.json", &document_payload());

    let output = run_knit(dir.path(), &["build", "doc.json", "-s", "neo4j", "-q"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert!(!lines.is_empty());
    assert!(lines.iter().all(|l| l.contains("MERGE")));
    assert!(lines[0].starts_with("MERGE"));
    assert!(lines[0].contains("{id: 'topic-1'}"));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("MATCH") && l.contains("[:`knit_hasParent`]")));
}

#[test]
fn test_build_summary_json() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "nodes.json",
        &json!([{"id": "a", "class": "knit:Chunk", "relationships": {"knit:next": "missing"}}]),
    );

    let output = run_knit(
        dir.path(),
        &["build", "nodes.json", "-o", "out.json", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: Value = serde_json::from_str(&stderr(&output)).unwrap();
    assert_eq!(report["summary"]["builder"], "graph");
    assert_eq!(report["summary"]["diagnostics"]["dangling_target"], 1);
    assert_eq!(report["diagnostics"][0]["nodeId"], "a");
}

#[test]
fn test_strategy_from_env() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "doc.json", &document_payload());

    let output = knit_binary()
        .current_dir(dir.path())
        .args(["build", "doc.json", "-q"])
        .env("KNIT_STRATEGY", "cypher")
        .output()
        .expect("Failed to execute knit command");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("MERGE"));
}

#[test]
fn test_invalid_json_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.json"), "{ not json").unwrap();

    let output = run_knit(dir.path(), &["build", "bad.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to parse JSON from bad.json"));
}

#[test]
fn test_build_nodes_without_class() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "plain.json",
        &json!([{"id": "A", "relationships": {"hasParent": ["B"]}}, {"id": "B"}]),
    );

    let output = run_knit(dir.path(), &["build", "plain.json", "-s", "graph", "-q"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let graph: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        edges(&graph),
        vec![
            edge("A", "B", "hasParent", false),
            edge("B", "A", "knit:hasChild", true),
        ]
    );
}

#[test]
fn test_malformed_node_fails() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "bad.json", &json!({"nodes": [{"class": "knit:Chunk"}]}));

    let output = run_knit(dir.path(), &["build", "bad.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to assemble bad.json"));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_knit(dir.path(), &["build", "nope.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read nope.json"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_strategy_and_flag_override() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "doc.json", &document_payload());
    fs::write(dir.path().join(".knitrc.toml"), "[assembler]\nstrategy = \"cypher\"\n").unwrap();

    let output = run_knit(dir.path(), &["build", "doc.json", "-q"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("MERGE"));

    let output = run_knit(dir.path(), &["build", "doc.json", "-q", "-s", "graph"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let graph: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(graph["edges"].is_array());
}

#[test]
fn test_config_reverse_suffix() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "nodes.json",
        &json!([
            {"id": "a", "class": "knit:Chunk", "relationships": {"knit:mentions": "b", "knit:next": "b"}},
            {"id": "b", "class": "knit:Chunk"}
        ]),
    );
    fs::write(dir.path().join(".knitrc.toml"), "[linker]\nreverse_suffix = \"_INV\"\n").unwrap();

    let output = run_knit(dir.path(), &["build", "nodes.json", "-q"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let graph: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let edges = edges(&graph);
    assert!(edges.contains(&edge("b", "a", "knit:mentions_INV", true)));
    // Rewrite rules still apply
    assert!(edges.contains(&edge("b", "a", "knit:previous", true)));
}

#[test]
fn test_invalid_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "doc.json", &document_payload());
    fs::write(dir.path().join(".knitrc.toml"), "[assembler\nstrategy=").unwrap();

    let output = run_knit(dir.path(), &["build", "doc.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Failed to parse .knitrc.toml"));
}

// ============================================================================
// Score
// ============================================================================

#[test]
fn test_score_code_payload() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "code.json",
        &json!([
            {"id": "file:pkg/util.py", "class": "knit:File", "attributes": {"knit:filePath": "pkg/util.py"}}
        ]),
    );

    let output = run_knit(dir.path(), &["score", "code.json", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["selected"], "code_graph");
    assert_eq!(report["explicit"], false);
    let graph = report["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["builder"] == "graph")
        .unwrap();
    assert_eq!(graph["score"], 0.9);
}

#[test]
fn test_score_table() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "doc.json", &document_payload());

    let output = run_knit(dir.path(), &["score", "doc.json", "-s", "hierarchy"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("names hierarchy directly"));
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn test_batch_writes_one_file_per_input() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "a.json", &document_payload());
    write_json(dir.path(), "b.json", &json!([{"id": "x", "class": "knit:Chunk"}]));

    let output = run_knit(dir.path(), &["batch", "a.json", "b.json", "-d", "out", "-j", "2"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let a: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("out/a.json")).unwrap()).unwrap();
    let b: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("out/b.json")).unwrap()).unwrap();
    assert_eq!(a["stats"]["edgeCount"], 6);
    assert_eq!(b["stats"]["nodeCount"], 1);
    assert!(stderr(&output).contains("2 of 2 runs succeeded"));
}

#[test]
fn test_batch_to_stdout_keyed_by_input() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "a.json", &document_payload());
    write_json(dir.path(), "b.json", &json!([{"id": "x", "class": "knit:Chunk"}]));

    let output = run_knit(dir.path(), &["batch", "a.json", "b.json", "-q"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let results: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let keys: Vec<&String> = results.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["a.json", "b.json"]);
}

#[test]
fn test_batch_duplicate_input_reported() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "a.json", &json!([{"id": "x", "class": "knit:Chunk"}]));

    let output = run_knit(dir.path(), &["batch", "a.json", "a.json", "--format", "json"]);
    assert!(!output.status.success());

    let results: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(results.as_object().unwrap().len(), 1);
    let err = stderr(&output);
    assert!(err.contains("Duplicate input a.json"), "stderr: {}", err);
    assert!(err.contains("1 of 2 inputs failed"), "stderr: {}", err);
}

#[test]
fn test_batch_write_failure_keeps_going() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "a.json", &json!([{"id": "x", "class": "knit:Chunk"}]));
    write_json(dir.path(), "b.json", &json!([{"id": "y", "class": "knit:Chunk"}]));
    fs::write(dir.path().join("out"), "not a directory").unwrap();

    let output = run_knit(dir.path(), &["batch", "a.json", "b.json", "-d", "out", "--format", "json"]);
    assert!(!output.status.success());

    let err = stderr(&output);
    assert!(err.contains("2 of 2 inputs failed"), "stderr: {}", err);
    assert!(err.contains("Failed to create out"), "stderr: {}", err);
}

#[test]
fn test_batch_merge_links_across_files() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "topics.json",
        &json!([{"id": "topic-1", "class": "knit:Topic"}]),
    );
    write_json(
        dir.path(),
        "chunks.json",
        &json!([{"id": "chunk-1", "class": "knit:Chunk", "relationships": {"knit:hasParent": "topic-1"}}]),
    );

    let output = run_knit(
        dir.path(),
        &["batch", "topics.json", "chunks.json", "--merge", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let graph: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(edges(&graph).contains(&edge("topic-1", "chunk-1", "knit:hasChild", true)));

    let report: Value = serde_json::from_str(&stderr(&output)).unwrap();
    assert_eq!(report["merged"], true);
    assert_eq!(report["runs"][0]["diagnostics"], 0);
}

#[test]
fn test_batch_reports_failures() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "good.json", &document_payload());
    fs::write(dir.path().join("bad.json"), "[{").unwrap();

    let output = run_knit(dir.path(), &["batch", "good.json", "bad.json", "-d", "out"]);
    assert!(!output.status.success());
    assert!(dir.path().join("out/good.json").exists());
    assert!(!dir.path().join("out/bad.json").exists());
    assert!(stderr(&output).contains("1 of 2 inputs failed"));
}
