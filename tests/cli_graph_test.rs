//! Integration tests for graph and stats commands via CLI.
//!
//! These tests build graphs from record files so no tracker is needed:
//! - `iflow graph --from-file` produces nodes, links and metadata
//! - `iflow stats --from-file` aggregates the same graph
//! - Output formats (JSON and human-readable) work correctly

mod common;

use common::{TestEnv, stdout_json};
use predicates::prelude::*;
use serde_json::{Value, json};

fn record(key: &str, issue_type: &str, parent: Option<&str>) -> Value {
    let mut record = json!({
        "key": key,
        "title": format!("{} title", key),
        "issue_type": {"name": issue_type},
        "project": {"key": "TEST", "name": "Test Project"},
        "status": {"name": "To Do"}
    });
    if let Some(parent) = parent {
        record["parent"] = json!({"key": parent});
    }
    record
}

fn link_pairs(graph: &Value) -> Vec<(String, String, String)> {
    graph["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| {
            (
                l["source"].as_str().unwrap().to_string(),
                l["target"].as_str().unwrap().to_string(),
                l["metadata"]["link_type"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

// === Graph Tests ===

#[test]
fn test_graph_single_orphan_story() {
    let env = TestEnv::new();
    let path = env.write_records("records.json", &json!([record("TEST-1", "Story", None)]));

    let output = env
        .iflow()
        .args(["graph", "--from-file"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output.stdout);
    let nodes = graph["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["id"], "TEST-1");
    assert_eq!(nodes[0]["category"], "story");
    assert_eq!(nodes[1]["id"], "TEST");
    assert_eq!(nodes[1]["category"], "project");
    assert_eq!(nodes[1]["name"], "Test Project");

    assert_eq!(
        link_pairs(&graph),
        vec![(
            "TEST".to_string(),
            "TEST-1".to_string(),
            "project_to_feature".to_string()
        )]
    );
    assert_eq!(graph["metadata"]["total_issues"], 1);
    assert_eq!(graph["metadata"]["project_count"], 1);
}

#[test]
fn test_graph_epic_with_child_story() {
    let env = TestEnv::new();
    let path = env.write_records(
        "records.json",
        &json!([
            record("TEST-1", "Epic", None),
            record("TEST-2", "Story", Some("TEST-1"))
        ]),
    );

    let output = env
        .iflow()
        .args(["graph", "--from-file"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output.stdout);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);

    let links = link_pairs(&graph);
    assert_eq!(links.len(), 2);
    assert!(links.contains(&(
        "TEST-1".to_string(),
        "TEST-2".to_string(),
        "epic_to_story".to_string()
    )));
    assert!(links.contains(&(
        "TEST".to_string(),
        "TEST-1".to_string(),
        "project_to_feature".to_string()
    )));
}

#[test]
fn test_graph_missing_parent_is_skipped() {
    let env = TestEnv::new();
    let path = env.write_records(
        "records.json",
        &json!([record("TEST-2", "Story", Some("TEST-404"))]),
    );

    let output = env
        .iflow()
        .args(["graph", "--from-file"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let graph = stdout_json(&output.stdout);
    // Node exists, but it has a parent so it is not an orphan either.
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 2);
    assert!(graph["links"].as_array().unwrap().is_empty());
}

#[test]
fn test_graph_records_filter_in_metadata() {
    let env = TestEnv::new();
    let path = env.write_records("records.json", &json!([record("TEST-1", "Story", None)]));

    let output = env
        .iflow()
        .args(["graph", "--filter", "project = TEST", "--from-file"])
        .arg(&path)
        .output()
        .unwrap();

    let graph = stdout_json(&output.stdout);
    assert_eq!(graph["metadata"]["filter"], "project = TEST");
}

#[test]
fn test_graph_human_output() {
    let env = TestEnv::new();
    let path = env.write_records(
        "records.json",
        &json!([
            record("TEST-1", "Epic", None),
            record("TEST-2", "Story", Some("TEST-1"))
        ]),
    );

    env.iflow()
        .args(["-H", "graph", "--from-file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 nodes, 2 links"))
        .stdout(predicate::str::contains("TEST-1 -> TEST-2 (epic_to_story)"));
}

#[test]
fn test_graph_from_missing_file_fails() {
    let env = TestEnv::new();

    env.iflow()
        .args(["graph", "--from-file", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_graph_from_file_conflicts_with_project() {
    let env = TestEnv::new();

    env.iflow()
        .args(["graph", "--from-file", "x.json", "--project", "TEST"])
        .assert()
        .failure();
}

// === Stats Tests ===

#[test]
fn test_stats_average_and_status_distribution() {
    let env = TestEnv::new();
    let records = json!([
        {"key": "TEST-1", "issue_type": {"name": "Story"}, "project": {"key": "TEST"},
         "status": {"name": "Done"}, "story_points": 8.0},
        {"key": "TEST-2", "issue_type": {"name": "Story"}, "project": {"key": "TEST"},
         "status": {"name": "In Progress"}, "story_points": 5.0},
        {"key": "TEST-3", "issue_type": {"name": "Story"}, "project": {"key": "TEST"},
         "status": {"name": "Done"}, "story_points": 3.0}
    ]);
    let path = env.write_records("records.json", &records);

    let output = env
        .iflow()
        .args(["stats", "--from-file"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = stdout_json(&output.stdout);
    assert_eq!(summary["total_nodes"], 4);
    assert_eq!(summary["total_links"], 3);
    let average = summary["average_story_points"].as_f64().unwrap();
    assert!((average - 16.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary["status_distribution"]["Done"], 2);
    assert_eq!(summary["status_distribution"]["In Progress"], 1);
    assert_eq!(summary["nodes_by_category"]["story"], 3);
    assert_eq!(summary["links_by_type"]["project_to_feature"], 3);
}

#[test]
fn test_stats_empty_records() {
    let env = TestEnv::new();
    let path = env.write_records("records.json", &json!([]));

    env.iflow()
        .args(["stats", "--from-file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_nodes\":0"))
        .stdout(predicate::str::contains("\"average_story_points\":0.0"));
}

#[test]
fn test_stats_human_output() {
    let env = TestEnv::new();
    let path = env.write_records("records.json", &json!([record("TEST-1", "Epic", None)]));

    env.iflow()
        .args(["stats", "-H", "--from-file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes: 2"))
        .stdout(predicate::str::contains("Links by type:"));
}
