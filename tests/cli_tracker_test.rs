//! Integration tests for tracker-backed commands via CLI.
//!
//! The tracker is configured at an unreachable loopback address, which
//! exercises the failure paths without any network access:
//! - filter generation falls back instead of failing
//! - fetches and catalog listings fail with an upstream error

mod common;

use common::{TestEnv, stdout_json};
use predicates::prelude::*;

const FALLBACK_FILTER: &str = "project is not EMPTY AND created >= -30d ORDER BY created DESC";

// === Filter Tests ===

#[test]
fn test_filter_falls_back_when_discovery_fails() {
    let env = TestEnv::unreachable();

    let output = env.iflow().args(["filter"]).output().unwrap();
    assert!(output.status.success());

    let filter = stdout_json(&output.stdout);
    assert_eq!(filter["expression"], FALLBACK_FILTER);
    assert_eq!(filter["source"]["kind"], "fallback");
    assert!(filter["source"]["reason"].is_string());
}

#[test]
fn test_filter_with_explicit_inputs_needs_no_discovery() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["-H", "filter", "-p", "ABC", "-t", "Epic", "-t", "Story"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "project in (ABC) AND issuetype in (\"Epic\",\"Story\") AND created >= -90d ORDER BY project ASC, created DESC\n",
        ));
}

// === Fetch Failure Tests ===

#[test]
fn test_graph_fails_with_upstream_error() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["graph", "--filter", "project = TEST"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Tracker API error"));
}

#[test]
fn test_stats_fails_with_upstream_error() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["-H", "stats"])
        .env("JQL_FILTER", "project = TEST")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Tracker API error"));
}

#[test]
fn test_issues_fails_with_upstream_error() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["issues", "--filter", "project = TEST", "--max-results", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tracker API error"));
}

#[test]
fn test_issues_rejects_zero_page_size() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["issues", "--filter", "project = TEST", "--max-results", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_projects_fails_with_discovery_message() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["projects"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch projects"));
}

#[test]
fn test_issue_types_fails_with_discovery_message() {
    let env = TestEnv::unreachable();

    env.iflow()
        .args(["issue-types"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch issue types"));
}
