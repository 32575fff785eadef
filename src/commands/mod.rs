//! Command implementations for the issueflow CLI and server.
//!
//! Each command runs one sequential pipeline against a [`TrackerApi`]:
//! - `graph` - fetch all records, build the hierarchy graph
//! - `stats` - `graph`, then aggregate
//! - `issues_page` - one raw page of records
//! - `projects` / `issue_types` - catalog discovery
//! - `filter` - generated filter expression
//!
//! Offline commands (`graph_from_file`, `classify`, `config_*`, `version`)
//! never touch the network.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{FileConfig, ResolvedConfig, Resolved, TrackerConfig};
use crate::models::graph::{Graph, build_graph};
use crate::models::hierarchy::{self, Category};
use crate::models::stats::{Summary, aggregate};
use crate::models::{IssueRecord, IssueTypeSummary, ProjectSummary, SearchPage};
use crate::tracker::{FilterSource, GeneratedFilter, RecordFetcher, TrackerApi};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Record selection shared by graph-producing commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryOptions {
    /// Filter expression used verbatim when present
    #[serde(default, alias = "customJql")]
    pub custom_filter: Option<String>,
    /// Projects to generate a filter for
    #[serde(default, alias = "projectKeys")]
    pub project_keys: Option<Vec<String>>,
    /// Issue types to generate a filter for
    #[serde(default, alias = "issueTypes")]
    pub issue_types: Option<Vec<String>>,
}

impl QueryOptions {
    /// Build options from CLI-style inputs, where empty lists mean "not given".
    pub fn from_args(filter: Option<String>, projects: Vec<String>, issue_types: Vec<String>) -> Self {
        Self {
            custom_filter: filter,
            project_keys: Some(projects).filter(|p| !p.is_empty()),
            issue_types: Some(issue_types).filter(|t| !t.is_empty()),
        }
    }
}

/// Choose the filter for a fetch.
///
/// A custom filter wins; otherwise projects or types generate one;
/// otherwise the fetcher's configured or generated filter is used.
pub fn select_filter<A: TrackerApi + ?Sized>(
    fetcher: &RecordFetcher<'_, A>,
    options: &QueryOptions,
) -> String {
    if let Some(filter) = options
        .custom_filter
        .as_deref()
        .filter(|f| !f.trim().is_empty())
    {
        return filter.to_string();
    }
    if options.project_keys.is_some() || options.issue_types.is_some() {
        return fetcher
            .generate_filter(
                options.project_keys.as_deref(),
                options.issue_types.as_deref(),
            )
            .expression;
    }
    fetcher.resolve_filter(None)
}

/// Fetch every matching record and build the hierarchy graph.
pub fn graph<A: TrackerApi + ?Sized>(
    api: &A,
    config: &TrackerConfig,
    options: &QueryOptions,
) -> Result<Graph> {
    let fetcher = RecordFetcher::with_config(api, config);
    let filter = select_filter(&fetcher, options);

    let records = fetcher.fetch_all_with(&filter)?;

    let start = Instant::now();
    let graph = build_graph(&records, filter);
    tracing::info!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Transformed records into graph"
    );
    Ok(graph)
}

/// Build a graph from a JSON file holding an array of issue records.
pub fn graph_from_file(path: &Path, filter: Option<&str>) -> Result<Graph> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidInput(format!("Failed to read {}: {}", path.display(), e)))?;
    let records: Vec<IssueRecord> = serde_json::from_str(&content).map_err(|e| {
        Error::InvalidInput(format!(
            "Failed to parse issue records in {}: {}",
            path.display(),
            e
        ))
    })?;
    tracing::info!(records = records.len(), path = %path.display(), "Loaded records from file");
    Ok(build_graph(&records, filter.unwrap_or_default()))
}

/// Fetch, build and aggregate.
pub fn stats<A: TrackerApi + ?Sized>(
    api: &A,
    config: &TrackerConfig,
    options: &QueryOptions,
) -> Result<Summary> {
    Ok(aggregate(&graph(api, config, options)?))
}

/// Fetch a single page of records.
pub fn issues_page<A: TrackerApi + ?Sized>(
    api: &A,
    config: &TrackerConfig,
    start_at: usize,
    max_results: usize,
    filter: Option<&str>,
) -> Result<SearchPage> {
    if max_results == 0 {
        return Err(Error::InvalidInput(
            "max-results must be at least 1".to_string(),
        ));
    }
    let fetcher = RecordFetcher::with_config(api, config);
    let filter = fetcher.resolve_filter(filter);
    fetcher.fetch_page(start_at, max_results, Some(&filter))
}

/// List projects from the tracker catalog.
pub fn projects<A: TrackerApi + ?Sized>(
    api: &A,
    config: &TrackerConfig,
) -> Result<Vec<ProjectSummary>> {
    RecordFetcher::with_config(api, config).discover_projects()
}

/// List issue types with hierarchy levels.
pub fn issue_types<A: TrackerApi + ?Sized>(
    api: &A,
    config: &TrackerConfig,
) -> Result<Vec<IssueTypeSummary>> {
    RecordFetcher::with_config(api, config).discover_issue_types()
}

/// Generate a filter expression. Never fails; discovery errors select the fallback.
pub fn filter<A: TrackerApi + ?Sized>(
    api: &A,
    config: &TrackerConfig,
    project_keys: Option<&[String]>,
    issue_types: Option<&[String]>,
) -> GeneratedFilter {
    RecordFetcher::with_config(api, config).generate_filter(project_keys, issue_types)
}

/// Category and level assigned to an issue-type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub type_name: String,
    pub category: Category,
    pub hierarchy_level: u32,
}

/// Classify an issue-type name.
pub fn classify(type_name: &str) -> Classification {
    Classification {
        type_name: type_name.to_string(),
        category: hierarchy::classify(type_name),
        hierarchy_level: hierarchy::hierarchy_level(type_name),
    }
}

/// Resolved configuration for display. The token is masked.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigShow {
    pub config_path: Option<PathBuf>,
    pub base_url: Option<Resolved<String>>,
    pub email: Option<Resolved<String>>,
    pub api_token: Option<Resolved<String>>,
    pub filter: Option<Resolved<String>>,
    pub story_points_field: Resolved<String>,
    pub page_size: Resolved<usize>,
    pub timeout_secs: Resolved<u64>,
    /// Validation error, if the configuration is not usable
    pub problem: Option<String>,
}

/// Show the resolved configuration with value sources.
pub fn config_show(resolved: &ResolvedConfig) -> ConfigShow {
    let api_token = match (&resolved.api_token, resolved.masked_token()) {
        (Some(token), Some(masked)) => Some(Resolved::new(masked, token.source.clone())),
        _ => None,
    };

    ConfigShow {
        config_path: resolved.config_path.clone(),
        base_url: resolved.base_url.clone(),
        email: resolved.email.clone(),
        api_token,
        filter: resolved.filter.clone(),
        story_points_field: resolved.story_points_field.clone(),
        page_size: resolved.page_size.clone(),
        timeout_secs: resolved.timeout_secs.clone(),
        problem: resolved.validate().err().map(|e| e.to_string()),
    }
}

/// Result of writing a config file.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInit {
    pub path: PathBuf,
    pub written: bool,
}

/// Write config.kdl with the given values.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn config_init(path: &Path, config: &FileConfig, force: bool) -> Result<ConfigInit> {
    if path.exists() && !force {
        return Err(Error::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut doc = config.to_kdl();
    doc.autoformat();
    std::fs::write(path, doc.to_string())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            path,
            std::fs::Permissions::from_mode(crate::config::CONFIG_FILE_MODE),
        )?;
    }

    Ok(ConfigInit {
        path: path.to_path_buf(),
        written: true,
    })
}

/// Build information.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub git_commit: &'static str,
}

/// Report the package version and build metadata.
pub fn version() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: env!("IFLOW_BUILD_TIMESTAMP"),
        git_commit: env!("IFLOW_GIT_COMMIT"),
    }
}

impl CommandResult for Graph {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let summary = aggregate(self);
        let mut out = format!(
            "{} nodes, {} links from {} issues in {} project(s)\n",
            self.nodes.len(),
            self.links.len(),
            self.metadata.total_issues,
            self.metadata.project_count
        );
        if !self.metadata.filter.is_empty() {
            let _ = writeln!(out, "Filter: {}", self.metadata.filter);
        }
        let _ = writeln!(out, "Built: {}", self.metadata.last_updated.to_rfc3339());

        if !summary.nodes_by_category.is_empty() {
            out.push_str("\nNodes by category:\n");
            for (category, count) in &summary.nodes_by_category {
                let _ = writeln!(out, "  {}: {}", category, count);
            }
        }

        if !self.links.is_empty() {
            out.push_str("\nLinks:\n");
            for link in &self.links {
                let _ = writeln!(
                    out,
                    "  {} -> {} ({})",
                    link.source, link.target, link.metadata.link_type
                );
            }
        }
        out.trim_end().to_string()
    }
}

impl CommandResult for Summary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Nodes: {}\nLinks: {}\nAverage story points: {:.2}\n",
            self.total_nodes, self.total_links, self.average_story_points
        );

        let sections = [
            (
                "Nodes by category",
                self.nodes_by_category
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect::<Vec<_>>(),
            ),
            (
                "Links by type",
                self.links_by_type
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
            ),
            (
                "Status distribution",
                self.status_distribution
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect(),
            ),
        ];
        for (title, entries) in sections {
            if entries.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{}:", title);
            for (name, count) in entries {
                let _ = writeln!(out, "  {}: {}", name, count);
            }
        }
        out.trim_end().to_string()
    }
}

impl CommandResult for SearchPage {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Records {}-{} of {}\n",
            self.offset,
            self.offset + self.records.len(),
            self.total
        );
        for record in &self.records {
            let _ = writeln!(
                out,
                "  {} [{}] {} ({})",
                record.key, record.issue_type.name, record.title, record.status.name
            );
        }
        out.trim_end().to_string()
    }
}

impl CommandResult for Vec<ProjectSummary> {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.is_empty() {
            return "No projects found.".to_string();
        }
        self.iter()
            .map(|p| format!("{} {} ({})", p.key, p.name, p.id))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl CommandResult for Vec<IssueTypeSummary> {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.is_empty() {
            return "No issue types found.".to_string();
        }
        self.iter()
            .map(|t| {
                if t.hierarchy_level == hierarchy::NOT_APPLICABLE_LEVEL {
                    format!("{} (level n/a)", t.name)
                } else {
                    format!("{} (level {})", t.name, t.hierarchy_level)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl CommandResult for GeneratedFilter {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.source {
            FilterSource::Generated => self.expression.clone(),
            FilterSource::Fallback { reason } => {
                format!("{}\n(fallback: discovery failed: {})", self.expression, reason)
            }
        }
    }
}

impl CommandResult for Classification {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("{} -> {}", self.type_name, self.category)
    }
}

impl CommandResult for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        fn line<T: std::fmt::Display>(name: &str, value: Option<&Resolved<T>>) -> String {
            match value {
                Some(r) => format!("{}: {} ({})", name, r.value, r.source),
                None => format!("{}: (not set)", name),
            }
        }

        let mut lines = vec![match &self.config_path {
            Some(p) => format!("config file: {}", p.display()),
            None => "config file: (none)".to_string(),
        }];
        lines.push(line("base-url", self.base_url.as_ref()));
        lines.push(line("email", self.email.as_ref()));
        lines.push(line("api-token", self.api_token.as_ref()));
        lines.push(line("filter", self.filter.as_ref()));
        lines.push(line(
            "story-points-field",
            Some(&self.story_points_field),
        ));
        lines.push(line("page-size", Some(&self.page_size)));
        lines.push(line("timeout-secs", Some(&self.timeout_secs)));
        if let Some(problem) = &self.problem {
            lines.push(format!("problem: {}", problem));
        }
        lines.join("\n")
    }
}

impl CommandResult for ConfigInit {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Wrote {}", self.path.display())
    }
}

impl CommandResult for VersionInfo {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "iflow {} ({} built {})",
            self.version, self.git_commit, self.build_timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::FALLBACK_FILTER;
    use crate::tracker::mock::ScriptedTracker;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_options_from_args() {
        let options = QueryOptions::from_args(None, vec![], strings(&["Epic"]));
        assert_eq!(options.project_keys, None);
        assert_eq!(options.issue_types, Some(strings(&["Epic"])));
    }

    #[test]
    fn test_query_options_accept_camel_case_body() {
        let options: QueryOptions = serde_json::from_value(serde_json::json!({
            "projectKeys": ["ABC"],
            "issueTypes": ["Epic"],
            "customJql": "key = ABC-1"
        }))
        .unwrap();

        assert_eq!(options.project_keys, Some(strings(&["ABC"])));
        assert_eq!(options.issue_types, Some(strings(&["Epic"])));
        assert_eq!(options.custom_filter.as_deref(), Some("key = ABC-1"));
    }

    #[test]
    fn test_select_filter_prefers_custom() {
        let tracker = ScriptedTracker::with_total(0);
        let fetcher = RecordFetcher::new(&tracker);
        let options = QueryOptions {
            custom_filter: Some("key = TEST-1".to_string()),
            project_keys: Some(strings(&["ABC"])),
            issue_types: None,
        };
        assert_eq!(select_filter(&fetcher, &options), "key = TEST-1");
        assert_eq!(*tracker.catalog_calls.borrow(), 0);
    }

    #[test]
    fn test_select_filter_generates_from_projects() {
        let tracker = ScriptedTracker::with_total(0);
        let fetcher = RecordFetcher::new(&tracker);
        let options = QueryOptions::from_args(None, strings(&["ABC"]), vec![]);
        let filter = select_filter(&fetcher, &options);

        assert!(filter.starts_with("project in (ABC) AND issuetype in (\"Epic\",\"Story\")"));
        // Only issue types were discovered.
        assert_eq!(*tracker.catalog_calls.borrow(), 1);
    }

    #[test]
    fn test_graph_pipeline_records_filter() {
        let tracker = ScriptedTracker::with_total(3);
        let config = TrackerConfig {
            filter: Some("project = TEST".to_string()),
            ..TrackerConfig::default()
        };
        let graph = graph(&tracker, &config, &QueryOptions::default()).unwrap();

        // 3 stories + 1 project node, every story hangs off the project.
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.links.len(), 3);
        assert_eq!(graph.metadata.filter, "project = TEST");
        assert_eq!(graph.metadata.total_issues, 3);
    }

    #[test]
    fn test_stats_pipeline() {
        let tracker = ScriptedTracker::with_total(2);
        let summary = stats(&tracker, &TrackerConfig::default(), &QueryOptions::default()).unwrap();
        assert_eq!(summary.total_nodes, 3);
        assert_eq!(summary.total_links, 2);
        assert_eq!(summary.status_distribution["To Do"], 2);
    }

    #[test]
    fn test_graph_pipeline_propagates_upstream_error() {
        let mut tracker = ScriptedTracker::with_total(10);
        tracker.fail_search_at = Some(0);
        let result = graph(
            &tracker,
            &TrackerConfig::default(),
            &QueryOptions::from_args(Some("x".to_string()), vec![], vec![]),
        );
        assert!(matches!(result, Err(Error::Upstream(_))));
    }

    #[test]
    fn test_issues_page_rejects_zero_page_size() {
        let tracker = ScriptedTracker::with_total(10);
        let result = issues_page(&tracker, &TrackerConfig::default(), 0, 0, Some("x"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_filter_command_fallback() {
        let mut tracker = ScriptedTracker::with_total(0);
        tracker.fail_projects = true;
        let generated = filter(&tracker, &TrackerConfig::default(), None, None);
        assert_eq!(generated.expression, FALLBACK_FILTER);
        assert!(generated.to_human().contains("fallback"));
        let json: serde_json::Value = serde_json::from_str(&generated.to_json()).unwrap();
        assert_eq!(json["source"]["kind"], "fallback");
    }

    #[test]
    fn test_classify_command() {
        let result = classify("Epic");
        assert_eq!(result.category, Category::Epic);
        assert_eq!(result.hierarchy_level, 2);
        assert_eq!(result.to_human(), "Epic -> epic");
    }

    #[test]
    fn test_graph_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let records = vec![
            IssueRecord::new("TEST-1", "Checkout", "Epic", "TEST"),
            IssueRecord::new("TEST-2", "Pay", "Story", "TEST").with_parent("TEST-1"),
        ];
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let graph = graph_from_file(&path, Some("project = TEST")).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 2);
        assert_eq!(graph.metadata.filter, "project = TEST");
    }

    #[test]
    fn test_graph_from_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            graph_from_file(&path, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.kdl");
        let config = FileConfig {
            base_url: Some("https://example.atlassian.net".to_string()),
            page_size: Some(50),
            ..FileConfig::default()
        };

        config_init(&path, &config, false).unwrap();
        assert_eq!(crate::config::load_file_config(&path).unwrap(), config);
        assert!(config_init(&path, &config, false).is_err());
        assert!(config_init(&path, &config, true).is_ok());
    }

    #[test]
    fn test_summary_human_output() {
        let graph = build_graph(
            &[IssueRecord::new("T-1", "a", "Story", "T")
                .with_story_points(2.0)
                .with_status("Done")],
            "",
        );
        let human = aggregate(&graph).to_human();
        assert!(human.contains("Nodes: 2"));
        assert!(human.contains("Average story points: 2.00"));
        assert!(human.contains("  Done: 1"));
    }
}
