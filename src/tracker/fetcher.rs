//! Record fetching on top of a [`TrackerApi`].
//!
//! Pages are fetched strictly one after another: the total is unknown until
//! the first page arrives, and a failed page aborts the whole sequence with
//! nothing returned. No retries and no de-duplication happen here; upstream
//! pagination is trusted to be stable for the lifetime of one fetch.
//!
//! When no filter is supplied, one is generated from the tracker catalog.
//! Discovery failures are recovered locally by switching to
//! [`FALLBACK_FILTER`]; the choice is visible on [`GeneratedFilter::source`].

use serde::Serialize;
use std::time::Instant;

use super::wire::{DEFAULT_STORY_POINTS_FIELD, search_fields};
use super::{SearchRequest, TrackerApi, TrackerError};
use crate::config::TrackerConfig;
use crate::models::hierarchy::{FILTER_LEVEL_CUTOFF, hierarchy_level};
use crate::models::{IssueRecord, IssueTypeSummary, ProjectSummary, SearchPage};
use crate::{Error, Result};

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Projects used when the caller names none.
pub const MAX_DISCOVERED_PROJECTS: usize = 5;

/// Permissive filter used when catalog discovery fails.
pub const FALLBACK_FILTER: &str = "project is not EMPTY AND created >= -30d ORDER BY created DESC";

/// Recency clause appended to every generated filter.
const RECENCY_CLAUSE: &str = "created >= -90d";

/// Ordering of generated filters.
const ORDER_CLAUSE: &str = "ORDER BY project ASC, created DESC";

/// How a filter expression was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSource {
    /// Composed from caller-supplied or discovered projects and types
    Generated,
    /// Discovery failed; the fixed fallback was used
    Fallback { reason: String },
}

/// A filter expression together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFilter {
    pub expression: String,
    pub source: FilterSource,
}

impl GeneratedFilter {
    /// Returns true if discovery failed and the fallback was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, FilterSource::Fallback { .. })
    }
}

/// Pages through tracker search results.
pub struct RecordFetcher<'a, A: TrackerApi + ?Sized> {
    api: &'a A,
    page_size: usize,
    story_points_field: String,
    configured_filter: Option<String>,
}

impl<'a, A: TrackerApi + ?Sized> RecordFetcher<'a, A> {
    /// Create a fetcher with default page size and no configured filter.
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            page_size: DEFAULT_PAGE_SIZE,
            story_points_field: DEFAULT_STORY_POINTS_FIELD.to_string(),
            configured_filter: None,
        }
    }

    /// Create a fetcher using the page size, story points field and filter from `config`.
    pub fn with_config(api: &'a A, config: &TrackerConfig) -> Self {
        Self {
            api,
            page_size: config.page_size.max(1),
            story_points_field: config.story_points_field.clone(),
            configured_filter: config.filter.clone().filter(|f| !f.trim().is_empty()),
        }
    }

    /// Override the page size used by [`fetch_all`](Self::fetch_all).
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Pick the filter for a fetch: explicit, then configured, then generated.
    pub fn resolve_filter(&self, explicit: Option<&str>) -> String {
        if let Some(filter) = explicit.filter(|f| !f.trim().is_empty()) {
            return filter.to_string();
        }
        if let Some(filter) = &self.configured_filter {
            return filter.clone();
        }
        self.generate_filter(None, None).expression
    }

    /// Fetch one page of records.
    ///
    /// Without a filter, one is resolved via [`resolve_filter`](Self::resolve_filter).
    pub fn fetch_page(
        &self,
        offset: usize,
        page_size: usize,
        filter: Option<&str>,
    ) -> Result<SearchPage> {
        let filter = match filter {
            Some(f) => f.to_string(),
            None => self.resolve_filter(None),
        };
        let fields = search_fields(&self.story_points_field);
        let request = SearchRequest {
            filter: &filter,
            offset,
            page_size,
            fields: &fields,
        };

        let response = self
            .api
            .search(&request)
            .map_err(|e| Error::Upstream(e.to_string()))?;
        Ok(response.into_page(&self.story_points_field))
    }

    /// Fetch every record matching the resolved filter.
    pub fn fetch_all(&self) -> Result<Vec<IssueRecord>> {
        let filter = self.resolve_filter(None);
        self.fetch_all_with(&filter)
    }

    /// Fetch every record matching `filter`, concatenated in arrival order.
    ///
    /// Each page starts where the previous one ended, so trackers that cap
    /// the page size below the requested one are still read completely.
    pub fn fetch_all_with(&self, filter: &str) -> Result<Vec<IssueRecord>> {
        let start = Instant::now();
        let mut records = Vec::new();
        let mut offset = 0;
        let mut pages = 0;

        loop {
            let page = self.fetch_page(offset, self.page_size, Some(filter))?;
            pages += 1;
            let received = page.records.len();
            tracing::debug!(offset, received, total = page.total, "Fetched page");
            records.extend(page.records);

            // The tracker may serve fewer records than requested.
            if received == 0 || offset + received >= page.total {
                break;
            }
            offset += received;
        }

        tracing::info!(
            records = records.len(),
            pages,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched all records"
        );
        Ok(records)
    }

    /// List projects from the tracker catalog.
    pub fn discover_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.try_discover_projects()
            .map_err(|e| Error::Upstream(format!("Failed to fetch projects: {}", e)))
    }

    /// List issue types with their hierarchy level, shallowest first.
    pub fn discover_issue_types(&self) -> Result<Vec<IssueTypeSummary>> {
        self.try_discover_issue_types()
            .map_err(|e| Error::Upstream(format!("Failed to fetch issue types: {}", e)))
    }

    /// Build a filter from project keys and issue type names.
    ///
    /// Missing inputs are discovered from the catalog: the first
    /// [`MAX_DISCOVERED_PROJECTS`] projects, and every issue type with a
    /// known hierarchy level. Never fails; see [`FilterSource`].
    pub fn generate_filter(
        &self,
        project_keys: Option<&[String]>,
        issue_types: Option<&[String]>,
    ) -> GeneratedFilter {
        match self.compose_filter(project_keys, issue_types) {
            Ok(expression) => {
                tracing::info!(filter = %expression, "Generated filter");
                GeneratedFilter {
                    expression,
                    source: FilterSource::Generated,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Filter discovery failed, using fallback filter");
                GeneratedFilter {
                    expression: FALLBACK_FILTER.to_string(),
                    source: FilterSource::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    fn compose_filter(
        &self,
        project_keys: Option<&[String]>,
        issue_types: Option<&[String]>,
    ) -> std::result::Result<String, TrackerError> {
        let projects: Vec<String> = match project_keys {
            Some(keys) => keys.to_vec(),
            None => self
                .try_discover_projects()?
                .into_iter()
                .take(MAX_DISCOVERED_PROJECTS)
                .map(|p| p.key)
                .collect(),
        };

        let types: Vec<String> = match issue_types {
            Some(names) => names.to_vec(),
            None => self
                .try_discover_issue_types()?
                .into_iter()
                .filter(|t| t.hierarchy_level < FILTER_LEVEL_CUTOFF)
                .map(|t| t.name)
                .collect(),
        };

        let mut clauses = Vec::new();
        if !projects.is_empty() {
            clauses.push(format!("project in ({})", projects.join(",")));
        }
        if !types.is_empty() {
            let quoted: Vec<String> = types.iter().map(|t| format!("\"{}\"", t)).collect();
            clauses.push(format!("issuetype in ({})", quoted.join(",")));
        }
        clauses.push(RECENCY_CLAUSE.to_string());

        Ok(format!("{} {}", clauses.join(" AND "), ORDER_CLAUSE))
    }

    fn try_discover_projects(&self) -> std::result::Result<Vec<ProjectSummary>, TrackerError> {
        Ok(self
            .api
            .list_projects()?
            .into_iter()
            .map(|p| ProjectSummary {
                key: p.key,
                name: p.name,
                id: p.id,
            })
            .collect())
    }

    fn try_discover_issue_types(
        &self,
    ) -> std::result::Result<Vec<IssueTypeSummary>, TrackerError> {
        let mut types: Vec<IssueTypeSummary> = self
            .api
            .list_issue_types()?
            .into_iter()
            .map(|t| IssueTypeSummary {
                hierarchy_level: hierarchy_level(&t.name),
                id: t.id,
                name: t.name,
            })
            .collect();
        types.sort_by_key(|t| t.hierarchy_level);
        Ok(types)
    }
}
