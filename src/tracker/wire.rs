//! Raw tracker response shapes and their translation into issue records.
//!
//! The search endpoint nests everything under `fields`; translation flattens
//! that into [`IssueRecord`]. Custom fields (such as story points) are not
//! declared and land in [`WireFields::extra`], looked up by configured id.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::models::hierarchy;
use crate::models::{
    Component, IssuePriority, IssueRecord, IssueStatus, IssueTypeRef, ParentRef, Person,
    ProjectRef, Resolution, SearchPage, Version,
};

/// Custom field holding story points on Jira Cloud.
pub const DEFAULT_STORY_POINTS_FIELD: &str = "customfield_10016";

/// Standard fields requested for every search.
pub const SEARCH_FIELDS: &[&str] = &[
    "id",
    "key",
    "summary",
    "description",
    "status",
    "priority",
    "issuetype",
    "project",
    "parent",
    "assignee",
    "reporter",
    "created",
    "updated",
    "resolution",
    "resolutiondate",
    "labels",
    "components",
    "versions",
];

/// Field selector for a search, including the story points field.
pub fn search_fields(story_points_field: &str) -> Vec<String> {
    SEARCH_FIELDS
        .iter()
        .map(|f| f.to_string())
        .chain(std::iter::once(story_points_field.to_string()))
        .collect()
}

/// Response from the search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub start_at: usize,
    #[serde(default)]
    pub max_results: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub issues: Vec<WireIssue>,
}

impl SearchResponse {
    /// Translate every issue and keep the paging counters.
    pub fn into_page(self, story_points_field: &str) -> SearchPage {
        SearchPage {
            offset: self.start_at,
            page_size: self.max_results,
            total: self.total,
            records: self
                .issues
                .into_iter()
                .map(|issue| issue.into_record(story_points_field))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireIssue {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub fields: WireFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireFields {
    #[serde(default)]
    pub summary: String,
    pub description: Option<Value>,
    pub status: Option<WireStatus>,
    pub priority: Option<WireNamed>,
    pub issuetype: Option<WireNamed>,
    pub project: WireProject,
    pub parent: Option<WireParent>,
    pub assignee: Option<WireUser>,
    pub reporter: Option<WireUser>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    pub resolution: Option<WireNamed>,
    pub resolutiondate: Option<String>,
    pub labels: Option<Vec<String>>,
    pub components: Option<Vec<WireNamed>>,
    pub versions: Option<Vec<WireVersion>>,
    /// Undeclared fields, including custom fields
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStatus {
    pub name: String,
    pub status_category: Option<WireNamed>,
}

/// Any `{id, name}` object (priority, issue type, resolution, component).
#[derive(Debug, Clone, Deserialize)]
pub struct WireNamed {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireParent {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub fields: Option<WireParentFields>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireParentFields {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    #[serde(default)]
    pub display_name: String,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVersion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub release_date: Option<String>,
}

/// Project as returned by the catalog and embedded in issues.
#[derive(Debug, Clone, Deserialize)]
pub struct WireProject {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// Paged project catalog response.
#[derive(Debug, Clone, Deserialize)]
pub struct WireProjectPage {
    #[serde(default)]
    pub values: Vec<WireProject>,
}

/// Issue type as returned by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct WireIssueType {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// Error body returned by the tracker on failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    message: Option<String>,
}

/// Extract the first human-readable message from an error body, if any.
pub fn error_message(body: &str) -> Option<String> {
    let parsed: WireErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error_messages
        .into_iter()
        .next()
        .or(parsed.message)
        .filter(|m| !m.is_empty())
}

impl From<WireUser> for Person {
    fn from(user: WireUser) -> Self {
        Person {
            display_name: user.display_name,
            email_address: user.email_address,
        }
    }
}

impl WireIssue {
    /// Flatten into an [`IssueRecord`], reading story points from `story_points_field`.
    pub fn into_record(self, story_points_field: &str) -> IssueRecord {
        let fields = self.fields;
        let issue_type = fields.issuetype.map(|t| t.name).unwrap_or_default();
        let story_points = fields.extra.get(story_points_field).and_then(Value::as_f64);

        IssueRecord {
            id: self.id,
            key: self.key,
            title: fields.summary,
            description: fields.description.filter(|d| !d.is_null()),
            status: fields
                .status
                .map(|s| IssueStatus {
                    name: s.name,
                    category: s.status_category.map(|c| c.name).unwrap_or_default(),
                })
                .unwrap_or_default(),
            priority: fields
                .priority
                .map(|p| IssuePriority {
                    name: p.name,
                    id: p.id,
                })
                .unwrap_or_default(),
            issue_type: IssueTypeRef {
                hierarchy_level: hierarchy::known_level(&issue_type),
                name: issue_type,
            },
            project: ProjectRef {
                key: fields.project.key,
                name: fields.project.name,
                id: fields.project.id,
            },
            parent: fields.parent.map(|p| ParentRef {
                id: p.id,
                key: p.key,
                title: p.fields.map(|f| f.summary).unwrap_or_default(),
            }),
            assignee: fields.assignee.map(Person::from),
            reporter: fields.reporter.map(Person::from),
            created: fields.created,
            updated: fields.updated,
            resolution: fields.resolution.map(|r| Resolution {
                name: r.name,
                date: fields.resolutiondate,
            }),
            story_points,
            labels: fields.labels.unwrap_or_default(),
            components: fields
                .components
                .unwrap_or_default()
                .into_iter()
                .map(|c| Component {
                    id: c.id,
                    name: c.name,
                })
                .collect(),
            versions: fields
                .versions
                .unwrap_or_default()
                .into_iter()
                .map(|v| Version {
                    id: v.id,
                    name: v.name,
                    release_date: v.release_date,
                })
                .collect(),
        }
    }
}
