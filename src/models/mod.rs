//! Data models for issueflow.
//!
//! This module defines the core data structures:
//! - `IssueRecord` - A tracker item flattened from the upstream search response
//! - `SearchPage` - One page of search results
//! - `ProjectSummary` / `IssueTypeSummary` - Catalog entries used for filter discovery
//!
//! Submodules hold the derived views:
//! - [`hierarchy`] - Category classification and link typing
//! - [`graph`] - Node/link graph built from records
//! - [`stats`] - Summary statistics over a graph

pub mod graph;
pub mod hierarchy;
pub mod stats;

use serde::{Deserialize, Serialize};

/// Workflow status of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    /// Status name (e.g., "In Progress")
    pub name: String,

    /// Status category name (e.g., "To Do", "In Progress", "Done")
    #[serde(default)]
    pub category: String,
}

/// Issue priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePriority {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

impl Default for IssuePriority {
    fn default() -> Self {
        Self {
            name: "None".to_string(),
            id: String::new(),
        }
    }
}

/// Issue type as reported by the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTypeRef {
    /// Free-text type name (e.g., "Epic", "Sub-task")
    pub name: String,

    /// Known hierarchy level, if the type name is in the level table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<u32>,
}

/// Owning project of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// Reference to a parent issue (not a full record).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub title: String,
}

/// An assignee or reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// Resolution of a closed issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Project component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

/// Fix or affected version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

/// A tracker item, immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Upstream numeric identifier
    #[serde(default)]
    pub id: String,

    /// Unique project-prefixed key (e.g., "TEST-1")
    pub key: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Rich-text description, kept as the raw upstream document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,

    #[serde(default)]
    pub status: IssueStatus,

    #[serde(default)]
    pub priority: IssuePriority,

    #[serde(default)]
    pub issue_type: IssueTypeRef,

    pub project: ProjectRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Person>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<Person>,

    /// Creation timestamp, verbatim from the tracker
    #[serde(default)]
    pub created: String,

    /// Last update timestamp, verbatim from the tracker
    #[serde(default)]
    pub updated: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// Size estimate ("story points")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub components: Vec<Component>,

    #[serde(default)]
    pub versions: Vec<Version>,
}

impl IssueRecord {
    /// Create a minimal record with the given key, type and project.
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        issue_type: impl Into<String>,
        project_key: impl Into<String>,
    ) -> Self {
        let issue_type = issue_type.into();
        let project_key = project_key.into();
        Self {
            key: key.into(),
            title: title.into(),
            issue_type: IssueTypeRef {
                hierarchy_level: hierarchy::known_level(&issue_type),
                name: issue_type,
            },
            project: ProjectRef {
                name: project_key.clone(),
                key: project_key,
                id: String::new(),
            },
            ..Default::default()
        }
    }

    /// Set the parent reference.
    pub fn with_parent(mut self, parent_key: impl Into<String>) -> Self {
        self.parent = Some(ParentRef {
            key: parent_key.into(),
            ..Default::default()
        });
        self
    }

    /// Set the size estimate.
    pub fn with_story_points(mut self, points: f64) -> Self {
        self.story_points = Some(points);
        self
    }

    /// Set the status name.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status.name = status.into();
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Index of the first record in this page
    pub offset: usize,
    /// Requested page size
    pub page_size: usize,
    /// Total matching records upstream
    pub total: usize,
    pub records: Vec<IssueRecord>,
}

/// A project listed by the tracker catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub key: String,
    pub name: String,
    pub id: String,
}

/// An issue type listed by the tracker catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTypeSummary {
    pub id: String,
    pub name: String,
    /// Level from the known table, or the not-applicable sentinel
    pub hierarchy_level: u32,
}
