//! Hierarchy classification for issue types and graph links.
//!
//! Issue types are free text on the tracker side ("Epic", "User Story",
//! "Sub-task", ...). This module reduces them to a fixed set of hierarchy
//! categories and labels the link between two adjacent categories.
//!
//! Both mappings are ordered rule tables terminating in a default, so the
//! tie-break order is explicit:
//!
//! ```
//! use issueflow::models::hierarchy::{Category, LinkType, classify, resolve_link_type};
//!
//! assert_eq!(classify("Epic"), Category::Epic);
//! assert_eq!(classify("Sub-task"), Category::Story);
//! assert_eq!(
//!     resolve_link_type(Category::Project, Category::Feature),
//!     LinkType::ProjectToFeature
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hierarchy level assigned to a graph node.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Project,
    Feature,
    Epic,
    /// Catch-all for tasks, bugs, sub-tasks and unrecognized types
    #[default]
    Story,
}

impl Category {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Project => "project",
            Category::Feature => "feature",
            Category::Epic => "epic",
            Category::Story => "story",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Category::Project),
            "feature" => Ok(Category::Feature),
            "epic" => Ok(Category::Epic),
            "story" => Ok(Category::Story),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

/// Semantic label on a graph link.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    ProjectToFeature,
    FeatureToEpic,
    /// Default for every pairing not matched by a more specific rule
    #[default]
    EpicToStory,
}

impl LinkType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::ProjectToFeature => "project_to_feature",
            LinkType::FeatureToEpic => "feature_to_epic",
            LinkType::EpicToStory => "epic_to_story",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Substring rules checked in order against the lowercased type name.
/// The first match wins; no match falls through to [`Category::Story`].
pub const CATEGORY_RULES: &[(&str, Category)] = &[
    ("project", Category::Project),
    ("feature", Category::Feature),
    ("epic", Category::Epic),
];

/// Exact (source, target) rules; anything else is [`LinkType::EpicToStory`].
pub const LINK_RULES: &[((Category, Category), LinkType)] = &[
    (
        (Category::Project, Category::Feature),
        LinkType::ProjectToFeature,
    ),
    ((Category::Feature, Category::Epic), LinkType::FeatureToEpic),
];

/// Map an issue-type name to its hierarchy category.
///
/// Matching is a case-insensitive substring test, so "Portfolio Epic"
/// classifies as [`Category::Epic`]. Every input yields a category.
pub fn classify(type_name: &str) -> Category {
    let lowered = type_name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or_default()
}

/// Determine the link label between a source and target category.
///
/// The label is a hint, not a taxonomy: `(Project, Epic)` and
/// `(Story, Story)` both come back as [`LinkType::EpicToStory`].
pub fn resolve_link_type(source: Category, target: Category) -> LinkType {
    LINK_RULES
        .iter()
        .find(|(pair, _)| *pair == (source, target))
        .map(|(_, link_type)| *link_type)
        .unwrap_or_default()
}

/// Sentinel level for issue types outside the known hierarchy.
pub const NOT_APPLICABLE_LEVEL: u32 = 999;

/// Types at or above this level are left out of generated filters.
pub const FILTER_LEVEL_CUTOFF: u32 = 900;

/// Known issue-type names and their depth in the hierarchy (0 = top).
const ISSUE_TYPE_LEVELS: &[(&str, u32)] = &[
    ("Project", 0),
    ("Feature", 1),
    ("Epic", 2),
    ("Story", 3),
    ("Task", 3),
    ("Bug", 3),
    ("Sub-task", 4),
];

/// Look up the hierarchy level of an exact issue-type name.
pub fn known_level(type_name: &str) -> Option<u32> {
    ISSUE_TYPE_LEVELS
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, level)| *level)
}

/// Hierarchy level of an issue type, or [`NOT_APPLICABLE_LEVEL`] if unknown.
pub fn hierarchy_level(type_name: &str) -> u32 {
    known_level(type_name).unwrap_or(NOT_APPLICABLE_LEVEL)
}
