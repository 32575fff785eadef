//! Hierarchy graph built from a flat list of issue records.
//!
//! Nodes are issues plus one synthetic node per project; links run
//! parent → child. Issues without a parent are hung off their project node
//! so that every non-root node has inbound connectivity.
//!
//! The graph is built fresh from a record set and never mutated afterwards.
//! Parent cycles in the upstream data are encoded faithfully, not rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::IssueRecord;
use super::hierarchy::{Category, LinkType, classify, resolve_link_type};

/// Presentation-relevant subset of the source record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// A node in the hierarchy graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Issue key or project key (unique across the graph)
    pub id: String,
    /// Display name
    pub name: String,
    pub category: Category,
    /// Size estimate (default 1 for issues, 0 for projects)
    pub value: f64,
    pub metadata: NodeMetadata,
}

impl GraphNode {
    /// Create a node for an issue record.
    pub fn from_record(record: &IssueRecord) -> Self {
        let value = match record.story_points {
            Some(points) if points > 0.0 => points,
            _ => 1.0,
        };

        Self {
            id: record.key.clone(),
            name: record.title.clone(),
            category: classify(&record.issue_type.name),
            value,
            metadata: NodeMetadata {
                issue_key: Some(record.key.clone()),
                status: Some(record.status.name.clone()).filter(|s| !s.is_empty()),
                priority: Some(record.priority.name.clone()).filter(|p| !p.is_empty()),
                assignee: record.assignee.as_ref().map(|a| a.display_name.clone()),
                story_points: record.story_points,
                created: Some(record.created.clone()).filter(|c| !c.is_empty()),
                updated: Some(record.updated.clone()).filter(|u| !u.is_empty()),
            },
        }
    }

    /// Create the synthetic node for a project.
    pub fn project(key: &str, name: &str) -> Self {
        Self {
            id: key.to_string(),
            name: name.to_string(),
            category: Category::Project,
            value: 0.0,
            metadata: NodeMetadata {
                issue_key: Some(key.to_string()),
                ..Default::default()
            },
        }
    }
}

/// Traceability data for a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub link_type: LinkType,
    pub source_key: String,
    pub target_key: String,
}

/// A directed parent → child edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    /// Copied from the target node's value, never below 1
    pub value: f64,
    pub metadata: LinkMetadata,
}

impl GraphLink {
    /// Create a link from `source` to `target` carrying the target's value.
    pub fn new(source: &str, target: &GraphNode, link_type: LinkType) -> Self {
        let value = if target.value > 0.0 { target.value } else { 1.0 };
        Self {
            source: source.to_string(),
            target: target.id.clone(),
            value,
            metadata: LinkMetadata {
                link_type,
                source_key: source.to_string(),
                target_key: target.id.clone(),
            },
        }
    }
}

/// Build-time information about a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Number of records processed (duplicates included)
    pub total_issues: usize,
    /// Number of distinct project keys
    pub project_count: usize,
    /// When the graph was built
    pub last_updated: DateTime<Utc>,
    /// Filter expression that selected the records
    pub filter: String,
}

/// Nodes, links and metadata derived from one record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub metadata: GraphMetadata,
}

impl Graph {
    /// Find a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Links whose source or target is missing from the node set.
    ///
    /// Always empty for graphs produced by [`build_graph`].
    pub fn dangling_links(&self) -> Vec<&GraphLink> {
        self.links
            .iter()
            .filter(|l| self.node(&l.source).is_none() || self.node(&l.target).is_none())
            .collect()
    }
}

/// Insertion-ordered node map with last-write-wins replacement.
#[derive(Debug, Default)]
struct NodeTable {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
}

impl NodeTable {
    /// Insert a node, replacing any existing node with the same id in place.
    fn upsert(&mut self, node: GraphNode) {
        match self.index.entry(node.id.clone()) {
            Entry::Occupied(slot) => self.nodes[*slot.get()] = node,
            Entry::Vacant(slot) => {
                slot.insert(self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    fn get(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn into_nodes(self) -> Vec<GraphNode> {
        self.nodes
    }
}

/// Build the hierarchy graph for a record set, stamped with the current time.
pub fn build_graph(records: &[IssueRecord], filter: impl Into<String>) -> Graph {
    build_graph_at(records, filter, Utc::now())
}

/// Build the hierarchy graph with an explicit freshness timestamp.
///
/// Node count is `distinct issue keys + distinct project keys`; link count is
/// `records with a resolvable parent + parentless non-project records`.
pub fn build_graph_at(
    records: &[IssueRecord],
    filter: impl Into<String>,
    built_at: DateTime<Utc>,
) -> Graph {
    let mut table = NodeTable::default();
    let mut links = Vec::new();

    for record in records {
        table.upsert(GraphNode::from_record(record));
    }

    for record in records {
        let Some(parent) = &record.parent else {
            continue;
        };
        if let (Some(parent_node), Some(child_node)) =
            (table.get(&parent.key), table.get(&record.key))
        {
            let link_type = resolve_link_type(parent_node.category, child_node.category);
            links.push(GraphLink::new(&parent.key, child_node, link_type));
        }
    }

    let mut projects = NodeTable::default();
    for record in records {
        if projects.get(&record.project.key).is_none() {
            projects.upsert(GraphNode::project(&record.project.key, &record.project.name));
        }
    }

    // Orphans hang off their project; the label is always project_to_feature.
    for record in records {
        if record.parent.is_some() {
            continue;
        }
        let Some(node) = table.get(&record.key) else {
            continue;
        };
        if node.category != Category::Project && projects.get(&record.project.key).is_some() {
            links.push(GraphLink::new(
                &record.project.key,
                node,
                LinkType::ProjectToFeature,
            ));
        }
    }

    let project_count = projects.nodes.len();
    for project in projects.into_nodes() {
        table.upsert(project);
    }

    let graph = Graph {
        nodes: table.into_nodes(),
        links,
        metadata: GraphMetadata {
            total_issues: records.len(),
            project_count,
            last_updated: built_at,
            filter: filter.into(),
        },
    };

    tracing::debug!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        projects = project_count,
        "Built hierarchy graph"
    );

    graph
}
