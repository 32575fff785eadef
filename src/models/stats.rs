//! Summary statistics over a hierarchy graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::graph::Graph;
use super::hierarchy::{Category, LinkType};

/// Label used for nodes without a status.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Read-only summary derived from a [`Graph`]. Computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_nodes: usize,
    pub total_links: usize,
    pub nodes_by_category: BTreeMap<Category, usize>,
    pub links_by_type: BTreeMap<LinkType, usize>,
    /// Mean of the positive size estimates; 0 when none qualify
    pub average_story_points: f64,
    pub status_distribution: BTreeMap<String, usize>,
}

/// Aggregate a graph into summary statistics.
pub fn aggregate(graph: &Graph) -> Summary {
    let mut nodes_by_category = BTreeMap::new();
    let mut status_distribution = BTreeMap::new();
    let mut points_total = 0.0;
    let mut points_count = 0usize;

    for node in &graph.nodes {
        *nodes_by_category.entry(node.category).or_insert(0) += 1;

        let status = node
            .metadata
            .status
            .clone()
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string());
        *status_distribution.entry(status).or_insert(0) += 1;

        if let Some(points) = node.metadata.story_points.filter(|p| *p > 0.0) {
            points_total += points;
            points_count += 1;
        }
    }

    let mut links_by_type = BTreeMap::new();
    for link in &graph.links {
        *links_by_type.entry(link.metadata.link_type).or_insert(0) += 1;
    }

    let average_story_points = if points_count > 0 {
        points_total / points_count as f64
    } else {
        0.0
    };

    Summary {
        total_nodes: graph.nodes.len(),
        total_links: graph.links.len(),
        nodes_by_category,
        links_by_type,
        average_story_points,
        status_distribution,
    }
}
