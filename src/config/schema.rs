//! KDL schema for config.kdl.
//!
//! ```kdl
//! base-url "https://example.atlassian.net"
//! email "me@example.com"
//! api-token "secret"
//! filter "project = TEST ORDER BY created DESC"
//! story-points-field "customfield_10016"
//! page-size 100
//! timeout-secs 30
//! ```

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};

/// Required permissions for config.kdl (Unix: 0600, owner read/write only).
///
/// The file may hold the API token.
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o600;

/// Values read from config.kdl. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub filter: Option<String>,
    pub story_points_field: Option<String>,
    pub page_size: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// First string argument of a node.
fn string_value(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(|s| s.to_string())
}

/// First non-negative integer argument of a node.
fn integer_value(doc: &KdlDocument, name: &str) -> Option<i128> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_integer()
        .filter(|i| *i >= 0)
}

impl FileConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            base_url: string_value(doc, "base-url"),
            email: string_value(doc, "email"),
            api_token: string_value(doc, "api-token"),
            filter: string_value(doc, "filter"),
            story_points_field: string_value(doc, "story-points-field"),
            page_size: integer_value(doc, "page-size").and_then(|i| usize::try_from(i).ok()),
            timeout_secs: integer_value(doc, "timeout-secs").and_then(|i| u64::try_from(i).ok()),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        let strings = [
            ("base-url", &self.base_url),
            ("email", &self.email),
            ("api-token", &self.api_token),
            ("filter", &self.filter),
            ("story-points-field", &self.story_points_field),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                let mut node = KdlNode::new(name);
                node.push(KdlEntry::new(KdlValue::String(value.clone())));
                doc.nodes_mut().push(node);
            }
        }

        if let Some(page_size) = self.page_size {
            let mut node = KdlNode::new("page-size");
            node.push(KdlEntry::new(KdlValue::Integer(page_size as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(timeout) = self.timeout_secs {
            let mut node = KdlNode::new("timeout-secs");
            node.push(KdlEntry::new(KdlValue::Integer(timeout as i128)));
            doc.nodes_mut().push(node);
        }

        doc
    }
}
