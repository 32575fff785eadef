//! Upstream issue-tracker access.
//!
//! This module provides:
//! - [`TrackerApi`] - the seam to the tracker: paged search plus catalog listing
//! - [`client::JiraClient`] - HTTP implementation against the Jira REST v3 API
//! - [`wire`] - raw response shapes and their translation into [`crate::models::IssueRecord`]
//! - [`fetcher::RecordFetcher`] - paging, filter generation and discovery on top of a `TrackerApi`

pub mod client;
pub mod fetcher;
pub mod wire;

pub use client::JiraClient;
pub use fetcher::{FALLBACK_FILTER, FilterSource, GeneratedFilter, RecordFetcher};

use thiserror::Error;

/// Errors raised by a [`TrackerApi`] implementation.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker answered with an error status; `message` is the first
    /// message of its structured error payload when one was present.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("{0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Failed to parse tracker response: {0}")]
    Parse(String),
}

/// Parameters of one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    /// Filter expression (JQL)
    pub filter: &'a str,
    /// Index of the first record to return
    pub offset: usize,
    /// Maximum records to return
    pub page_size: usize,
    /// Fields to include in each record
    pub fields: &'a [String],
}

/// Capabilities the record fetcher needs from the tracker.
pub trait TrackerApi {
    /// Run one page of a search.
    fn search(&self, request: &SearchRequest<'_>) -> Result<wire::SearchResponse, TrackerError>;

    /// List projects visible to the caller.
    fn list_projects(&self) -> Result<Vec<wire::WireProject>, TrackerError>;

    /// List issue types defined on the tracker.
    fn list_issue_types(&self) -> Result<Vec<wire::WireIssueType>, TrackerError>;
}
