//! issueflow - Hierarchy graphs from issue-tracker records.
//!
//! This library provides the core functionality for the `iflow` CLI tool:
//! paging records out of the tracker, classifying them into hierarchy
//! levels, building a parent → child graph with project roots, and
//! aggregating the graph into summary statistics.
//!
//! The pipeline for one request is strictly sequential:
//!
//! ```text
//! RecordFetcher::fetch_all → build_graph → aggregate
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod tracker;

/// Library-level error type for issueflow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport or structured API failure while fetching. Fatal to the request.
    #[error("Tracker API error: {0}")]
    Upstream(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for issueflow operations.
pub type Result<T> = std::result::Result<T, Error>;
