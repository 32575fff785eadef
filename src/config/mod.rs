//! Configuration for issueflow.
//!
//! ## config.kdl
//!
//! Located at `~/.config/issueflow/config.kdl` (or the path given with
//! `--config` / `IFLOW_CONFIG`). A missing file is treated as empty.
//!
//! Contains:
//! - `base-url` - Tracker base URL (must be https)
//! - `email` - Account email used for basic auth
//! - `api-token` - API token used for basic auth
//! - `filter` - Filter expression; generated from the catalog when absent
//! - `story-points-field` - Custom field id holding size estimates
//! - `page-size` - Records per search page (1-1000)
//! - `timeout-secs` - Per-request timeout
//!
//! ## Precedence
//!
//! env var > config.kdl > built-in defaults
//!
//! Use the [`resolver`] module for precedence resolution and validation.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ResolvedConfig, Resolved, ValueSource, default_config_path, load_file_config, resolve_config,
    resolve_config_with,
};
pub use schema::FileConfig;
#[cfg(unix)]
pub use schema::CONFIG_FILE_MODE;

use serde::Serialize;

use crate::tracker::fetcher::DEFAULT_PAGE_SIZE;
use crate::tracker::wire::DEFAULT_STORY_POINTS_FIELD;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Validated settings needed to talk to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    /// Configured filter expression, if any
    pub filter: Option<String>,
    pub story_points_field: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            api_token: String::new(),
            filter: None,
            story_points_field: DEFAULT_STORY_POINTS_FIELD.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
