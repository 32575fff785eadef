//! Jira REST v3 client.
//!
//! Blocking HTTP calls through a `ureq` agent with basic auth
//! (account email + API token). One client is built per caller from a
//! [`TrackerConfig`]; nothing is shared process-wide.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::wire::{SearchResponse, WireIssueType, WireProject, WireProjectPage, error_message};
use super::{SearchRequest, TrackerApi, TrackerError};
use crate::config::TrackerConfig;

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("issueflow/", env!("CARGO_PKG_VERSION"));

/// Search endpoint path
const SEARCH_PATH: &str = "/rest/api/3/search";

/// Project catalog endpoint path
const PROJECT_SEARCH_PATH: &str = "/rest/api/3/project/search";

/// Issue type catalog endpoint path
const ISSUE_TYPE_PATH: &str = "/rest/api/3/issuetype";

/// Maximum projects requested from the catalog in one call
const PROJECT_PAGE_SIZE: usize = 100;

/// HTTP implementation of [`TrackerApi`].
#[derive(Debug, Clone)]
pub struct JiraClient {
    agent: ureq::Agent,
    base_url: String,
    auth_header: String,
}

impl JiraClient {
    /// Create a client for the configured tracker.
    pub fn new(config: &TrackerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        let credentials = STANDARD.encode(format!("{}:{}", config.email, config.api_token));

        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {}", credentials),
        }
    }

    /// Base URL requests are sent to (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}{}", self.base_url, path))
            .set("Authorization", &self.auth_header)
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT)
    }

    fn call<T: DeserializeOwned>(request: ureq::Request) -> Result<T, TrackerError> {
        match request.call() {
            Ok(resp) => resp
                .into_json::<T>()
                .map_err(|e| TrackerError::Parse(e.to_string())),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                let message = error_message(&body)
                    .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
                    .unwrap_or_else(|| format!("HTTP {}", code));
                Err(TrackerError::Api {
                    status: code,
                    message,
                })
            }
            Err(e) => Err(TrackerError::Transport(e.to_string())),
        }
    }
}

impl TrackerApi for JiraClient {
    fn search(&self, request: &SearchRequest<'_>) -> Result<SearchResponse, TrackerError> {
        let call = self
            .get(SEARCH_PATH)
            .query("jql", request.filter)
            .query("startAt", &request.offset.to_string())
            .query("maxResults", &request.page_size.to_string())
            .query("fields", &request.fields.join(","))
            .query("expand", "names");

        tracing::debug!(
            offset = request.offset,
            page_size = request.page_size,
            "Requesting search page"
        );
        Self::call(call)
    }

    fn list_projects(&self) -> Result<Vec<WireProject>, TrackerError> {
        let call = self
            .get(PROJECT_SEARCH_PATH)
            .query("maxResults", &PROJECT_PAGE_SIZE.to_string());
        let page: WireProjectPage = Self::call(call)?;
        Ok(page.values)
    }

    fn list_issue_types(&self) -> Result<Vec<WireIssueType>, TrackerError> {
        Self::call(self.get(ISSUE_TYPE_PATH))
    }
}
