//! HTTP API server exposing the graph pipeline.
//!
//! Every response uses the same envelope:
//!
//! ```json
//! {"success": true, "data": {...}}
//! {"success": false, "error": {"message": "...", "status": 502, "code": "UPSTREAM_ERROR", "timestamp": "..."}}
//! ```
//!
//! Pipeline work is blocking and runs on tokio's blocking pool. Each request
//! builds its own tracker client from the shared configuration.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::commands::{self, QueryOptions};
use crate::config::TrackerConfig;
use crate::models::graph::Graph;
use crate::models::stats::Summary;
use crate::models::{IssueTypeSummary, ProjectSummary, SearchPage};
use crate::tracker::JiraClient;

/// Origin allowed by CORS unless `CLIENT_URL` is set.
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:3000";

/// Page size for `/api/issues/raw` when none is given.
const DEFAULT_RAW_PAGE_SIZE: usize = 50;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Validated tracker settings, read-only for the server's lifetime
    pub config: Arc<TrackerConfig>,
    /// When the server started
    pub started: Instant,
}

/// Response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error details in the envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

/// A failed request.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn body(&self) -> ApiErrorBody {
        ApiErrorBody {
            message: self.message.clone(),
            status: self.status.as_u16(),
            code: Some(self.code),
            timestamp: Utc::now(),
        }
    }
}

impl From<crate::Error> for ApiError {
    fn from(e: crate::Error) -> Self {
        let (status, code) = match &e {
            crate::Error::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            crate::Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            crate::Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        Self::new(status, code, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        } else {
            tracing::warn!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }
        let envelope: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(self.body()),
        };
        (self.status, Json(envelope)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Run a pipeline step on the blocking pool with its own client.
async fn with_client<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&JiraClient, &TrackerConfig) -> crate::Result<T> + Send + 'static,
{
    let config = Arc::clone(&state.config);
    let result = tokio::task::spawn_blocking(move || {
        let client = JiraClient::new(&config);
        f(&client, &config)
    })
    .await
    .map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            format!("Worker task failed: {}", e),
        )
    })?;

    Ok(Json(ApiResponse::ok(result?)))
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let client_url =
        std::env::var("CLIENT_URL").unwrap_or_else(|_| DEFAULT_CLIENT_URL.to_string());
    let cors = match HeaderValue::from_str(&client_url) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        Err(_) => {
            tracing::warn!(client_url = %client_url, "Invalid CLIENT_URL, CORS disabled");
            CorsLayer::new()
        }
    };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/issues", get(get_graph))
        .route("/api/stats", get(get_stats))
        .route("/api/issues/raw", get(get_raw_issues))
        .route("/api/projects", get(get_projects))
        .route("/api/issue-types", get(get_issue_types))
        .route("/api/issues/custom", post(post_custom))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and serve until the process is stopped.
pub async fn start_server(
    config: TrackerConfig,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState {
        config: Arc::new(config),
        started: Instant::now(),
    };

    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| format!("Invalid host address '{}': {}", host, e))?;
    let addr = SocketAddr::from((host_addr, port));
    tracing::info!(%addr, "Starting issueflow API server");
    eprintln!("issueflow API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct TrackerHealth {
    base_url: String,
    configured: bool,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    git_commit: &'static str,
    tracker: TrackerHealth,
    uptime_secs: u64,
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
    let version = commands::version();
    Json(ApiResponse::ok(Health {
        status: "healthy",
        timestamp: Utc::now(),
        version: version.version,
        git_commit: version.git_commit,
        tracker: TrackerHealth {
            base_url: state.config.base_url.clone(),
            configured: true,
        },
        uptime_secs: state.started.elapsed().as_secs(),
    }))
}

/// Full graph for the default filter
async fn get_graph(State(state): State<AppState>) -> ApiResult<Graph> {
    with_client(&state, |client, config| {
        commands::graph(client, config, &QueryOptions::default())
    })
    .await
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<Summary> {
    with_client(&state, |client, config| {
        commands::stats(client, config, &QueryOptions::default())
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
struct RawQuery {
    #[serde(default, alias = "startAt")]
    start_at: Option<usize>,
    #[serde(default, alias = "maxResults")]
    max_results: Option<usize>,
}

async fn get_raw_issues(
    State(state): State<AppState>,
    Query(query): Query<RawQuery>,
) -> ApiResult<SearchPage> {
    let start_at = query.start_at.unwrap_or(0);
    let max_results = query
        .max_results
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_RAW_PAGE_SIZE);
    with_client(&state, move |client, config| {
        commands::issues_page(client, config, start_at, max_results, None)
    })
    .await
}

async fn get_projects(State(state): State<AppState>) -> ApiResult<Vec<ProjectSummary>> {
    with_client(&state, |client, config| commands::projects(client, config)).await
}

async fn get_issue_types(State(state): State<AppState>) -> ApiResult<Vec<IssueTypeSummary>> {
    with_client(&state, |client, config| commands::issue_types(client, config)).await
}

/// Graph for caller-chosen projects, types or filter
async fn post_custom(
    State(state): State<AppState>,
    Json(options): Json<QueryOptions>,
) -> ApiResult<Graph> {
    with_client(&state, move |client, config| {
        commands::graph(client, config, &options)
    })
    .await
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> TrackerConfig {
        TrackerConfig {
            base_url: "https://127.0.0.1:1".to_string(),
            email: "me@example.com".to_string(),
            api_token: "token".to_string(),
            filter: Some("project = TEST".to_string()),
            timeout_secs: 2,
            ..TrackerConfig::default()
        }
    }

    /// Serve the router on an ephemeral port and return its base URL.
    async fn spawn_server() -> String {
        let state = AppState {
            config: Arc::new(unreachable_config()),
            started: Instant::now(),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// GET or POST with ureq off the async runtime, returning (status, body).
    async fn request(method: &'static str, url: String, body: Option<serde_json::Value>) -> (u16, serde_json::Value) {
        tokio::task::spawn_blocking(move || {
            let req = ureq::request(method, &url);
            let result = match body {
                Some(body) => req.send_json(body),
                None => req.call(),
            };
            let response = match result {
                Ok(response) => response,
                Err(ureq::Error::Status(_, response)) => response,
                Err(e) => panic!("request failed: {}", e),
            };
            let status = response.status();
            (status, response.into_json().unwrap())
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (crate::Error::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (
                crate::Error::Config("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (crate::Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (crate::Error::Other("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_error_envelope_shape() {
        let error = ApiError::from(crate::Error::Upstream("boom".into()));
        let envelope: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(error.body()),
        };
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["status"], 502);
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(json["error"]["message"], "Tracker API error: boom");
        assert!(json["error"]["timestamp"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_health_endpoint() {
        let base = spawn_server().await;
        let (status, body) = request("GET", format!("{}/api/health", base), None).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["tracker"]["base_url"], "https://127.0.0.1:1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_route_is_404() {
        let base = spawn_server().await;
        let (status, body) = request("GET", format!("{}/api/nope", base), None).await;

        assert_eq!(status, 404);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upstream_failure_is_502() {
        let base = spawn_server().await;
        let (status, body) = request("GET", format!("{}/api/issues", base), None).await;

        assert_eq!(status, 502);
        assert_eq!(body["success"], false);
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .starts_with("Tracker API error")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_custom_query_failure_is_502() {
        let base = spawn_server().await;
        let (status, _) = request(
            "POST",
            format!("{}/api/issues/custom", base),
            Some(serde_json::json!({"custom_filter": "project = ABC"})),
        )
        .await;
        assert_eq!(status, 502);
    }
}
