//! Precedence resolution and validation for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables (`JIRA_BASE_URL`, `JIRA_EMAIL`, `JIRA_API_TOKEN`,
//!    `JQL_FILTER`, `IFLOW_STORY_POINTS_FIELD`, `IFLOW_PAGE_SIZE`,
//!    `IFLOW_TIMEOUT_SECS`)
//! 2. config.kdl
//! 3. Built-in defaults
//!
//! Empty environment variables count as unset.

use kdl::KdlDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::schema::FileConfig;
use super::{DEFAULT_TIMEOUT_SECS, TrackerConfig};
use crate::tracker::fetcher::DEFAULT_PAGE_SIZE;
use crate::tracker::wire::DEFAULT_STORY_POINTS_FIELD;
use crate::{Error, Result};

pub const BASE_URL_ENV: &str = "JIRA_BASE_URL";
pub const EMAIL_ENV: &str = "JIRA_EMAIL";
pub const API_TOKEN_ENV: &str = "JIRA_API_TOKEN";
pub const FILTER_ENV: &str = "JQL_FILTER";
pub const STORY_POINTS_FIELD_ENV: &str = "IFLOW_STORY_POINTS_FIELD";
pub const PAGE_SIZE_ENV: &str = "IFLOW_PAGE_SIZE";
pub const TIMEOUT_ENV: &str = "IFLOW_TIMEOUT_SECS";

/// Largest page size the search endpoint accepts.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    File,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File => write!(f, "file"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Configuration with source tracking, before validation.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: Option<Resolved<String>>,
    pub email: Option<Resolved<String>>,
    pub api_token: Option<Resolved<String>>,
    pub filter: Option<Resolved<String>>,
    pub story_points_field: Resolved<String>,
    pub page_size: Resolved<usize>,
    pub timeout_secs: Resolved<u64>,
    /// Config file that was consulted, if any
    pub config_path: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Get the masked API token for display purposes.
    ///
    /// Shows only the first 4 and last 4 characters.
    pub fn masked_token(&self) -> Option<String> {
        self.api_token.as_ref().map(|r| {
            let token: Vec<char> = r.value.chars().collect();
            if token.len() <= 12 {
                let head: String = token.iter().take(4).collect();
                format!("{}...", head)
            } else {
                let head: String = token[..4].iter().collect();
                let tail: String = token[token.len() - 4..].iter().collect();
                format!("{}...{}", head, tail)
            }
        })
    }

    /// Check required values and their format.
    pub fn validate(&self) -> Result<TrackerConfig> {
        let missing: Vec<&str> = [
            ("base-url", self.base_url.is_none()),
            ("email", self.email.is_none()),
            ("api-token", self.api_token.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required configuration: {} (set {}, {}, {} or add them to config.kdl)",
                missing.join(", "),
                BASE_URL_ENV,
                EMAIL_ENV,
                API_TOKEN_ENV
            )));
        }

        let base_url = value_of(&self.base_url);
        let email = value_of(&self.email);
        let api_token = value_of(&self.api_token);

        if !base_url.starts_with("https://") {
            return Err(Error::Config("base-url must start with https://".to_string()));
        }
        if !email.contains('@') {
            return Err(Error::Config(
                "email must be a valid email address".to_string(),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size.value) {
            return Err(Error::Config(format!(
                "page-size must be 1-{}, got {}",
                MAX_PAGE_SIZE, self.page_size.value
            )));
        }

        if self.timeout_secs.value == 0 {
            return Err(Error::Config(
                "timeout-secs must be at least 1".to_string(),
            ));
        }

        Ok(TrackerConfig {
            base_url,
            email,
            api_token,
            filter: self.filter.as_ref().map(|r| r.value.clone()),
            story_points_field: self.story_points_field.value.clone(),
            page_size: self.page_size.value,
            timeout_secs: self.timeout_secs.value,
        })
    }
}

fn value_of(resolved: &Option<Resolved<String>>) -> String {
    resolved
        .as_ref()
        .map(|r| r.value.clone())
        .unwrap_or_default()
}

/// Get the default config path (~/.config/issueflow/config.kdl).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("issueflow").join("config.kdl"))
}

/// Load config.kdl. Returns an empty config if the file doesn't exist.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;

    Ok(FileConfig::from_kdl(&doc))
}

/// Resolve configuration from the process environment and config.kdl.
///
/// `path` overrides the default config location.
pub fn resolve_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = path.map(Path::to_path_buf).or_else(default_config_path);
    let file = match &config_path {
        Some(p) => load_file_config(p)?,
        None => FileConfig::new(),
    };

    let mut resolved = resolve_config_with(&file, |name| std::env::var(name).ok())?;
    resolved.config_path = config_path;
    Ok(resolved)
}

/// Resolve configuration from a file config and an environment lookup.
pub fn resolve_config_with<F>(file: &FileConfig, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let string_setting = |env_name: &str, file_value: &Option<String>| {
        lookup(env_name)
            .map(|v| Resolved::new(v, ValueSource::EnvVar(env_name.to_string())))
            .or_else(|| {
                file_value
                    .clone()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| Resolved::new(v, ValueSource::File))
            })
    };

    let story_points_field = string_setting(STORY_POINTS_FIELD_ENV, &file.story_points_field)
        .unwrap_or_else(|| {
            Resolved::new(
                DEFAULT_STORY_POINTS_FIELD.to_string(),
                ValueSource::Default,
            )
        });

    let page_size = numeric_setting(&lookup, PAGE_SIZE_ENV, file.page_size, DEFAULT_PAGE_SIZE)?;
    let timeout_secs =
        numeric_setting(&lookup, TIMEOUT_ENV, file.timeout_secs, DEFAULT_TIMEOUT_SECS)?;

    Ok(ResolvedConfig {
        base_url: string_setting(BASE_URL_ENV, &file.base_url),
        email: string_setting(EMAIL_ENV, &file.email),
        api_token: string_setting(API_TOKEN_ENV, &file.api_token),
        filter: string_setting(FILTER_ENV, &file.filter),
        story_points_field,
        page_size,
        timeout_secs,
        config_path: None,
    })
}

fn numeric_setting<T, F>(
    lookup: &F,
    env_name: &str,
    file_value: Option<T>,
    default: T,
) -> Result<Resolved<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(env_name) {
        let value = raw.trim().parse::<T>().map_err(|_| {
            Error::Config(format!(
                "{} must be a non-negative integer, got '{}'",
                env_name, raw
            ))
        })?;
        return Ok(Resolved::new(value, ValueSource::EnvVar(env_name.to_string())));
    }
    Ok(match file_value {
        Some(value) => Resolved::new(value, ValueSource::File),
        None => Resolved::new(default, ValueSource::Default),
    })
}
