//! Server configuration, loaded from environment variables at startup.
//!
//! Genie credentials are not part of [`Config`]. Handlers read them through a
//! [`CredentialSource`] on every request, and an unconfigured server still
//! boots and answers with a configuration error.

use std::time::Duration;

use genie_types::{is_valid_id, ResultKeyError, ResultsStrategy};
use reqwest::header::HeaderValue;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use tracing::error;

use crate::error::ServerError;

/// Marker left in deployment templates for values nobody filled in.
pub const PLACEHOLDER_SENTINEL: &str = "PLACEHOLDER";

pub const WORKSPACE_URL_VAR: &str = "DATABRICKS_WORKSPACE_URL";
pub const ACCESS_TOKEN_VAR: &str = "DATABRICKS_PAT_TOKEN";
pub const SPACE_ID_VAR: &str = "GENIE_SPACE_ID";

/// Runtime configuration for genie-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; wildcard when `None`.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,

    /// Shape of the query-results route.
    pub results_strategy: ResultsStrategy,

    /// Per-request timeout for calls to the Genie API.
    pub upstream_timeout: Duration,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let results_strategy = match std::env::var("GENIE_RESULTS_STRATEGY") {
            Ok(v) => v.parse().unwrap_or_else(|_| {
                // Tracing is not initialised yet.
                eprintln!(
                    "WARN: GENIE_RESULTS_STRATEGY='{v}' is not one of \
                     'attachment-path' or 'statement-id'; falling back to 'attachment-path'"
                );
                ResultsStrategy::default()
            }),
            Err(_) => ResultsStrategy::default(),
        };

        Self {
            bind_address: env_or("GENIE_BIND", "0.0.0.0:3000"),
            log_level: env_or("GENIE_LOG", "info"),
            log_json: env_flag("GENIE_LOG_JSON", false),
            cors_allowed_origins: std::env::var("GENIE_CORS_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            enable_docs: env_flag("GENIE_ENABLE_DOCS", true),
            results_strategy,
            upstream_timeout: Duration::from_secs(parse_env("GENIE_UPSTREAM_TIMEOUT_SECS", 30)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_docs: true,
            results_strategy: ResultsStrategy::default(),
            upstream_timeout: Duration::from_secs(30),
        }
    }
}

// ── Credentials ───────────────────────────────────────────────────────────────

/// Validated Genie credentials. The token never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct GenieCredentials {
    /// Workspace base URL without a trailing slash.
    pub workspace_url: String,
    pub access_token: SecretString,
    pub space_id: String,
}

impl GenieCredentials {
    /// Validate raw values: each must be present, non-blank and must not
    /// contain [`PLACEHOLDER_SENTINEL`].
    pub fn validate(
        workspace_url: Option<String>,
        access_token: Option<String>,
        space_id: Option<String>,
    ) -> Result<Self, ServerError> {
        let (Some(workspace_url), Some(access_token), Some(space_id)) = (
            usable(workspace_url),
            usable(access_token),
            usable(space_id),
        ) else {
            return Err(ServerError::Config);
        };

        Ok(Self {
            workspace_url: workspace_url.trim_end_matches('/').to_owned(),
            access_token: SecretString::from(access_token),
            space_id,
        })
    }

    /// `{workspace}/api/2.0/genie/spaces/{space}/{segments...}`.
    ///
    /// Every segment must pass [`is_valid_id`] and is appended as exactly one
    /// percent-encoded path segment.
    pub fn space_endpoint(&self, segments: &[&str]) -> Result<Url, ServerError> {
        if !segments.iter().copied().all(is_valid_id) {
            return Err(ResultKeyError::InvalidId.into());
        }
        if !is_valid_id(&self.space_id) {
            error!("GENIE_SPACE_ID is not a valid id");
            return Err(ServerError::Config);
        }
        let mut url = Url::parse(&self.workspace_url).map_err(|e| {
            error!(error = %e, "DATABRICKS_WORKSPACE_URL is not a valid URL");
            ServerError::Config
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                error!("DATABRICKS_WORKSPACE_URL cannot be a base URL");
                ServerError::Config
            })?;
            path.pop_if_empty()
                .extend(["api", "2.0", "genie", "spaces", self.space_id.as_str()])
                .extend(segments);
        }
        Ok(url)
    }

    /// `Authorization` header value, marked sensitive.
    pub fn bearer(&self) -> Result<HeaderValue, ServerError> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", self.access_token.expose_secret()))
                .map_err(|_| {
                    error!("DATABRICKS_PAT_TOKEN is not a valid header value");
                    ServerError::Config
                })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

fn usable(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty() && !v.contains(PLACEHOLDER_SENTINEL))
}

/// Where request handlers obtain credentials from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Read the process environment on every request.
    Env,
    /// Fixed raw values (tests, embedding).
    Fixed {
        workspace_url: Option<String>,
        access_token: Option<String>,
        space_id: Option<String>,
    },
}

impl CredentialSource {
    /// Load and validate credentials. Never logs the token.
    pub fn load(&self) -> Result<GenieCredentials, ServerError> {
        match self {
            CredentialSource::Env => GenieCredentials::validate(
                std::env::var(WORKSPACE_URL_VAR).ok(),
                std::env::var(ACCESS_TOKEN_VAR).ok(),
                std::env::var(SPACE_ID_VAR).ok(),
            ),
            CredentialSource::Fixed {
                workspace_url,
                access_token,
                space_id,
            } => GenieCredentials::validate(
                workspace_url.clone(),
                access_token.clone(),
                space_id.clone(),
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.load().is_ok()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
