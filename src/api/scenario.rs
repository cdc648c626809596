use anyhow::{bail, Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Scenario proxy failures, each mapped to its own HTTP response
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// Data source unreachable or returned something unusable
    UpstreamUnavailable(String),
    /// Data source does not know the scenario
    InvalidScenario { name: String, available: Vec<String> },
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::UpstreamUnavailable(detail) => {
                write!(f, "upstream unavailable: {}", detail)
            }
            ProxyError::InvalidScenario { name, available } => write!(
                f,
                "unknown scenario '{}' (valid: {})",
                name,
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for ProxyError {}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<Vec<String>>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        let (status, body) = match self {
            ProxyError::UpstreamUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: "upstream unavailable",
                    detail,
                    available: None,
                },
            ),
            ProxyError::InvalidScenario { available, .. } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "invalid input",
                    detail,
                    available: Some(available),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// HTTP client for the synthetic data source's scenario control
pub struct ScenarioClient {
    http_client: Client,
    base_url: Url,
}

impl ScenarioClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("bosun/0.1")
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid scenario source URL {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Scenario source URL {} cannot carry a path", base_url);
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Base URL plus `segments`, each percent-encoded as a single segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProxyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProxyError::UpstreamUnavailable(format!("{} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET /scenario
    pub async fn list_scenarios(&self) -> Result<Value, ProxyError> {
        let url = self.endpoint(&["scenario"])?;
        let resp = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(upstream_unavailable)?;

        if !resp.status().is_success() {
            return Err(ProxyError::UpstreamUnavailable(format!(
                "scenario list returned {}",
                resp.status()
            )));
        }

        resp.json::<Value>().await.map_err(upstream_unavailable)
    }

    /// Valid names from the scenario list, empty when the source is down
    async fn available_names(&self) -> Vec<String> {
        self.list_scenarios()
            .await
            .map(|list| scenario_names(&list["available"]))
            .unwrap_or_default()
    }

    /// POST /scenario/{name}
    ///
    /// Names that are not a single plain path segment never reach the
    /// source.
    pub async fn switch_scenario(&self, name: &str) -> Result<Value, ProxyError> {
        if !is_valid_scenario_name(name) {
            warn!(scenario = %name, "Rejected malformed scenario name");
            return Err(ProxyError::InvalidScenario {
                name: name.to_string(),
                available: self.available_names().await,
            });
        }

        let url = self.endpoint(&["scenario", name])?;
        let resp = self
            .http_client
            .post(url)
            .send()
            .await
            .map_err(upstream_unavailable)?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body: Value = resp.json().await.map_err(upstream_unavailable)?;
            return Err(ProxyError::InvalidScenario {
                name: name.to_string(),
                available: scenario_names(&body["available"]),
            });
        }

        if !status.is_success() {
            return Err(ProxyError::UpstreamUnavailable(format!(
                "scenario switch returned {}",
                status
            )));
        }

        resp.json::<Value>().await.map_err(upstream_unavailable)
    }
}

/// Scenario names: letters, digits, `-` and `_`
fn is_valid_scenario_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Names from an `available` field, either a list or a name → description map
fn scenario_names(available: &Value) -> Vec<String> {
    match available {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn upstream_unavailable(err: reqwest::Error) -> ProxyError {
    warn!(error = %err, "Scenario source not reachable");
    ProxyError::UpstreamUnavailable(err.to_string())
}
