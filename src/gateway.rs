use crate::config::BackendConfig;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

/// Reasons a single backend call can fail. The conversation treats all of
/// them the same way; the variants exist for logging.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid backend url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request to backend failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed backend response: {0}")]
    Decode(String),
}

/// Answer service used by the conversation controller
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn ask(&self, query: &str) -> Result<String, GatewayError>;
}

/// Request body for `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Response body for `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

/// HTTP gateway talking to the question-answering backend
#[derive(Clone)]
pub struct HttpGateway {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GatewayError::Client)?;

        let endpoint = Self::query_endpoint(&config.base_url)?;
        Ok(Self { endpoint, client })
    }

    /// Full URL of the query endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn query_endpoint(base_url: &str) -> Result<Url, GatewayError> {
        let invalid = |reason: String| GatewayError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        // Join against a trailing-slash base so a path prefix is kept
        let mut base = base_url.trim().trim_end_matches('/').to_string();
        base.push('/');
        let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", base.scheme())));
        }
        base.join("query").map_err(|e| invalid(e.to_string()))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn ask(&self, query: &str) -> Result<String, GatewayError> {
        let payload = QueryRequest {
            query: query.to_string(),
        };

        tracing::debug!(endpoint = %self.endpoint, "sending query to backend");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(GatewayError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let body = response.text().await.map_err(GatewayError::Transport)?;
        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;

        tracing::debug!(bytes = parsed.answer.len(), "backend answered");
        Ok(parsed.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> BackendConfig {
        BackendConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn endpoint_appends_query_path() {
        let gateway = HttpGateway::new(&backend("http://localhost:8000")).unwrap();
        assert_eq!(gateway.endpoint().as_str(), "http://localhost:8000/query");
    }

    #[test]
    fn endpoint_keeps_path_prefix_and_ignores_trailing_slash() {
        let gateway = HttpGateway::new(&backend("https://example.org/api/")).unwrap();
        assert_eq!(gateway.endpoint().as_str(), "https://example.org/api/query");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = HttpGateway::new(&backend("not a url")).err().unwrap();
        assert!(matches!(err, GatewayError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = HttpGateway::new(&backend("ftp://example.org")).err().unwrap();
        assert!(matches!(err, GatewayError::InvalidBaseUrl { .. }));
    }
}
