//! Anthropic API client struct and builder.

use std::collections::HashMap;
use std::future::Future;

use stencil_types::{ProviderError, RawResponse, Transport};

use crate::error::{map_http_status, map_reqwest_error};

/// Default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// HTTP transport for the Anthropic API.
///
/// # Example
///
/// ```no_run
/// use stencil_provider_anthropic::Anthropic;
///
/// let client = Anthropic::new("sk-ant-...")
///     .base_url("https://api.anthropic.com")
///     .version("2023-06-01");
/// ```
pub struct Anthropic {
    /// Anthropic API key (`ANTHROPIC_API_KEY`).
    pub(crate) api_key: String,
    /// API base URL (override for testing or proxies).
    pub(crate) base_url: String,
    /// Value of the `anthropic-version` header.
    pub(crate) version: String,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl Anthropic {
    /// Create a new client with the given API key and sensible defaults.
    ///
    /// Default base URL: `https://api.anthropic.com`.
    /// Default API version: `2023-06-01`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            version: ANTHROPIC_VERSION.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        std::env::var("ANTHROPIC_API_KEY")
            .map(Self::new)
            .map_err(|_| ProviderError::Authentication("ANTHROPIC_API_KEY is not set".into()))
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server or an API proxy.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the `anthropic-version` header.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

impl Transport for Anthropic {
    fn send(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<RawResponse, ProviderError>> + Send {
        let url = self.url(endpoint);
        let api_key = self.api_key.clone();
        let version = self.version.clone();
        let http_client = self.client.clone();
        let body = payload.clone();

        async move {
            tracing::debug!(url = %url, model = %body["model"], "sending messages request");

            let response = http_client
                .post(&url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", &version)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let response_text = response.text().await.map_err(map_reqwest_error)?;

            if !status.is_success() {
                let retry_after = headers.get("retry-after").map(String::as_str);
                return Err(map_http_status(status, retry_after, &response_text));
            }

            let json: serde_json::Value = serde_json::from_str(&response_text)
                .map_err(|e| ProviderError::InvalidRequest(format!("invalid JSON response: {e}")))?;

            Ok(RawResponse {
                status: status.as_u16(),
                headers,
                body: json,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_set() {
        let client = Anthropic::new("test-key");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.version, ANTHROPIC_VERSION);
    }

    #[test]
    fn builder_overrides() {
        let client = Anthropic::new("test-key")
            .base_url("http://localhost:9999")
            .version("2024-01-01");
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.version, "2024-01-01");
    }

    #[test]
    fn url_includes_path() {
        let client = Anthropic::new("test-key").base_url("http://localhost:9999");
        assert_eq!(client.url("/v1/messages"), "http://localhost:9999/v1/messages");
    }

    #[test]
    fn api_key_is_stored() {
        let client = Anthropic::new("sk-ant-test");
        assert_eq!(client.api_key, "sk-ant-test");
    }
}
