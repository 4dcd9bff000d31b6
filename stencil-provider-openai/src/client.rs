//! OpenAI HTTP transport.

use std::collections::HashMap;
use std::future::Future;

use stencil_types::{ProviderError, RawResponse, Transport};

use crate::error::{map_http_status, map_reqwest_error};

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// HTTP transport for the OpenAI API.
///
/// Holds credentials and the base URL; the request shape comes from
/// [`OpenAiProtocol`](crate::OpenAiProtocol).
///
/// # Example
///
/// ```no_run
/// use stencil_provider_openai::OpenAi;
///
/// let client = OpenAi::new("sk-...")
///     .organization("org-123")
///     .base_url("https://api.openai.com");
/// ```
pub struct OpenAi {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) organization: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) client: reqwest::Client,
}

impl OpenAi {
    /// Create a new client with the given API key.
    ///
    /// Default base URL: `https://api.openai.com`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            organization: None,
            project: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from the `OPENAI_API_KEY` environment variable.
    ///
    /// `OPENAI_ORG_ID` and `OPENAI_PROJECT_ID` are picked up when set.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::Authentication("OPENAI_API_KEY is not set".into()))?;
        let mut client = Self::new(api_key);
        client.organization = std::env::var("OPENAI_ORG_ID").ok();
        client.project = std::env::var("OPENAI_PROJECT_ID").ok();
        Ok(client)
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server or an API proxy.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Send the `OpenAI-Organization` header.
    #[must_use]
    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Send the `OpenAI-Project` header.
    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

impl Transport for OpenAi {
    fn send(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<RawResponse, ProviderError>> + Send {
        let url = self.url(endpoint);
        let api_key = self.api_key.clone();
        let organization = self.organization.clone();
        let project = self.project.clone();
        let http_client = self.client.clone();
        let body = payload.clone();

        async move {
            tracing::debug!(url = %url, model = %body["model"], "sending responses request");

            let mut builder = http_client
                .post(&url)
                .header("authorization", format!("Bearer {api_key}"))
                .header("content-type", "application/json");
            if let Some(org) = &organization {
                builder = builder.header("openai-organization", org);
            }
            if let Some(project) = &project {
                builder = builder.header("openai-project", project);
            }

            let response = builder.json(&body).send().await.map_err(map_reqwest_error)?;

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
