//! Collaborator traits: Transport, Tool, ToolDyn.

use std::collections::HashMap;
use std::future::Future;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProviderError, ToolError};
use crate::types::ToolDefinition;

/// A raw provider response as seen by the wire-mapping layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lower-cased.
    pub headers: HashMap<String, String>,
    /// Decoded JSON body.
    pub body: serde_json::Value,
}

impl RawResponse {
    /// A `200 OK` response with no headers.
    #[must_use]
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
        }
    }

    /// Add a header. The name is lower-cased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by lower-case name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Sends one provider payload and resolves to its raw response.
///
/// Authentication, retries and timeouts live behind this trait. The
/// orchestration loop awaits exactly one `send` at a time.
///
/// Uses RPITIT; not object-safe. Compose with generics `<T: Transport>`.
pub trait Transport: Send + Sync {
    /// POST `payload` to `endpoint` (a path relative to the provider base URL).
    fn send(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<RawResponse, ProviderError>> + Send;
}

/// Strongly-typed tool trait. Implement this for your tools.
///
/// The blanket impl of [`ToolDyn`] handles JSON (de)serialization so the
/// implementation only sees concrete Rust types.
///
/// # Example
///
/// ```ignore
/// #[derive(serde::Deserialize, schemars::JsonSchema)]
/// struct WeatherArgs { city: String }
///
/// struct Weather;
/// impl Tool for Weather {
///     const NAME: &'static str = "weather";
///     type Args = WeatherArgs;
///     type Output = String;
///     type Error = std::io::Error;
///
///     fn definition(&self) -> ToolDefinition { todo!() }
///     fn call(&self, args: WeatherArgs)
///         -> impl Future<Output = Result<String, std::io::Error>> + Send
///     { async move { Ok(format!("sunny in {}", args.city)) } }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    const NAME: &'static str;
    /// The deserialized input type.
    type Args: DeserializeOwned + schemars::JsonSchema + Send;
    /// The serializable output type.
    type Output: Serialize;
    /// The tool-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the tool definition (name, description, schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with typed arguments.
    fn call(&self, args: Self::Args) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Type-erased tool for heterogeneous registries. Blanket-implemented for
/// every [`Tool`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;
    /// The tool definition.
    fn definition(&self) -> ToolDefinition;
    /// Execute with JSON arguments, returning a JSON result.
    fn call_dyn(&self, input: serde_json::Value) -> BoxFuture<'_, Result<serde_json::Value, ToolError>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    fn call_dyn(&self, input: serde_json::Value) -> BoxFuture<'_, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let args: T::Args =
                serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

            let output = self
                .call(args)
                .await
                .map_err(|e| ToolError::ExecutionFailed(Box::new(e)))?;

            serde_json::to_value(&output).map_err(|e| ToolError::ExecutionFailed(Box::new(e)))
        })
    }
}
