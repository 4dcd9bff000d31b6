//! Error types for all stencil crates.

use std::time::Duration;

/// Errors from the transport collaborator (HTTP, auth, rate limiting).
///
/// The orchestration loop never inspects these; it propagates them as
/// [`StructuredError::Transport`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the API.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Provider service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The in-flight request was cancelled.
    #[error("cancelled")]
    Cancelled,

    // Catch-all
    /// Any other provider error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimit { .. } | Self::Timeout(_) | Self::ServiceUnavailable(_)
        )
    }
}

/// Errors from tool execution.
///
/// These never abort a structured run: the executor folds them into a
/// failed [`ToolResult`](crate::ToolResult) that goes back to the model.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Arguments did not match the tool's input type.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors that abort a structured-output run.
///
/// Every variant ends the top-level call with no response.
#[derive(Debug, thiserror::Error)]
pub enum StructuredError {
    /// The request violates a construction invariant.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The requested technique is unsupported by the model/mode combination.
    #[error("capability error: {0}")]
    Capability(String),
    /// The backend reported a finish classification the core does not recognize.
    #[error("{provider}: unknown finish reason {raw:?}")]
    UnknownFinishReason {
        /// Protocol that produced the response.
        provider: String,
        /// The raw finish code as sent by the provider.
        raw: String,
    },
    /// The final text is not a valid JSON document.
    #[error("structured output could not be decoded: {source}")]
    Decoding {
        /// The raw text that failed to parse.
        text: String,
        /// The underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The provider refused to answer.
    #[error("{provider} refusal: {}", reason.as_deref().unwrap_or("reason unknown"))]
    Refusal {
        /// Protocol that produced the refusal.
        provider: String,
        /// Refusal text, if the provider sent one.
        reason: Option<String>,
    },
    /// The provider response could not be mapped to the canonical shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Transport-level failure, propagated unmodified.
    #[error(transparent)]
    Transport(#[from] ProviderError),
}

impl StructuredError {
    /// Build a decoding error for `text`.
    #[must_use]
    pub fn decoding(text: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decoding {
            text: text.into(),
            source,
        }
    }

    /// The raw text carried by a decoding error.
    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Decoding { text, .. } => Some(text),
            _ => None,
        }
    }
}
