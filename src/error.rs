//! Error types for tool calls and the upstream API.

use thiserror::Error;

/// Errors surfaced to the caller of a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No bearer token configured
    #[error("API_TOKEN environment variable is required")]
    Configuration,

    /// Required argument missing or malformed; no request was sent
    #[error("{0}")]
    Argument(String),

    /// The remote API call failed
    #[error("Handwriting OCR API error: {0}")]
    Upstream(#[from] ApiError),

    /// Tool name not registered with the dispatcher
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("failed to encode tool result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ToolError {
    pub fn argument(message: impl Into<String>) -> Self {
        ToolError::Argument(message.into())
    }
}

/// Failures talking to the Handwriting OCR API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or body read failure
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with the remote error text
    #[error("request failed with status {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configured base URL cannot carry a document path
    #[error("invalid API base URL {0}")]
    InvalidUrl(String),
}
