// ABOUTME: Typed error taxonomy for agent runtime calls and stream consumption.
// ABOUTME: Only StreamInitiationError is meant to cross the accumulator boundary.

use thiserror::Error;

/// Establishing or authenticating the streaming call failed.
///
/// Carries enough detail for operators to diagnose the failure; none of it is
/// ever shown to the end user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to start agent stream: {message}")]
pub struct StreamInitiationError {
    /// Human-readable description from the underlying service or transport
    pub message: String,
    /// Service error code (e.g. "AccessDeniedException", "SpawnFailed")
    pub code: Option<String>,
    /// HTTP-like status code, if the transport exposes one
    pub status: Option<u16>,
    /// Request id assigned by the remote service
    pub request_id: Option<String>,
}

impl StreamInitiationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
            request_id: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// The stream broke after it was established.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed event: {0}")]
    Malformed(String),

    #[error("runtime exited with status {0:?}")]
    Exited(Option<i32>),
}

/// Attribution metadata on a single event could not be read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CitationParseError {
    #[error("attribution citations must be an array, got {0}")]
    NotAnArray(&'static str),

    #[error("attribution must be an object, got {0}")]
    InvalidAttribution(&'static str),
}

/// Terminal outcomes of consuming a stream that are not a reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsumeError {
    #[error("stream consumption was cancelled")]
    Cancelled,
}

/// Short label for a serde_json value's type, used in error messages
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
