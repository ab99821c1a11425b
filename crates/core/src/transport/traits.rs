use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Abstraction over the HTTP client used to reach the provider.
///
/// Implementations report transport-level failures (DNS, refused connection,
/// timeout) as `CoreError::NetworkUnavailable`. Every HTTP status, 401 and
/// 5xx included, is a successful `ApiResponse`: interpreting it is the
/// caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// An outbound call relative to the provider base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative path, e.g. `/transactions/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    bearer: Option<String>,
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("headers", &self.headers.len())
            .field("authenticated", &self.bearer.is_some())
            .finish()
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    /// Attach a JSON body.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, CoreError> {
        let value = serde_json::to_value(body)
            .map_err(|e| CoreError::Serialization(format!("Failed to encode request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Bearer credential to send, if any. Set only by the session manager.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub(crate) fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    /// `true` if the caller tried to supply its own Authorization header.
    #[must_use]
    pub fn has_authorization_header(&self) -> bool {
        self.headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
    }
}

/// Status and raw body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Convenience constructor for JSON bodies.
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The sole trigger for credential renewal.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Decode the body, reporting shape mismatches as `MalformedResponse`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            CoreError::MalformedResponse(format!("status {}: {e}", self.status))
        })
    }

    /// Human-readable message from an error payload.
    ///
    /// Understands `{"error": ..}`, `{"message": ..}`, `{"detail": ..}` and
    /// field-error maps such as `{"amount": ["Ensure this value is ..."]}`.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(&self.body) {
            if let Some(msg) = body.error.or(body.message).or(body.detail) {
                return msg;
            }
        }

        if let Ok(serde_json::Value::Object(fields)) =
            serde_json::from_slice::<serde_json::Value>(&self.body)
        {
            let parts: Vec<String> = fields
                .iter()
                .filter_map(|(field, value)| {
                    let text = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Array(items) => items
                            .iter()
                            .filter_map(|i| i.as_str())
                            .collect::<Vec<_>>()
                            .join(" "),
                        _ => return None,
                    };
                    if text.is_empty() {
                        None
                    } else if field == "non_field_errors" {
                        Some(text)
                    } else {
                        Some(format!("{field}: {text}"))
                    }
                })
                .collect();
            if !parts.is_empty() {
                return parts.join("; ");
            }
        }

        format!("request failed with status {}", self.status)
    }
}
