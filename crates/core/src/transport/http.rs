use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use super::traits::{ApiRequest, ApiResponse, Method, Transport};
use crate::errors::CoreError;

/// `reqwest`-backed transport talking JSON to the provider.
///
/// The request path is appended to the base URL verbatim, so a base such as
/// `http://host/api` keeps its `/api` prefix.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        Url::parse(base_url)
            .map_err(|e| CoreError::Config(format!("invalid base_url '{base_url}': {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a relative request path.
    pub fn endpoint(&self, path: &str) -> Result<Url, CoreError> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| CoreError::InvalidRequest(format!("invalid path '{path}': {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, CoreError> {
        let url = self.endpoint(&request.path)?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = request.bearer() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "provider call completed"
        );

        Ok(ApiResponse { status, body })
    }
}
