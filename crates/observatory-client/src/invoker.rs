//! Single HTTP round trip against the API.

use crate::error::{ObservatoryError, Result};
use crate::request::{build_request, RequestSpec};
use reqwest::{Client, Request, StatusCode};

/// Marker the service embeds in a 200 response to report a failure.
pub const IN_BAND_ERROR_MARKER: &str = "error:";

/// Executes requests against one base URL with a shared HTTP client.
///
/// Every call is exactly one attempt: no retries, no polling.
#[derive(Debug, Clone)]
pub struct ApiInvoker {
    http: Client,
    base_url: String,
}

impl ApiInvoker {
    /// Create an invoker over an already configured client.
    #[must_use]
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Base URL requests are built against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build and execute `spec`, returning the raw body.
    pub async fn call(&self, spec: &RequestSpec) -> Result<String> {
        let request = build_request(&self.base_url, spec)?;
        self.execute(request).await
    }

    /// Execute a prepared request and classify the outcome.
    ///
    /// - network failure or unreadable body: [`ObservatoryError::Transport`]
    /// - 200 containing [`IN_BAND_ERROR_MARKER`]: [`ObservatoryError::Api`]
    /// - 200 otherwise: the body
    /// - any other status: [`ObservatoryError::HttpStatus`]
    pub async fn execute(&self, request: Request) -> Result<String> {
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::debug!("{} {} failed: {}", method, url, e);
            ObservatoryError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());

        if status != StatusCode::OK {
            return Err(ObservatoryError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        if body.contains(IN_BAND_ERROR_MARKER) {
            tracing::debug!("in-band error from {}: {}", url, body);
            return Err(ObservatoryError::Api { body });
        }

        Ok(body)
    }
}
