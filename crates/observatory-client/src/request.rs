//! Request construction for the Observatory API.
//!
//! Building a request never touches the network: a [`RequestSpec`] plus the
//! base URL becomes a ready-to-send [`reqwest::Request`].

use crate::error::{ObservatoryError, Result};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, Request};
use std::collections::BTreeMap;
use url::Url;

/// Submission body asking for a fresh, unlisted scan.
///
/// Form-encoded although the request advertises `application/json`; this
/// is what the service has always been sent.
pub const RESCAN_BODY: &str = "hidden=true&rescan=true";

/// Description of one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Command path segment, e.g. `analyze`
    pub command: String,
    /// Literal body, only sent with POST
    pub body: Option<String>,
    /// Query parameters; encoded in key order
    pub options: BTreeMap<String, String>,
}

impl RequestSpec {
    /// Create a spec for an arbitrary method.
    #[must_use]
    pub fn new(method: Method, command: impl Into<String>) -> Self {
        Self {
            method,
            command: command.into(),
            body: None,
            options: BTreeMap::new(),
        }
    }

    /// GET `command`.
    #[must_use]
    pub fn get(command: impl Into<String>) -> Self {
        Self::new(Method::GET, command)
    }

    /// POST `command`.
    #[must_use]
    pub fn post(command: impl Into<String>) -> Self {
        Self::new(Method::POST, command)
    }

    /// Add a query parameter, replacing any previous value for `key`.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Attach a literal body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Build `base_url/command?options` with the headers and body the service expects.
///
/// POST requests carry `Content-Type` and `Accept` set to `application/json`
/// and, when present, the body with its exact length.
pub fn build_request(base_url: &str, spec: &RequestSpec) -> Result<Request> {
    let command = spec.command.trim_matches('/');
    if command.is_empty() || command.chars().any(char::is_whitespace) {
        return Err(ObservatoryError::Construction(format!(
            "invalid command '{}'",
            spec.command
        )));
    }

    let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), command);
    let mut url = Url::parse(&endpoint)
        .map_err(|e| ObservatoryError::Construction(format!("bad URL '{endpoint}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ObservatoryError::Construction(format!(
            "bad URL '{endpoint}': not a hierarchical URL"
        )));
    }

    if !spec.options.is_empty() {
        url.query_pairs_mut().extend_pairs(&spec.options);
    }
    tracing::debug!("{} {}", spec.method, url);

    let mut request = Request::new(spec.method.clone(), url);

    if spec.method == Method::POST {
        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(body) = &spec.body {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            *request.body_mut() = Some(body.clone().into());
        }
    } else if spec.body.is_some() {
        tracing::debug!("ignoring body on {} {}", spec.method, spec.command);
    }

    Ok(request)
}
