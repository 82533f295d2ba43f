//! The seam between the harvesting loop and the HTTP layer.
//!
//! Every remote call made by the crate is a `GET` against a path relative to the
//! configured base URL, returning a JSON document with a `results` array. The
//! [`Transport`] trait captures exactly that, so the discovery and fetch logic can
//! be driven by [`crate::OpenAqClient`] in production and by a scripted transport
//! in tests.

use crate::api::error::ApiError;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// A single `GET` request against the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Path relative to the base URL, e.g. `/sensors/42/measurements`.
    pub path: String,
    /// Query string pairs, in the order they are sent.
    pub query: Vec<(String, String)>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            timeout,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Looks up the first value sent for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A fully read response. The status is not interpreted by the transport.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

#[derive(Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Option<Vec<Value>>,
}

impl ApiResponse {
    /// Returns the response unchanged on a 2xx status, otherwise an [`ApiError::HttpStatus`].
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ApiError::HttpStatus {
                url: self.url,
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Decodes the `results` array. A missing or `null` array is an empty page.
    pub fn results(&self) -> Result<Vec<Value>, ApiError> {
        let envelope: ResultsEnvelope =
            serde_json::from_str(&self.body).map_err(|e| ApiError::JsonParse {
                url: self.url.clone(),
                source: e,
            })?;
        Ok(envelope.results.unwrap_or_default())
    }
}

pub trait Transport {
    fn get(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}
