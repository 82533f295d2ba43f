use crate::api::error::ApiError;
use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;

pub const DEFAULT_BASE_URL: &str = "https://api.openaq.org/v3";
const API_KEY_HEADER: &str = "X-API-Key";

/// Thin reqwest-backed [`Transport`] for the OpenAQ v3 API.
///
/// The API key, when present, is attached to every request as an `X-API-Key` header.
/// Response statuses are passed through untouched; deciding what a 404 or a 5xx means
/// is left to the caller.
pub struct OpenAqClient {
    base_url: String,
    http: Client,
}

impl OpenAqClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(key).map_err(ApiError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ApiError::ClientBuild)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for OpenAqClient {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("GET {} {:?}", url, request.query);

        let response = self
            .http
            .get(&url)
            .query(&request.query)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| ApiError::NetworkRequest(url.clone(), e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::BodyRead(final_url.clone(), e))?;

        Ok(ApiResponse {
            url: final_url,
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let base_url = "https://api.openaq.org/v3/";
        let client = OpenAqClient::new(base_url, None).unwrap();
        assert_eq!(client.base_url(), "https://api.openaq.org/v3");
    }

    #[test]
    fn rejects_unprintable_api_key() {
        let err = OpenAqClient::new(DEFAULT_BASE_URL, Some("bad\nkey"))
            .err()
            .expect("newline is not a valid header value");
        assert!(matches!(err, ApiError::InvalidApiKey(_)));
    }
}
