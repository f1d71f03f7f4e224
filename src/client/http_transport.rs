use std::time::Duration;

use serde_json::Value;
use tracing::trace;

use crate::error::{ViewerError, ViewerResult};

use super::ClientConfig;
use super::request::{ApiRequest, HttpMethod};
use super::transport::{Transport, failure_message};

/// Blocking HTTP transport against the analysis/data backend.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ViewerResult<Self> {
        config.validate()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ViewerError::InvalidConfig(format!("http client error: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> ViewerResult<Value> {
        let path = request.endpoint.path();
        let url = format!("{}{path}", self.base_url);
        let fields = request.encoded_fields();
        let builder = match request.method() {
            HttpMethod::Get => self.client.get(&url).query(&fields),
            HttpMethod::Post => self.client.post(&url).form(&fields),
        };

        let response = builder
            .send()
            .map_err(|e| ViewerError::request_failure(path, None, format!("transport error: {e}")))?;
        let status = response.status();
        let body = response.text().map_err(|e| {
            ViewerError::request_failure(
                path,
                Some(status.as_u16()),
                format!("failed to read response body: {e}"),
            )
        })?;
        trace!(endpoint = path, status = status.as_u16(), bytes = body.len(), "http response");

        if !status.is_success() {
            return Err(ViewerError::request_failure(
                path,
                Some(status.as_u16()),
                failure_message(Some(status.as_u16()), &body),
            ));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ViewerError::InvalidResponse {
            endpoint: path.to_owned(),
            message: format!("response is not json: {e}"),
        })
    }
}
