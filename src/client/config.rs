use serde::{Deserialize, Serialize};

use crate::core::ContextId;
use crate::error::{ViewerError, ViewerResult};

/// Bootstrap configuration for the viewer client.
///
/// Serializable so hosts can ship it next to the page instead of wiring each
/// value by hand. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub default_context: ContextId,
    /// Render positions reserved ahead of registry-managed time series.
    #[serde(default = "default_timeseries_background_traces")]
    pub timeseries_background_traces: usize,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            default_context: ContextId::main(),
            timeseries_background_traces: default_timeseries_background_traces(),
            log_filter: default_log_filter(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default_context(mut self, context: impl Into<ContextId>) -> Self {
        self.default_context = context.into();
        self
    }

    #[must_use]
    pub fn with_timeseries_background_traces(mut self, count: usize) -> Self {
        self.timeseries_background_traces = count;
        self
    }

    pub fn validate(&self) -> ViewerResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ViewerError::InvalidConfig(format!(
                "base url must start with http:// or https://, got `{}`",
                self.base_url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ViewerError::InvalidConfig(
                "request timeout must be > 0 ms".to_owned(),
            ));
        }
        if self.default_context.as_str().is_empty() {
            return Err(ViewerError::InvalidConfig(
                "default context must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(input: &str) -> ViewerResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ViewerError::InvalidConfig(format!("failed to parse config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> ViewerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ViewerError::InvalidConfig(format!("failed to serialize config json: {e}"))
        })
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_owned()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_timeseries_background_traces() -> usize {
    0
}

fn default_log_filter() -> String {
    "info".to_owned()
}
