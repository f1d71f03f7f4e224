use thiserror::Error;

pub type ViewerResult<T> = Result<T, ViewerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error("trace `{label}` is not registered")]
    NotFound { label: String },

    #[error("trace `{label}` is already registered")]
    DuplicateRegistration { label: String },

    #[error("request to `{endpoint}` failed{}: {message}", status_suffix(.status))]
    RequestFailure {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("handler on channel `{channel}` failed: {message}")]
    HandlerFailure { channel: String, message: String },

    #[error("invalid response from `{endpoint}`: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("action `{action}` generation {generation} was superseded by a newer request")]
    Superseded { action: String, generation: u64 },

    #[error("invalid render index {index} for trace list of length {len}")]
    InvalidRenderIndex { index: usize, len: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl ViewerError {
    pub fn not_found(label: impl Into<String>) -> Self {
        Self::NotFound {
            label: label.into(),
        }
    }

    pub fn request_failure(
        endpoint: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::RequestFailure {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Returns `true` for failures reported by the backend request layer.
    #[must_use]
    pub fn is_request_failure(&self) -> bool {
        matches!(self, Self::RequestFailure { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" with status {code}"))
}
