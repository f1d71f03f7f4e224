//! Backend request layer and the context-binding manager in front of it.

mod analysis_ops;
mod config;
mod context_manager;
pub mod contracts;
mod data_ops;
mod plot_options_ops;
mod preprocessing_ops;
mod request;
mod transport;

#[cfg(feature = "http-transport")]
mod http_transport;

pub use analysis_ops::AnalysisApi;
pub use config::ClientConfig;
pub use context_manager::ContextManager;
pub use data_ops::DataApi;
pub use plot_options_ops::PlotOptionsApi;
pub use preprocessing_ops::PreprocessingApi;
pub use request::{ApiRequest, CONTEXT_FIELD, CapabilityGroup, Endpoint, HttpMethod, RequestField};
pub use transport::{RecordingTransport, ScriptedResponse, Transport, failure_message};

#[cfg(feature = "http-transport")]
pub use http_transport::HttpTransport;
