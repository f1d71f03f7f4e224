use std::cell::RefCell;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::ContextId;
use crate::error::{ViewerError, ViewerResult};

use super::request::{ApiRequest, Endpoint};
use super::transport::Transport;
use super::{AnalysisApi, ClientConfig, DataApi, PlotOptionsApi, PreprocessingApi};

/// Binds every backend call to the session that is current when the call is made.
///
/// One instance is constructed per client and handed to coordinators as
/// `Rc<ContextManager>`. Capability group accessors (`data()`, `analysis()`, ...)
/// capture the current context at the moment they are called; the `*_in`
/// variants take the context explicitly.
pub struct ContextManager {
    context: RefCell<ContextId>,
    transport: Box<dyn Transport>,
}

impl ContextManager {
    #[must_use]
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_context(transport, ContextId::main())
    }

    #[must_use]
    pub fn with_context(transport: impl Transport + 'static, context: ContextId) -> Self {
        Self {
            context: RefCell::new(context),
            transport: Box::new(transport),
        }
    }

    #[must_use]
    pub fn from_config(transport: impl Transport + 'static, config: &ClientConfig) -> Self {
        Self::with_context(transport, config.default_context.clone())
    }

    /// Replaces the current context. Calls already dispatched keep the
    /// context they were issued with.
    pub fn set_context(&self, context: impl Into<ContextId>) {
        let context = context.into();
        let previous = self.context.replace(context.clone());
        debug!(from = %previous, to = %context, "switched context");
    }

    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context.borrow().clone()
    }

    #[must_use]
    pub fn data(&self) -> DataApi<'_> {
        DataApi::new(self.bind(self.context()))
    }

    #[must_use]
    pub fn data_in(&self, context: &ContextId) -> DataApi<'_> {
        DataApi::new(self.bind(context.clone()))
    }

    #[must_use]
    pub fn plot_options(&self) -> PlotOptionsApi<'_> {
        PlotOptionsApi::new(self.bind(self.context()))
    }

    #[must_use]
    pub fn plot_options_in(&self, context: &ContextId) -> PlotOptionsApi<'_> {
        PlotOptionsApi::new(self.bind(context.clone()))
    }

    #[must_use]
    pub fn analysis(&self) -> AnalysisApi<'_> {
        AnalysisApi::new(self.bind(self.context()))
    }

    #[must_use]
    pub fn analysis_in(&self, context: &ContextId) -> AnalysisApi<'_> {
        AnalysisApi::new(self.bind(context.clone()))
    }

    #[must_use]
    pub fn preprocessing(&self) -> PreprocessingApi<'_> {
        PreprocessingApi::new(self.bind(self.context()))
    }

    #[must_use]
    pub fn preprocessing_in(&self, context: &ContextId) -> PreprocessingApi<'_> {
        PreprocessingApi::new(self.bind(context.clone()))
    }

    /// Sends one request through the shared dispatch path. No retry, no cache.
    pub fn dispatch(&self, request: &ApiRequest) -> ViewerResult<Value> {
        debug!(
            endpoint = request.endpoint.path(),
            method = ?request.method(),
            context = %request.context,
            "dispatching request"
        );
        self.transport.send(request).inspect_err(|err| {
            warn!(
                endpoint = request.endpoint.path(),
                context = %request.context,
                error = %err,
                "request failed"
            );
        })
    }

    /// Dispatches and decodes the response body into `T`.
    pub fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> ViewerResult<T> {
        let body = self.dispatch(request)?;
        decode_response(request.endpoint, body)
    }

    fn bind(&self, context: ContextId) -> Binding<'_> {
        Binding {
            manager: self,
            context,
        }
    }
}

/// A manager reference paired with the context captured for one group handle.
#[derive(Clone)]
pub(crate) struct Binding<'a> {
    manager: &'a ContextManager,
    context: ContextId,
}

impl Binding<'_> {
    pub(crate) fn context(&self) -> &ContextId {
        &self.context
    }

    pub(crate) fn request(&self, endpoint: Endpoint) -> ApiRequest {
        ApiRequest::new(endpoint, self.context.clone())
    }

    pub(crate) fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> ViewerResult<T> {
        self.manager.call(request)
    }

    /// Dispatches a request whose response body carries nothing of interest.
    pub(crate) fn send(&self, request: &ApiRequest) -> ViewerResult<()> {
        self.manager.dispatch(request).map(|_| ())
    }
}

pub(crate) fn decode_response<T: DeserializeOwned>(
    endpoint: Endpoint,
    body: Value,
) -> ViewerResult<T> {
    serde_json::from_value(body).map_err(|e| ViewerError::InvalidResponse {
        endpoint: endpoint.path().to_owned(),
        message: e.to_string(),
    })
}
