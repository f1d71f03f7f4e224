use std::rc::Rc;

use serde_json::json;
use tracing::info;

use crate::client::ContextManager;
use crate::core::{BrainLocation, ContextId};
use crate::error::ViewerResult;
use crate::events::{Channel, DispatchReport, EventBus};

/// Entry point for user actions that change shared viewer state: switching
/// sessions, moving the time slider and selecting a location.
///
/// Each action updates the backend (or the context manager) first and then
/// announces the change so the surfaces can follow.
pub struct SessionController {
    client: Rc<ContextManager>,
    bus: EventBus,
}

impl SessionController {
    #[must_use]
    pub fn new(client: Rc<ContextManager>, bus: EventBus) -> Self {
        Self { client, bus }
    }

    #[must_use]
    pub fn context(&self) -> ContextId {
        self.client.context()
    }

    /// Makes `context` current and lets every surface reload for it.
    pub fn switch_context(&self, context: impl Into<ContextId>) -> DispatchReport {
        let context = context.into();
        let previous = self.client.context();
        self.client.set_context(context.clone());
        info!(from = %previous, to = %context, "switching session");
        self.bus.publish(
            Channel::ContextChanged,
            json!({ "context_id": context, "previous": previous }),
        )
    }

    pub fn set_time_point(&self, time_point: usize) -> ViewerResult<DispatchReport> {
        let data = self.client.data();
        data.update_timepoint(time_point)?;
        Ok(self.bus.publish(
            Channel::TimeSliderChanged,
            json!({ "time_point": time_point, "context_id": data.context() }),
        ))
    }

    /// Reads the backend's time point and re-announces it, e.g. after a reload.
    pub fn sync_time_point(&self) -> ViewerResult<usize> {
        let data = self.client.data();
        let time_point = data.get_timepoint()?;
        self.bus.publish(
            Channel::TimeSliderChanged,
            json!({ "time_point": time_point, "context_id": data.context() }),
        );
        Ok(time_point)
    }

    pub fn select_location(&self, location: BrainLocation) -> ViewerResult<DispatchReport> {
        let data = self.client.data();
        data.update_location(location)?;
        Ok(self.bus.publish(
            Channel::LocationChanged,
            json!({ "location": location, "context_id": data.context() }),
        ))
    }
}
