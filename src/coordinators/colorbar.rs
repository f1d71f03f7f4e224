use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use tracing::debug;

use crate::client::ContextManager;
use crate::client::contracts::FmriPlotOptions;
use crate::error::{ViewerError, ViewerResult};
use crate::events::{Channel, EventBus, Subscriptions};

struct ColorbarShared {
    options: RefCell<Option<FmriPlotOptions>>,
    client: Rc<ContextManager>,
}

impl ColorbarShared {
    fn refresh(&self) -> ViewerResult<()> {
        let options = self.client.plot_options().get_fmri_plot_options()?;
        debug!(
            color_min = options.color_min,
            color_max = options.color_max,
            colormap = %options.colormap,
            "refreshed colorbar"
        );
        *self.options.borrow_mut() = Some(options);
        Ok(())
    }
}

/// Mirrors the fMRI color range and colormap, refetching whenever plot
/// options, preprocessing or the session change.
pub struct ColorbarCoordinator {
    shared: Rc<ColorbarShared>,
    bus: EventBus,
    subscriptions: Subscriptions,
}

impl ColorbarCoordinator {
    #[must_use]
    pub fn new(client: Rc<ContextManager>, bus: EventBus) -> Self {
        let shared = Rc::new(ColorbarShared {
            options: RefCell::new(None),
            client,
        });
        let mut subscriptions = Subscriptions::new(bus.clone());
        let weak = Rc::downgrade(&shared);
        subscriptions.push(bus.subscribe_multiple(
            &[
                Channel::PlotOptionsChanged,
                Channel::PreprocessingApplied,
                Channel::PreprocessingReset,
                Channel::ContextChanged,
            ],
            move |_event| weak.upgrade().map_or(Ok(()), |shared| shared.refresh()),
        ));
        Self {
            shared,
            bus,
            subscriptions,
        }
    }

    /// Fetches the current options without waiting for an event.
    pub fn refresh(&self) -> ViewerResult<FmriPlotOptions> {
        self.shared.refresh()?;
        self.options()
            .ok_or_else(|| ViewerError::InvalidData("colorbar has no plot options".to_owned()))
    }

    #[must_use]
    pub fn options(&self) -> Option<FmriPlotOptions> {
        self.shared.options.borrow().clone()
    }

    /// Submits a new color range and announces the change. Every colorbar
    /// subscribed on the bus (this one included) refetches afterwards.
    pub fn update_color_range(&self, color_min: f64, color_max: f64) -> ViewerResult<FmriPlotOptions> {
        if !(color_min.is_finite() && color_max.is_finite()) || color_min >= color_max {
            return Err(ViewerError::InvalidData(format!(
                "invalid color range [{color_min}, {color_max}]"
            )));
        }
        let api = self.shared.client.plot_options();
        let options = api.update_fmri_plot_options(json!({
            "color_min": color_min,
            "color_max": color_max,
        }))?;
        *self.shared.options.borrow_mut() = Some(options.clone());
        self.bus.publish(
            Channel::PlotOptionsChanged,
            json!({ "target": "fmri", "plot_options": options, "context_id": api.context() }),
        );
        Ok(options)
    }

    pub fn set_colormap(&self, colormap: &str) -> ViewerResult<FmriPlotOptions> {
        let api = self.shared.client.plot_options();
        let options = api.update_fmri_plot_options(json!({ "colormap": colormap }))?;
        *self.shared.options.borrow_mut() = Some(options.clone());
        self.bus.publish(
            Channel::PlotOptionsChanged,
            json!({ "target": "fmri", "plot_options": options, "context_id": api.context() }),
        );
        Ok(options)
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn teardown(&mut self) -> usize {
        self.subscriptions.release_all()
    }
}
