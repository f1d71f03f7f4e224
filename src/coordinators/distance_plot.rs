use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use serde_json::json;
use tracing::debug;

use crate::client::ContextManager;
use crate::client::contracts::{DistanceMetric, DistanceRequest};
use crate::core::{BrainLocation, TimeCourse, TimeCourseKind, TraceData, TraceIndexRegistry};
use crate::error::{ViewerError, ViewerResult};
use crate::events::{Channel, EventBus, Subscriptions};
use crate::render::PlotRenderer;

/// Label of the single series drawn by the distance plot.
pub const DISTANCE_TRACE_LABEL: &str = "distance";

struct DistanceState<R> {
    renderer: R,
    registry: TraceIndexRegistry,
    source: Option<(BrainLocation, DistanceMetric)>,
}

impl<R: PlotRenderer> DistanceState<R> {
    fn close(&mut self) -> ViewerResult<bool> {
        if !self.registry.has_trace(DISTANCE_TRACE_LABEL) {
            return Ok(false);
        }
        let removal = self.registry.remove_trace(DISTANCE_TRACE_LABEL)?;
        self.renderer.delete_trace(removal.removed_index)?;
        self.source = None;
        Ok(true)
    }
}

struct DistanceShared<R> {
    state: RefCell<DistanceState<R>>,
}

impl<R: PlotRenderer> DistanceShared<R> {
    fn state_mut(&self) -> ViewerResult<RefMut<'_, DistanceState<R>>> {
        self.state
            .try_borrow_mut()
            .map_err(|_| ViewerError::InvalidData("distance plot state is busy".to_owned()))
    }
}

/// Surface plotting the distance between a reference time course and every
/// time point. It has its own registry and renderer, separate from the main
/// time-series plot.
pub struct DistancePlotCoordinator<R: PlotRenderer + 'static> {
    shared: Rc<DistanceShared<R>>,
    client: Rc<ContextManager>,
    bus: EventBus,
    subscriptions: Subscriptions,
}

impl<R: PlotRenderer + 'static> DistancePlotCoordinator<R> {
    pub fn new(renderer: R, client: Rc<ContextManager>, bus: EventBus) -> Self {
        let shared = Rc::new(DistanceShared {
            state: RefCell::new(DistanceState {
                renderer,
                registry: TraceIndexRegistry::new(0),
                source: None,
            }),
        });
        let mut subscriptions = Subscriptions::new(bus.clone());

        let weak = Rc::downgrade(&shared);
        subscriptions.push(bus.subscribe(Channel::TimeSliderChanged, move |event| {
            let Some(shared) = weak.upgrade() else {
                return Ok(());
            };
            let time_point = event.usize_field("time_point").ok_or_else(|| {
                ViewerError::InvalidData("time slider event without `time_point`".to_owned())
            })?;
            shared
                .state_mut()?
                .renderer
                .relayout(&json!({ "time_marker": { "x0": time_point, "x1": time_point } }))
        }));

        let weak = Rc::downgrade(&shared);
        subscriptions.push(bus.subscribe(Channel::ContextChanged, move |_event| {
            let Some(shared) = weak.upgrade() else {
                return Ok(());
            };
            let closed = shared.state_mut()?.close()?;
            if closed {
                debug!("closed distance plot after context switch");
            }
            Ok(())
        }));

        Self {
            shared,
            client,
            bus,
            subscriptions,
        }
    }

    /// Computes and draws the distance series for `location`, replacing any
    /// series already shown.
    pub fn show_distance(
        &self,
        location: BrainLocation,
        metric: DistanceMetric,
    ) -> ViewerResult<usize> {
        let analysis = self.client.analysis();
        let outcome = analysis.compute_distance(&DistanceRequest { location, metric })?;
        let time_course = TimeCourse::new(DISTANCE_TRACE_LABEL, TimeCourseKind::Distance, outcome.values);

        let index = {
            let mut state = self.shared.state_mut()?;
            state.close()?;
            let index = state.registry.try_add_trace(DISTANCE_TRACE_LABEL)?;
            if let Err(err) = state
                .renderer
                .add_trace(&TraceData::from_time_course(&time_course), index)
            {
                state.registry.remove_trace(DISTANCE_TRACE_LABEL)?;
                return Err(err);
            }
            state.source = Some((location, metric));
            index
        };
        self.bus.publish(
            Channel::DistancePlotUpdated,
            json!({
                "location": location,
                "metric": metric,
                "points": time_course.values.len(),
                "context_id": analysis.context(),
            }),
        );
        Ok(index)
    }

    /// Removes the distance series. Returns `false` when nothing was shown.
    pub fn close(&self) -> ViewerResult<bool> {
        self.shared.state_mut()?.close()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared
            .state
            .borrow()
            .registry
            .has_trace(DISTANCE_TRACE_LABEL)
    }

    #[must_use]
    pub fn source(&self) -> Option<(BrainLocation, DistanceMetric)> {
        self.shared.state.borrow().source
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn teardown(&mut self) -> usize {
        self.subscriptions.release_all()
    }
}
