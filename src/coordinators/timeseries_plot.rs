use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::ContextManager;
use crate::client::contracts::{PreprocessingParams, TimecourseShift, TimecourseUpdate};
use crate::core::{
    ActionGenerations, ActionTicket, BrainLocation, ContextId, TimeCourse, TimeCourseKind,
    TraceData, TraceIndexRegistry, TraceRegistrySnapshot, TraceRemoval,
};
use crate::error::{ViewerError, ViewerResult};
use crate::events::{Channel, Event, EventBus, Subscriptions};
use crate::render::PlotRenderer;

/// Logical actions whose responses are subject to the stale-response guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlotAction {
    Reload,
    AddFmriTimecourse,
    Preprocess,
    Shift(String),
    Scale(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessingTarget {
    Fmri,
    Timecourses,
}

impl PreprocessingTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fmri => "fmri",
            Self::Timecourses => "timecourses",
        }
    }
}

struct PlotState<R> {
    renderer: R,
    registry: TraceIndexRegistry,
    kinds: HashMap<String, TimeCourseKind>,
    locations: HashMap<String, BrainLocation>,
    generations: ActionGenerations<PlotAction>,
    time_point: Option<usize>,
    annotation_markers: Vec<usize>,
}

impl<R: PlotRenderer> PlotState<R> {
    /// Registers and draws a time course. A label that is already plotted is
    /// drawn at the end first and only then detached, so a renderer failure
    /// leaves the old series in place and registry positions stay dense.
    fn insert_trace(&mut self, time_course: &TimeCourse) -> ViewerResult<usize> {
        let trace = TraceData::from_time_course(time_course);
        let appended_at = self.registry.next_index();
        self.renderer.add_trace(&trace, appended_at)?;
        if self.registry.has_trace(&time_course.label) {
            debug!(label = %time_course.label, "replacing plotted time course");
            if let Err(err) = self.detach_trace(&time_course.label) {
                self.renderer.delete_trace(appended_at)?;
                return Err(err);
            }
        }
        let allocation = self.registry.add_trace(time_course.label.as_str());
        self.kinds
            .insert(time_course.label.clone(), time_course.kind);
        Ok(allocation.index)
    }

    fn detach_trace(&mut self, label: &str) -> ViewerResult<TraceRemoval> {
        let removal = self.registry.remove_trace(label)?;
        self.kinds.remove(label);
        self.locations.remove(label);
        self.renderer.delete_trace(removal.removed_index)?;
        Ok(removal)
    }

    /// Detaches every registered trace from the top down so no deletion
    /// shifts a trace that is still to be deleted.
    fn detach_all(&mut self) -> ViewerResult<Vec<String>> {
        let labels: Vec<String> = self
            .registry
            .labels_in_render_order()
            .into_iter()
            .map(str::to_owned)
            .collect();
        for label in labels.iter().rev() {
            self.detach_trace(label)?;
        }
        self.registry.clear();
        Ok(labels)
    }

    fn restyle_values(&mut self, label: &str, values: &[f64]) -> ViewerResult<usize> {
        let index = self.registry.get_trace_index(label)?;
        let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        self.renderer
            .restyle(&json!({ "x": x, "y": values }), index)?;
        Ok(index)
    }

    fn labels_of_kind(&self, kind: TimeCourseKind) -> Vec<String> {
        self.registry
            .labels_in_render_order()
            .into_iter()
            .filter(|label| self.kinds.get(*label) == Some(&kind))
            .map(str::to_owned)
            .collect()
    }

    fn draw_time_marker(&mut self, time_point: usize) -> ViewerResult<()> {
        self.renderer
            .relayout(&json!({ "time_marker": { "x0": time_point, "x1": time_point } }))?;
        self.time_point = Some(time_point);
        Ok(())
    }

    fn draw_annotation_markers(&mut self, markers: Vec<usize>) -> ViewerResult<()> {
        if markers == self.annotation_markers {
            return Ok(());
        }
        self.renderer
            .relayout(&json!({ "annotation_markers": markers }))?;
        self.annotation_markers = markers;
        Ok(())
    }
}

struct PlotShared<R> {
    state: RefCell<PlotState<R>>,
    client: Rc<ContextManager>,
    bus: EventBus,
}

impl<R: PlotRenderer> PlotShared<R> {
    fn state(&self) -> ViewerResult<Ref<'_, PlotState<R>>> {
        self.state
            .try_borrow()
            .map_err(|_| ViewerError::InvalidData("time series plot state is busy".to_owned()))
    }

    fn state_mut(&self) -> ViewerResult<RefMut<'_, PlotState<R>>> {
        self.state
            .try_borrow_mut()
            .map_err(|_| ViewerError::InvalidData("time series plot state is busy".to_owned()))
    }

    fn begin(&self, action: PlotAction) -> ViewerResult<ActionTicket<PlotAction>> {
        Ok(self.state_mut()?.generations.begin(action))
    }

    fn ensure_registered(&self, label: &str) -> ViewerResult<TimeCourseKind> {
        self.state()?
            .kinds
            .get(label)
            .copied()
            .ok_or_else(|| ViewerError::not_found(label))
    }

    fn load_timecourses(&self) -> ViewerResult<Vec<String>> {
        let ticket = self.begin(PlotAction::Reload)?;
        let data = self.client.data();
        let context = data.context().clone();
        let time_courses = data.get_timecourses()?;

        let labels = {
            let mut state = self.state_mut()?;
            state.generations.ensure_current(&ticket)?;
            state.detach_all()?;
            for time_course in &time_courses {
                state.insert_trace(time_course)?;
            }
            state
                .registry
                .labels_in_render_order()
                .into_iter()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };
        info!(context = %context, traces = labels.len(), "loaded time courses");
        self.bus.publish(
            Channel::TimecoursesReloaded,
            json!({ "labels": labels, "context_id": context }),
        );
        Ok(labels)
    }

    fn add_fmri_timecourse(&self, location: BrainLocation) -> ViewerResult<usize> {
        let ticket = self.begin(PlotAction::AddFmriTimecourse)?;
        let data = self.client.data();
        let context = data.context().clone();
        let time_course = data.add_fmri_timecourse(location)?;

        let index = {
            let mut state = self.state_mut()?;
            let current = state.generations.ensure_current(&ticket);
            if let Err(err) = current {
                let plotted = state.registry.has_trace(&time_course.label);
                drop(state);
                if !plotted {
                    self.discard_superseded_add(&context, &time_course.label);
                }
                return Err(err);
            }
            let index = state.insert_trace(&time_course)?;
            state.locations.insert(time_course.label.clone(), location);
            index
        };
        self.bus.publish(
            Channel::FmriTimecourseAdded,
            json!({
                "label": time_course.label,
                "index": index,
                "location": location,
                "context_id": context,
            }),
        );
        Ok(index)
    }

    /// The backend stored the series of a superseded add; drop it there too
    /// so the backend never holds an fMRI series the plot does not show.
    fn discard_superseded_add(&self, context: &ContextId, label: &str) {
        match self.client.data_in(context).remove_fmri_timecourse(label) {
            Ok(()) => debug!(context = %context, label, "discarded superseded fmri time course"),
            Err(err) => warn!(
                context = %context,
                label,
                error = %err,
                "failed to discard superseded fmri time course"
            ),
        }
    }

    fn remove_timecourse(&self, label: &str) -> ViewerResult<TraceRemoval> {
        let kind = self.ensure_registered(label)?;
        if kind != TimeCourseKind::Fmri {
            return Err(ViewerError::InvalidData(format!(
                "only fmri time courses can be removed, `{label}` is {kind:?}"
            )));
        }
        let data = self.client.data();
        let context = data.context().clone();
        data.remove_fmri_timecourse(label)?;

        let removal = self.state_mut()?.detach_trace(label)?;
        self.publish_removal(&removal, &context);
        Ok(removal)
    }

    fn pop_fmri_timecourse(&self) -> ViewerResult<Option<TraceRemoval>> {
        let expected = {
            let state = self.state()?;
            state
                .registry
                .most_recent(|label| state.kinds.get(label) == Some(&TimeCourseKind::Fmri))
                .map(str::to_owned)
        };
        let data = self.client.data();
        let context = data.context().clone();
        let Some(label) = data.pop_fmri_timecourse()? else {
            return Ok(None);
        };
        if expected.as_deref() != Some(label.as_str()) {
            warn!(
                popped = %label,
                expected = ?expected,
                "backend popped a different time course than the most recent plotted one"
            );
        }
        if !self.state()?.registry.has_trace(&label) {
            warn!(popped = %label, "backend popped a time course that is not plotted");
            return Ok(None);
        }

        let removal = self.state_mut()?.detach_trace(&label)?;
        self.publish_removal(&removal, &context);
        Ok(Some(removal))
    }

    fn remove_all_fmri_timecourses(&self) -> ViewerResult<Vec<String>> {
        let data = self.client.data();
        let context = data.context().clone();
        data.remove_all_fmri_timecourses()?;

        let labels = {
            let mut state = self.state_mut()?;
            let labels = state.labels_of_kind(TimeCourseKind::Fmri);
            for label in labels.iter().rev() {
                state.detach_trace(label)?;
            }
            labels
        };
        self.bus.publish(
            Channel::FmriTimecoursesCleared,
            json!({ "labels": labels, "context_id": context }),
        );
        Ok(labels)
    }

    fn publish_removal(&self, removal: &TraceRemoval, context: &ContextId) {
        self.bus.publish(
            Channel::FmriTimecourseRemoved,
            json!({
                "label": removal.label,
                "removed_index": removal.removed_index,
                "shifted": removal.shifted,
                "context_id": context,
            }),
        );
    }

    /// Re-reads values for the plotted series after preprocessing changed
    /// them on the backend.
    fn fetch_refreshed_values(
        &self,
        context: &ContextId,
        target: PreprocessingTarget,
        only: Option<&[String]>,
    ) -> ViewerResult<Vec<(String, Vec<f64>)>> {
        let data = self.client.data_in(context);
        match target {
            PreprocessingTarget::Fmri => {
                let locations: Vec<(String, BrainLocation)> = {
                    let state = self.state()?;
                    state
                        .labels_of_kind(TimeCourseKind::Fmri)
                        .into_iter()
                        .filter_map(|label| {
                            let location = state.locations.get(&label).copied()?;
                            Some((label, location))
                        })
                        .collect()
                };
                locations
                    .into_iter()
                    .map(|(label, location)| {
                        data.get_fmri_timecourse(location)
                            .map(|time_course| (label, time_course.values))
                    })
                    .collect()
            }
            PreprocessingTarget::Timecourses => {
                let time_courses = data.get_timecourses()?;
                let state = self.state()?;
                Ok(time_courses
                    .into_iter()
                    .filter(|tc| state.registry.has_trace(&tc.label))
                    .filter(|tc| only.is_none_or(|labels| labels.contains(&tc.label)))
                    .map(|tc| (tc.label, tc.values))
                    .collect())
            }
        }
    }

    fn apply_refreshed_values(
        &self,
        ticket: &ActionTicket<PlotAction>,
        updates: Vec<(String, Vec<f64>)>,
    ) -> ViewerResult<Vec<String>> {
        let mut state = self.state_mut()?;
        state.generations.ensure_current(ticket)?;
        let mut labels = Vec::with_capacity(updates.len());
        for (label, values) in updates {
            state.restyle_values(&label, &values)?;
            labels.push(label);
        }
        Ok(labels)
    }

    fn preprocess(
        &self,
        target: PreprocessingTarget,
        labels: Option<&[String]>,
        params: &PreprocessingParams,
    ) -> ViewerResult<Vec<String>> {
        let ticket = self.begin(PlotAction::Preprocess)?;
        let preprocessing = self.client.preprocessing();
        let context = preprocessing.context().clone();
        match (target, labels) {
            (PreprocessingTarget::Fmri, _) => preprocessing.run_fmri_preprocessing(params)?,
            (PreprocessingTarget::Timecourses, Some(labels)) => {
                preprocessing.run_timecourse_preprocessing(labels, params)?;
            }
            (PreprocessingTarget::Timecourses, None) => {
                let all = self.state()?.labels_of_kind(TimeCourseKind::Input);
                preprocessing.run_timecourse_preprocessing(&all, params)?;
            }
        }

        let updates = self.fetch_refreshed_values(&context, target, labels)?;
        let restyled = self.apply_refreshed_values(&ticket, updates)?;
        self.bus.publish(
            Channel::PreprocessingApplied,
            json!({
                "target": target.as_str(),
                "labels": restyled,
                "params": params,
                "context_id": context,
            }),
        );
        Ok(restyled)
    }

    fn reset_preprocessing(&self, target: PreprocessingTarget) -> ViewerResult<Vec<String>> {
        let ticket = self.begin(PlotAction::Preprocess)?;
        let preprocessing = self.client.preprocessing();
        let context = preprocessing.context().clone();
        match target {
            PreprocessingTarget::Fmri => preprocessing.reset_fmri_preprocessing()?,
            PreprocessingTarget::Timecourses => preprocessing.reset_timecourse_preprocessing()?,
        }

        let updates = self.fetch_refreshed_values(&context, target, None)?;
        let restyled = self.apply_refreshed_values(&ticket, updates)?;
        self.bus.publish(
            Channel::PreprocessingReset,
            json!({ "target": target.as_str(), "labels": restyled, "context_id": context }),
        );
        Ok(restyled)
    }

    fn apply_series_update(
        &self,
        ticket: &ActionTicket<PlotAction>,
        label: &str,
        update: &TimecourseUpdate,
    ) -> ViewerResult<usize> {
        if update.label != label {
            warn!(requested = label, returned = %update.label, "series update label mismatch");
        }
        let mut state = self.state_mut()?;
        state.generations.ensure_current(ticket)?;
        state.restyle_values(label, &update.values)
    }

    fn set_timecourse_shift(&self, label: &str, shift: TimecourseShift) -> ViewerResult<usize> {
        self.ensure_registered(label)?;
        let ticket = self.begin(PlotAction::Shift(label.to_owned()))?;
        let options = self.client.plot_options();
        let context = options.context().clone();
        let update = options.update_timecourse_shift(label, shift)?;

        let index = self.apply_series_update(&ticket, label, &update)?;
        self.bus.publish(
            Channel::TimecourseShiftChanged,
            json!({ "label": label, "index": index, "shift": shift, "context_id": context }),
        );
        Ok(index)
    }

    fn set_timecourse_scale(&self, label: &str, scale: f64) -> ViewerResult<usize> {
        self.ensure_registered(label)?;
        let ticket = self.begin(PlotAction::Scale(label.to_owned()))?;
        let options = self.client.plot_options();
        let context = options.context().clone();
        let update = options.update_timecourse_scale(label, scale)?;

        let index = self.apply_series_update(&ticket, label, &update)?;
        self.bus.publish(
            Channel::TimecourseScaleChanged,
            json!({ "label": label, "index": index, "scale": scale, "context_id": context }),
        );
        Ok(index)
    }

    fn update_annotation_markers(
        &self,
        markers: ViewerResult<Vec<usize>>,
        context: &ContextId,
    ) -> ViewerResult<Vec<usize>> {
        let markers = markers?;
        self.state_mut()?.draw_annotation_markers(markers.clone())?;
        self.bus.publish(
            Channel::AnnotationMarkersChanged,
            json!({ "markers": markers, "context_id": context }),
        );
        Ok(markers)
    }
}

/// Coordinator of the time-series plot surface.
///
/// Owns the surface's `TraceIndexRegistry` and renderer. Every mutating
/// operation requests the change from the backend first, then reconciles the
/// registry, then updates the renderer, and only then publishes on the bus.
/// A failed request leaves registry and renderer untouched.
pub struct TimeSeriesPlotCoordinator<R: PlotRenderer + 'static> {
    shared: Rc<PlotShared<R>>,
    subscriptions: Subscriptions,
}

impl<R: PlotRenderer + 'static> TimeSeriesPlotCoordinator<R> {
    /// `background_traces` positions at the bottom of the renderer's trace
    /// list belong to fixed elements and are never touched.
    pub fn new(
        renderer: R,
        client: Rc<ContextManager>,
        bus: EventBus,
        background_traces: usize,
    ) -> Self {
        let shared = Rc::new(PlotShared {
            state: RefCell::new(PlotState {
                renderer,
                registry: TraceIndexRegistry::new(background_traces),
                kinds: HashMap::new(),
                locations: HashMap::new(),
                generations: ActionGenerations::new(),
                time_point: None,
                annotation_markers: Vec::new(),
            }),
            client,
            bus: bus.clone(),
        });
        let mut subscriptions = Subscriptions::new(bus);
        attach_handlers(&shared, &mut subscriptions);
        Self {
            shared,
            subscriptions,
        }
    }

    /// Replaces every plotted series with the inputs and task regressors of
    /// the current context.
    pub fn load_timecourses(&self) -> ViewerResult<Vec<String>> {
        self.shared.load_timecourses()
    }

    /// Adds the fMRI time course at `location` and returns its trace index.
    pub fn add_fmri_timecourse(&self, location: BrainLocation) -> ViewerResult<usize> {
        self.shared.add_fmri_timecourse(location)
    }

    pub fn remove_timecourse(&self, label: &str) -> ViewerResult<TraceRemoval> {
        self.shared.remove_timecourse(label)
    }

    /// Removes the most recently added fMRI time course, if any. A popped
    /// label that is not plotted leaves the plot untouched and yields `None`.
    pub fn pop_fmri_timecourse(&self) -> ViewerResult<Option<TraceRemoval>> {
        self.shared.pop_fmri_timecourse()
    }

    pub fn remove_all_fmri_timecourses(&self) -> ViewerResult<Vec<String>> {
        self.shared.remove_all_fmri_timecourses()
    }

    pub fn preprocess_fmri(&self, params: &PreprocessingParams) -> ViewerResult<Vec<String>> {
        self.shared
            .preprocess(PreprocessingTarget::Fmri, None, params)
    }

    /// Preprocesses `labels`, or every loaded input time course when `None`.
    pub fn preprocess_timecourses(
        &self,
        labels: Option<&[String]>,
        params: &PreprocessingParams,
    ) -> ViewerResult<Vec<String>> {
        self.shared
            .preprocess(PreprocessingTarget::Timecourses, labels, params)
    }

    pub fn reset_preprocessing(&self, target: PreprocessingTarget) -> ViewerResult<Vec<String>> {
        self.shared.reset_preprocessing(target)
    }

    pub fn set_timecourse_shift(&self, label: &str, shift: TimecourseShift) -> ViewerResult<usize> {
        self.shared.set_timecourse_shift(label, shift)
    }

    pub fn set_timecourse_scale(&self, label: &str, scale: f64) -> ViewerResult<usize> {
        self.shared.set_timecourse_scale(label, scale)
    }

    pub fn add_annotation_marker(&self, time_point: usize) -> ViewerResult<Vec<usize>> {
        let data = self.shared.client.data();
        let markers = data.add_annotation_marker(time_point);
        self.shared.update_annotation_markers(markers, data.context())
    }

    pub fn move_annotation_marker(&self, from: usize, to: usize) -> ViewerResult<Vec<usize>> {
        let data = self.shared.client.data();
        let markers = self
            .shared
            .update_annotation_markers(data.move_annotation_marker(from, to), data.context())?;
        self.shared.bus.publish(
            Channel::AnnotationMarkerMoved,
            json!({ "from": from, "to": to, "context_id": data.context() }),
        );
        Ok(markers)
    }

    pub fn remove_annotation_marker(&self, time_point: usize) -> ViewerResult<Vec<usize>> {
        let data = self.shared.client.data();
        let markers = data.remove_annotation_marker(time_point);
        self.shared.update_annotation_markers(markers, data.context())
    }

    pub fn clear_annotation_markers(&self) -> ViewerResult<()> {
        let data = self.shared.client.data();
        let cleared = data.clear_annotation_markers().map(|()| Vec::new());
        self.shared
            .update_annotation_markers(cleared, data.context())
            .map(|_| ())
    }

    pub fn trace_index(&self, label: &str) -> ViewerResult<usize> {
        self.shared.state()?.registry.get_trace_index(label)
    }

    /// Plotted labels in render order.
    pub fn labels(&self) -> ViewerResult<Vec<String>> {
        Ok(self
            .shared
            .state()?
            .registry
            .labels_in_render_order()
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    pub fn traces(&self) -> ViewerResult<IndexMap<String, usize>> {
        Ok(self.shared.state()?.registry.all_traces())
    }

    pub fn kind_of(&self, label: &str) -> ViewerResult<TimeCourseKind> {
        self.shared.ensure_registered(label)
    }

    pub fn registry_snapshot(&self) -> ViewerResult<TraceRegistrySnapshot> {
        Ok(self.shared.state()?.registry.snapshot())
    }

    pub fn time_point(&self) -> ViewerResult<Option<usize>> {
        Ok(self.shared.state()?.time_point)
    }

    pub fn annotation_markers(&self) -> ViewerResult<Vec<usize>> {
        Ok(self.shared.state()?.annotation_markers.clone())
    }

    /// Runs `f` against the owned renderer.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> ViewerResult<T> {
        Ok(f(&self.shared.state()?.renderer))
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Deregisters every bus handler of this surface.
    pub fn teardown(&mut self) -> usize {
        self.subscriptions.release_all()
    }
}

fn attach_handlers<R: PlotRenderer + 'static>(
    shared: &Rc<PlotShared<R>>,
    subscriptions: &mut Subscriptions,
) {
    let bus = subscriptions.bus().clone();

    let weak = Rc::downgrade(shared);
    subscriptions.push(bus.subscribe(Channel::TimeSliderChanged, move |event| {
        with_shared(&weak, |shared| {
            let time_point = event.usize_field("time_point").ok_or_else(|| {
                ViewerError::InvalidData("time slider event without `time_point`".to_owned())
            })?;
            shared.state_mut()?.draw_time_marker(time_point)
        })
    }));

    let weak = Rc::downgrade(shared);
    subscriptions.push(
        bus.subscribe(Channel::AnnotationMarkersChanged, move |event| {
            with_shared(&weak, |shared| {
                let markers = markers_from_event(event)?;
                shared.state_mut()?.draw_annotation_markers(markers)
            })
        }),
    );

    let weak = Rc::downgrade(shared);
    subscriptions.push(bus.subscribe(Channel::ContextChanged, move |_event| {
        with_shared(&weak, |shared| {
            shared.state_mut()?.generations.advance_epoch();
            shared.load_timecourses().map(|_| ())
        })
    }));
}

fn with_shared<R, F>(weak: &Weak<PlotShared<R>>, f: F) -> ViewerResult<()>
where
    F: FnOnce(&PlotShared<R>) -> ViewerResult<()>,
{
    match weak.upgrade() {
        Some(shared) => f(&shared),
        None => Ok(()),
    }
}

fn markers_from_event(event: &Event) -> ViewerResult<Vec<usize>> {
    let markers = event.payload.get("markers").cloned().unwrap_or(Value::Null);
    serde_json::from_value(markers).map_err(|e| {
        ViewerError::InvalidData(format!("annotation event has invalid `markers`: {e}"))
    })
}
