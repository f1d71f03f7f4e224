use std::cell::{Cell, RefCell};
use std::rc::Rc;

use neuroviz_sync::{ViewerError, ViewerResult};
use neuroviz_sync::client::contracts::{NormalizeMethod, PreprocessingParams, TimecourseShift};
use neuroviz_sync::client::{ContextManager, Endpoint, RecordingTransport, RequestField};
use neuroviz_sync::coordinators::{
    PreprocessingTarget, SessionController, TimeSeriesPlotCoordinator,
};
use neuroviz_sync::core::{BrainLocation, TimeCourseKind, TraceData};
use neuroviz_sync::events::{Channel, EventBus};
use neuroviz_sync::render::{PlotRenderer, RecordingRenderer, RenderCommand};
use serde_json::{Value, json};

struct Harness {
    client: Rc<ContextManager>,
    transport: RecordingTransport,
    bus: EventBus,
    renderer: RecordingRenderer,
    plot: Rc<TimeSeriesPlotCoordinator<RecordingRenderer>>,
}

fn harness(background: &[&str]) -> Harness {
    let transport = RecordingTransport::new();
    let client = Rc::new(ContextManager::new(transport.clone()));
    let bus = EventBus::new();
    let renderer = RecordingRenderer::with_background(background);
    let plot = Rc::new(TimeSeriesPlotCoordinator::new(
        renderer.clone(),
        Rc::clone(&client),
        bus.clone(),
        background.len(),
    ));
    Harness {
        client,
        transport,
        bus,
        renderer,
        plot,
    }
}

fn series(label: &str, values: &[f64]) -> Value {
    json!({ "label": label, "values": values })
}

fn voxel(x: usize) -> BrainLocation {
    BrainLocation::Voxel { x, y: 0, z: 0 }
}

fn record_channel(bus: &EventBus, channel: Channel) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.subscribe(channel, move |event| {
        sink.borrow_mut().push(event.payload.clone());
        Ok(())
    });
    seen
}

impl Harness {
    fn load(&self, inputs: &[(&str, &[f64])], regressors: &[(&str, &[f64])]) {
        let bundle = json!({
            "timecourses": inputs.iter().map(|(l, v)| series(l, v)).collect::<Vec<_>>(),
            "task_regressors": regressors.iter().map(|(l, v)| series(l, v)).collect::<Vec<_>>(),
        });
        self.transport.respond(Endpoint::GetTimecourses, bundle);
        self.plot.load_timecourses().expect("load time courses");
    }

    fn add_fmri(&self, label: &str, x: usize) -> usize {
        self.transport
            .respond(Endpoint::AddFmriTimecourse, series(label, &[0.0, 1.0, 0.5]));
        self.plot
            .add_fmri_timecourse(voxel(x))
            .expect("add fmri time course")
    }

    /// Every registry entry must point at the renderer trace with its label.
    fn assert_registry_matches_renderer(&self) {
        for (label, index) in self.plot.traces().expect("traces") {
            let trace = self.renderer.trace(index).expect("trace at index");
            assert_eq!(trace.label, label, "renderer position {index}");
        }
    }
}

#[test]
fn load_places_inputs_then_regressors_after_background() {
    let h = harness(&["anatomy"]);
    let reloaded = record_channel(&h.bus, Channel::TimecoursesReloaded);

    h.load(&[("ts1", &[1.0, 2.0]), ("ts2", &[3.0, 4.0])], &[("task", &[0.0, 1.0])]);

    assert_eq!(h.plot.trace_index("ts1").expect("ts1"), 1);
    assert_eq!(h.plot.trace_index("ts2").expect("ts2"), 2);
    assert_eq!(h.plot.trace_index("task").expect("task"), 3);
    assert_eq!(h.plot.kind_of("task").expect("task"), TimeCourseKind::TaskRegressor);
    assert_eq!(h.renderer.trace_labels(), vec!["anatomy", "ts1", "ts2", "task"]);
    assert_eq!(reloaded.borrow().len(), 1);
    assert_eq!(reloaded.borrow()[0]["labels"], json!(["ts1", "ts2", "task"]));
}

#[test]
fn reload_replaces_previous_series_without_touching_background() {
    let h = harness(&["anatomy"]);
    h.load(&[("ts1", &[1.0]), ("ts2", &[2.0])], &[]);
    h.add_fmri("fmri_1", 1);

    h.load(&[("ts3", &[3.0])], &[]);

    assert_eq!(h.renderer.trace_labels(), vec!["anatomy", "ts3"]);
    assert_eq!(h.plot.labels().expect("labels"), vec!["ts3"]);
    assert_eq!(h.plot.registry_snapshot().expect("snapshot").next_index, 2);
}

#[test]
fn event_is_published_after_registry_and_renderer_are_updated() {
    let h = harness(&[]);
    h.load(&[("ts1", &[1.0])], &[]);

    let observed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&observed);
    let renderer = h.renderer.clone();
    let transport = h.transport.clone();
    h.bus.subscribe(Channel::FmriTimecourseAdded, move |event| {
        let index = event.usize_field("index").expect("index in payload");
        let label = renderer.trace(index).map(|trace| trace.label);
        sink.borrow_mut().push((
            event.str_field("label").map(str::to_owned),
            label,
            transport.request_count(Endpoint::AddFmriTimecourse),
            event.str_field("context_id").map(str::to_owned),
        ));
        Ok(())
    });

    let index = h.add_fmri("fmri_1", 4);

    assert_eq!(index, 1);
    assert_eq!(
        *observed.borrow(),
        vec![(
            Some("fmri_1".to_owned()),
            Some("fmri_1".to_owned()),
            1,
            Some("main".to_owned())
        )]
    );
}

#[test]
fn failed_request_leaves_state_untouched_and_publishes_nothing() {
    let h = harness(&["anatomy"]);
    h.load(&[("ts1", &[1.0])], &[]);
    let added = record_channel(&h.bus, Channel::FmriTimecourseAdded);
    let before = h.plot.registry_snapshot().expect("snapshot");
    h.renderer.clear_commands();

    h.transport.fail(
        Endpoint::AddFmriTimecourse,
        404,
        r#"{"error": "location outside brain mask"}"#,
    );
    let err = h
        .plot
        .add_fmri_timecourse(voxel(99))
        .expect_err("backend rejects");

    assert!(err.is_request_failure());
    assert!(format!("{err}").contains("location outside brain mask"));
    assert_eq!(h.plot.registry_snapshot().expect("snapshot"), before);
    assert!(h.renderer.commands().is_empty());
    assert!(added.borrow().is_empty());
}

#[test]
fn newer_add_supersedes_an_in_flight_one() {
    let h = harness(&[]);
    let added = record_channel(&h.bus, Channel::FmriTimecourseAdded);

    h.transport
        .respond(Endpoint::AddFmriTimecourse, series("fmri_old", &[1.0]))
        .respond(Endpoint::AddFmriTimecourse, series("fmri_new", &[2.0]));

    let fired = Rc::new(Cell::new(false));
    let nested = Rc::new(RefCell::new(None));
    let weak_plot = Rc::downgrade(&h.plot);
    let nested_sink = Rc::clone(&nested);
    h.transport.on_send(Endpoint::AddFmriTimecourse, move |_request| {
        if fired.replace(true) {
            return;
        }
        if let Some(plot) = weak_plot.upgrade() {
            *nested_sink.borrow_mut() = Some(plot.add_fmri_timecourse(voxel(2)));
        }
    });

    let outer = h.plot.add_fmri_timecourse(voxel(1));

    assert!(matches!(outer, Err(ViewerError::Superseded { .. })));
    assert_eq!(*nested.borrow(), Some(Ok(0)));
    assert_eq!(h.plot.labels().expect("labels"), vec!["fmri_new"]);
    assert_eq!(h.renderer.trace_labels(), vec!["fmri_new"]);
    assert_eq!(added.borrow().len(), 1);
    assert_eq!(added.borrow()[0]["label"], "fmri_new");

    let discard = h
        .transport
        .requests()
        .into_iter()
        .find(|request| request.endpoint == Endpoint::RemoveFmriTimecourse)
        .expect("superseded add is discarded on the backend");
    assert_eq!(discard.context.as_str(), "main");
    assert_eq!(discard.field("label").map(RequestField::encode).as_deref(), Some("fmri_old"));

    let removed = record_channel(&h.bus, Channel::FmriTimecourseRemoved);
    h.transport
        .respond(Endpoint::PopFmriTimecourse, json!({ "label": "fmri_new" }))
        .respond(Endpoint::PopFmriTimecourse, json!({ "label": "fmri_old" }));
    let first = h.plot.pop_fmri_timecourse().expect("pop fmri_new");
    assert_eq!(first.map(|removal| removal.label).as_deref(), Some("fmri_new"));
    let second = h.plot.pop_fmri_timecourse().expect("unplotted label is not an error");
    assert_eq!(second, None);
    assert_eq!(removed.borrow().len(), 1);
    assert!(h.renderer.trace_labels().is_empty());
    h.assert_registry_matches_renderer();
}

#[test]
fn context_switch_during_request_drops_the_stale_response() {
    let h = harness(&["anatomy"]);
    h.load(&[("main_ts", &[1.0])], &[]);
    let session = Rc::new(SessionController::new(Rc::clone(&h.client), h.bus.clone()));

    h.transport
        .respond(Endpoint::AddFmriTimecourse, series("fmri_main", &[1.0]))
        .respond(
            Endpoint::GetTimecourses,
            json!({ "timecourses": [series("other_ts", &[5.0])] }),
        );
    let weak_session = Rc::downgrade(&session);
    h.transport.on_send(Endpoint::AddFmriTimecourse, move |_request| {
        if let Some(session) = weak_session.upgrade() {
            let report = session.switch_context("ctxB");
            assert!(report.is_clean(), "{:?}", report.failures);
        }
    });

    let err = h
        .plot
        .add_fmri_timecourse(voxel(1))
        .expect_err("response belongs to the previous context");

    assert!(matches!(err, ViewerError::Superseded { .. }));
    assert_eq!(h.renderer.trace_labels(), vec!["anatomy", "other_ts"]);
    h.assert_registry_matches_renderer();

    let requests = h.transport.requests();
    let add = requests
        .iter()
        .find(|request| request.endpoint == Endpoint::AddFmriTimecourse)
        .expect("add request");
    assert_eq!(add.context.as_str(), "main");
    let discard = requests
        .iter()
        .find(|request| request.endpoint == Endpoint::RemoveFmriTimecourse)
        .expect("discard request");
    assert_eq!(discard.context.as_str(), "main");
    assert_eq!(discard.field("label").map(RequestField::encode).as_deref(), Some("fmri_main"));
    let reload = requests
        .iter()
        .rev()
        .find(|request| request.endpoint == Endpoint::GetTimecourses)
        .expect("reload request");
    assert_eq!(reload.context.as_str(), "ctxB");
}

#[test]
fn removal_deletes_one_renderer_trace_and_reindexes_the_rest() {
    let h = harness(&["anatomy"]);
    h.load(&[("ts1", &[1.0])], &[]);
    h.add_fmri("fmri_1", 1);
    h.add_fmri("fmri_2", 2);
    h.add_fmri("fmri_3", 3);
    let removed = record_channel(&h.bus, Channel::FmriTimecourseRemoved);
    h.renderer.clear_commands();

    let removal = h.plot.remove_timecourse("fmri_1").expect("remove fmri_1");

    assert_eq!(removal.removed_index, 2);
    assert_eq!(
        h.renderer.commands(),
        vec![RenderCommand::DeleteTrace { at_index: 2 }]
    );
    assert_eq!(h.plot.trace_index("fmri_2").expect("fmri_2"), 2);
    assert_eq!(h.plot.trace_index("fmri_3").expect("fmri_3"), 3);
    h.assert_registry_matches_renderer();

    let request = h.transport.last_request().expect("remove request");
    assert_eq!(request.endpoint, Endpoint::RemoveFmriTimecourse);
    assert_eq!(removed.borrow()[0]["shifted"], json!({ "fmri_2": 2, "fmri_3": 3 }));
}

#[test]
fn only_registered_fmri_series_can_be_removed() {
    let h = harness(&[]);
    h.load(&[("ts1", &[1.0])], &[]);
    h.transport.clear_requests();

    let missing = h.plot.remove_timecourse("ghost").expect_err("not plotted");
    assert_eq!(missing, ViewerError::not_found("ghost"));
    let input = h.plot.remove_timecourse("ts1").expect_err("input series");
    assert!(matches!(input, ViewerError::InvalidData(_)));

    assert!(h.transport.requests().is_empty());
    assert_eq!(h.plot.labels().expect("labels"), vec!["ts1"]);
}

#[test]
fn pop_removes_the_series_named_by_the_backend() {
    let h = harness(&[]);
    h.add_fmri("fmri_1", 1);
    h.add_fmri("fmri_2", 2);

    h.transport
        .respond(Endpoint::PopFmriTimecourse, json!({ "label": "fmri_2" }));
    let removal = h
        .plot
        .pop_fmri_timecourse()
        .expect("pop")
        .expect("something popped");
    assert_eq!(removal.label, "fmri_2");
    assert_eq!(removal.removed_index, 1);

    h.transport
        .respond(Endpoint::PopFmriTimecourse, json!({ "label": null }));
    assert_eq!(h.plot.remove_all_fmri_timecourses().expect("clear"), vec!["fmri_1"]);
    assert!(h.plot.pop_fmri_timecourse().expect("pop on empty").is_none());
    assert!(h.renderer.is_empty());
}

#[test]
fn remove_all_keeps_inputs_and_regressors() {
    let h = harness(&["anatomy"]);
    h.load(&[("ts1", &[1.0])], &[]);
    h.add_fmri("fmri_1", 1);
    h.add_fmri("fmri_2", 2);
    let cleared = record_channel(&h.bus, Channel::FmriTimecoursesCleared);

    let labels = h.plot.remove_all_fmri_timecourses().expect("remove all");

    assert_eq!(labels, vec!["fmri_1", "fmri_2"]);
    assert_eq!(h.renderer.trace_labels(), vec!["anatomy", "ts1"]);
    assert_eq!(h.plot.registry_snapshot().expect("snapshot").next_index, 2);
    assert_eq!(cleared.borrow().len(), 1);
    assert_eq!(
        h.transport.last_request().expect("request").endpoint,
        Endpoint::RemoveAllFmriTimecourses
    );
}

#[test]
fn fmri_preprocessing_restyles_plotted_fmri_series() {
    let h = harness(&[]);
    h.load(&[("ts1", &[1.0, 1.0, 1.0])], &[]);
    h.add_fmri("fmri_1", 7);
    let applied = record_channel(&h.bus, Channel::PreprocessingApplied);
    h.renderer.clear_commands();

    h.transport.respond(
        Endpoint::GetFmriTimecourse,
        series("fmri_1", &[-1.0, 0.0, 1.0]),
    );
    let params = PreprocessingParams {
        normalize: Some(NormalizeMethod::Zscore),
        ..PreprocessingParams::default()
    };
    let restyled = h.plot.preprocess_fmri(&params).expect("preprocess");

    assert_eq!(restyled, vec!["fmri_1"]);
    let index = h.plot.trace_index("fmri_1").expect("fmri_1");
    assert_eq!(h.renderer.trace(index).expect("trace").y, vec![-1.0, 0.0, 1.0]);
    assert!(matches!(
        h.renderer.commands().as_slice(),
        [RenderCommand::Restyle { at_index, .. }] if *at_index == index
    ));
    assert_eq!(applied.borrow()[0]["target"], "fmri");

    let get = h.transport.last_request().expect("refetch");
    assert_eq!(get.endpoint, Endpoint::GetFmriTimecourse);
}

#[test]
fn timecourse_preprocessing_only_restyles_selected_labels() {
    let h = harness(&[]);
    h.load(&[("ts1", &[1.0, 2.0]), ("ts2", &[3.0, 4.0])], &[]);

    h.transport.respond(
        Endpoint::GetTimecourses,
        json!({ "timecourses": [series("ts1", &[0.0, 0.5]), series("ts2", &[9.0, 9.0])] }),
    );
    let params = PreprocessingParams {
        detrend: true,
        ..PreprocessingParams::default()
    };
    let selected = vec!["ts1".to_owned()];
    let restyled = h
        .plot
        .preprocess_timecourses(Some(selected.as_slice()), &params)
        .expect("preprocess");

    assert_eq!(restyled, vec!["ts1"]);
    assert_eq!(h.renderer.trace(0).expect("ts1").y, vec![0.0, 0.5]);
    assert_eq!(h.renderer.trace(1).expect("ts2").y, vec![3.0, 4.0]);
}

#[test]
fn invalid_preprocessing_is_rejected_before_any_request() {
    let h = harness(&[]);
    h.load(&[("ts1", &[1.0])], &[]);
    h.transport.clear_requests();

    let err = h
        .plot
        .preprocess_fmri(&PreprocessingParams::default())
        .expect_err("nothing selected");
    assert!(matches!(err, ViewerError::InvalidData(_)));
    assert!(h.transport.requests().is_empty());
}

#[test]
fn reset_preprocessing_restores_backend_values() {
    let h = harness(&[]);
    h.load(&[("ts1", &[1.0, 2.0])], &[]);
    let reset = record_channel(&h.bus, Channel::PreprocessingReset);

    h.transport.respond(
        Endpoint::GetTimecourses,
        json!({ "timecourses": [series("ts1", &[1.0, 2.0])] }),
    );
    let restyled = h
        .plot
        .reset_preprocessing(PreprocessingTarget::Timecourses)
        .expect("reset");

    assert_eq!(restyled, vec!["ts1"]);
    assert_eq!(reset.borrow()[0]["target"], "timecourses");
    assert_eq!(
        h.transport
            .request_count(Endpoint::ResetTimecoursePreprocessing),
        1
    );
}

#[test]
fn shift_and_scale_restyle_the_series_in_place() {
    let h = harness(&["anatomy"]);
    h.load(&[("ts1", &[1.0, 2.0]), ("ts2", &[5.0, 5.0])], &[]);
    let shifted = record_channel(&h.bus, Channel::TimecourseShiftChanged);

    h.transport.respond(
        Endpoint::UpdateTimecourseShift,
        series("ts2", &[7.0, 7.0]),
    );
    let index = h
        .plot
        .set_timecourse_shift("ts2", TimecourseShift::Constant(2.0))
        .expect("shift");
    assert_eq!(index, 2);
    assert_eq!(h.renderer.trace(2).expect("ts2").y, vec![7.0, 7.0]);
    assert_eq!(shifted.borrow()[0]["shift"], json!({ "type": "constant", "value": 2.0 }));

    h.transport.respond(
        Endpoint::UpdateTimecourseScale,
        series("ts1", &[2.0, 4.0]),
    );
    h.plot.set_timecourse_scale("ts1", 2.0).expect("scale");
    assert_eq!(h.renderer.trace(1).expect("ts1").y, vec![2.0, 4.0]);
    assert_eq!(h.renderer.trace_labels(), vec!["anatomy", "ts1", "ts2"]);

    let err = h
        .plot
        .set_timecourse_scale("ghost", 2.0)
        .expect_err("unknown label");
    assert_eq!(err, ViewerError::not_found("ghost"));
}

#[test]
fn rapid_shift_updates_keep_only_the_latest_per_label() {
    let h = harness(&[]);
    h.load(&[("ts1", &[0.0]), ("ts2", &[0.0])], &[]);

    h.transport
        .respond(Endpoint::UpdateTimecourseShift, series("ts1", &[1.0]))
        .respond(Endpoint::UpdateTimecourseShift, series("ts1", &[2.0]))
        .respond(Endpoint::UpdateTimecourseShift, series("ts2", &[3.0]));

    let fired = Rc::new(Cell::new(false));
    let weak_plot = Rc::downgrade(&h.plot);
    let nested = Rc::new(RefCell::new(Vec::new()));
    let nested_sink = Rc::clone(&nested);
    h.transport
        .on_send(Endpoint::UpdateTimecourseShift, move |_request| {
            if fired.replace(true) {
                return;
            }
            if let Some(plot) = weak_plot.upgrade() {
                let mut sink = nested_sink.borrow_mut();
                sink.push(plot.set_timecourse_shift("ts1", TimecourseShift::Constant(2.0)));
                sink.push(plot.set_timecourse_shift("ts2", TimecourseShift::Constant(3.0)));
            }
        });

    let outer = h
        .plot
        .set_timecourse_shift("ts1", TimecourseShift::Constant(1.0));

    assert!(matches!(outer, Err(ViewerError::Superseded { .. })));
    assert_eq!(*nested.borrow(), vec![Ok(0), Ok(1)]);
    assert_eq!(h.renderer.trace(0).expect("ts1").y, vec![2.0]);
    assert_eq!(h.renderer.trace(1).expect("ts2").y, vec![3.0]);
}

#[test]
fn annotation_markers_follow_backend_marker_list() {
    let h = harness(&[]);
    let markers_changed = record_channel(&h.bus, Channel::AnnotationMarkersChanged);
    let moved = record_channel(&h.bus, Channel::AnnotationMarkerMoved);

    h.transport
        .respond(Endpoint::AddAnnotationMarker, json!({ "markers": [5] }))
        .respond(Endpoint::AddAnnotationMarker, json!({ "markers": [5, 9] }))
        .respond(Endpoint::MoveAnnotationMarker, json!({ "markers": [6, 9] }))
        .respond(Endpoint::RemoveAnnotationMarker, json!({ "markers": [9] }));

    h.plot.add_annotation_marker(5).expect("add 5");
    h.plot.add_annotation_marker(9).expect("add 9");
    assert_eq!(h.renderer.layout_value("annotation_markers"), Some(json!([5, 9])));

    assert_eq!(h.plot.move_annotation_marker(5, 6).expect("move"), vec![6, 9]);
    assert_eq!(moved.borrow()[0]["from"], 5);
    assert_eq!(h.plot.remove_annotation_marker(6).expect("remove"), vec![9]);
    h.plot.clear_annotation_markers().expect("clear");

    assert!(h.plot.annotation_markers().expect("markers").is_empty());
    assert_eq!(h.renderer.layout_value("annotation_markers"), Some(json!([])));
    assert_eq!(markers_changed.borrow().len(), 5);
}

#[test]
fn time_slider_moves_the_time_marker() {
    let h = harness(&[]);
    let session = SessionController::new(Rc::clone(&h.client), h.bus.clone());

    let report = session.set_time_point(42).expect("set time point");

    assert!(report.is_clean());
    assert_eq!(h.plot.time_point().expect("time point"), Some(42));
    assert_eq!(
        h.renderer.layout_value("time_marker"),
        Some(json!({ "x0": 42, "x1": 42 }))
    );
    assert_eq!(
        h.transport.last_request().expect("update").endpoint,
        Endpoint::UpdateTimepoint
    );
}

#[test]
fn teardown_stops_event_driven_updates() {
    let h = harness(&[]);
    assert_eq!(h.plot.subscription_count(), 3);

    let mut plot = Rc::try_unwrap(h.plot).unwrap_or_else(|_| panic!("single owner"));
    assert_eq!(plot.teardown(), 3);
    assert_eq!(h.bus.total_subscriptions(), 0);

    h.bus.publish(Channel::TimeSliderChanged, json!({ "time_point": 3 }));
    assert_eq!(plot.time_point().expect("time point"), None);
}

/// Recording renderer whose next `add_trace` fails while `fail_adds` is set.
struct FlakyRenderer {
    inner: RecordingRenderer,
    fail_adds: Rc<Cell<bool>>,
}

impl PlotRenderer for FlakyRenderer {
    fn add_trace(&mut self, trace: &TraceData, at_index: usize) -> ViewerResult<()> {
        if self.fail_adds.get() {
            return Err(ViewerError::InvalidData("renderer refused the trace".to_owned()));
        }
        self.inner.add_trace(trace, at_index)
    }

    fn delete_trace(&mut self, at_index: usize) -> ViewerResult<()> {
        self.inner.delete_trace(at_index)
    }

    fn restyle(&mut self, props: &Value, at_index: usize) -> ViewerResult<()> {
        self.inner.restyle(props, at_index)
    }

    fn relayout(&mut self, props: &Value) -> ViewerResult<()> {
        self.inner.relayout(props)
    }
}

#[test]
fn failed_replacement_keeps_the_plotted_series() {
    let transport = RecordingTransport::new();
    let client = Rc::new(ContextManager::new(transport.clone()));
    let renderer = RecordingRenderer::with_background(&["anatomy"]);
    let fail_adds = Rc::new(Cell::new(false));
    let plot = TimeSeriesPlotCoordinator::new(
        FlakyRenderer {
            inner: renderer.clone(),
            fail_adds: Rc::clone(&fail_adds),
        },
        Rc::clone(&client),
        EventBus::new(),
        1,
    );

    transport
        .respond(Endpoint::AddFmriTimecourse, series("fmri_a", &[1.0]))
        .respond(Endpoint::AddFmriTimecourse, series("fmri_b", &[2.0]));
    plot.add_fmri_timecourse(voxel(1)).expect("add fmri_a");
    plot.add_fmri_timecourse(voxel(2)).expect("add fmri_b");

    fail_adds.set(true);
    transport.respond(Endpoint::AddFmriTimecourse, series("fmri_a", &[9.0]));
    assert!(plot.add_fmri_timecourse(voxel(1)).is_err());
    assert_eq!(renderer.trace_labels(), vec!["anatomy", "fmri_a", "fmri_b"]);
    assert_eq!(renderer.trace(1).expect("fmri_a").y, vec![1.0]);
    assert_eq!(plot.trace_index("fmri_a").expect("still plotted"), 1);

    fail_adds.set(false);
    transport.respond(Endpoint::AddFmriTimecourse, series("fmri_a", &[9.0]));
    assert_eq!(plot.add_fmri_timecourse(voxel(1)).expect("replace fmri_a"), 2);
    assert_eq!(renderer.trace_labels(), vec!["anatomy", "fmri_b", "fmri_a"]);
    assert_eq!(renderer.trace(2).expect("fmri_a").y, vec![9.0]);
    assert_eq!(plot.trace_index("fmri_b").expect("fmri_b"), 1);
}
