use std::cell::RefCell;
use std::rc::Rc;

use neuroviz_sync::ViewerError;
use neuroviz_sync::client::contracts::{
    AverageRequest, CorrelationRequest, DistanceMetric, HrfRequest, PeakFinderRequest,
};
use neuroviz_sync::client::{ContextManager, Endpoint, RecordingTransport};
use neuroviz_sync::coordinators::{
    AnalysisCoordinator, ColorbarCoordinator, CoordinateDisplayCoordinator, DISTANCE_TRACE_LABEL,
    DistancePlotCoordinator, SessionController, TimeSeriesPlotCoordinator,
};
use neuroviz_sync::core::{BrainLocation, Hemisphere, TimeCourseKind};
use neuroviz_sync::events::{Channel, EventBus};
use neuroviz_sync::render::{NullRenderer, RecordingRenderer};
use serde_json::{Value, json};

fn setup() -> (Rc<ContextManager>, RecordingTransport, EventBus) {
    let transport = RecordingTransport::new();
    let client = Rc::new(ContextManager::new(transport.clone()));
    (client, transport, EventBus::new())
}

fn fmri_options(color_min: f64, color_max: f64) -> Value {
    json!({ "color_min": color_min, "color_max": color_max, "colormap": "plasma" })
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

#[test]
fn colorbar_refetches_after_preprocessing_elsewhere() {
    let (client, transport, bus) = setup();
    let colorbar = ColorbarCoordinator::new(Rc::clone(&client), bus.clone());
    assert!(colorbar.options().is_none());

    transport.respond(Endpoint::GetFmriPlotOptions, fmri_options(-2.0, 2.0));
    let report = bus.publish(Channel::PreprocessingApplied, json!({ "target": "fmri" }));

    assert!(report.is_clean());
    let options = colorbar.options().expect("options after event");
    assert_eq!((options.color_min, options.color_max), (-2.0, 2.0));
    assert_eq!(options.colormap, "plasma");
}

#[test]
fn color_range_update_is_announced_to_other_colorbars() {
    let (client, transport, bus) = setup();
    let editing = ColorbarCoordinator::new(Rc::clone(&client), bus.clone());
    let mirror = ColorbarCoordinator::new(Rc::clone(&client), bus.clone());
    let changed = record_channel(&bus, Channel::PlotOptionsChanged);

    transport
        .respond(Endpoint::UpdateFmriPlotOptions, fmri_options(0.0, 5.0))
        .respond_always(Endpoint::GetFmriPlotOptions, fmri_options(0.0, 5.0));

    let options = editing.update_color_range(0.0, 5.0).expect("update range");

    assert_eq!(options.color_max, 5.0);
    assert_eq!(mirror.options().expect("mirror").color_max, 5.0);
    assert_eq!(changed.borrow().len(), 1);
    let update = transport
        .requests()
        .into_iter()
        .find(|request| request.endpoint == Endpoint::UpdateFmriPlotOptions)
        .expect("update request");
    let patch = update.encoded_fields();
    assert_eq!(patch[0].0, "plot_options");
}

#[test]
fn colorbar_rejects_inverted_range_locally() {
    let (client, transport, bus) = setup();
    let colorbar = ColorbarCoordinator::new(client, bus);

    let err = colorbar.update_color_range(3.0, 1.0).expect_err("inverted");
    assert!(matches!(err, ViewerError::InvalidData(_)));
    assert!(transport.requests().is_empty());
}

#[test]
fn colorbar_failure_is_reported_by_the_publish() {
    let (client, transport, bus) = setup();
    let _colorbar = ColorbarCoordinator::new(client, bus.clone());
    transport.fail(Endpoint::GetFmriPlotOptions, 500, "server exploded");

    let report = bus.notify(Channel::PlotOptionsChanged);

    assert_eq!(report.failures.len(), 1);
    assert!(format!("{}", report.failures[0]).contains("server exploded"));
}

#[test]
fn coordinate_display_follows_location_and_time() {
    let (client, transport, bus) = setup();
    let display = CoordinateDisplayCoordinator::new(Rc::clone(&client), bus.clone());
    let session = SessionController::new(Rc::clone(&client), bus.clone());

    transport.respond(
        Endpoint::GetWorldCoords,
        json!({ "x": -12.5, "y": 30.0, "z": 4.0 }),
    );
    let location = BrainLocation::Vertex {
        index: 1_024,
        hemisphere: Hemisphere::Left,
    };
    let report = session.select_location(location).expect("select location");
    assert!(report.is_clean());
    session.set_time_point(17).expect("time point");

    let readout = display.readout();
    assert_eq!(readout.location, Some(location));
    assert_eq!(readout.world.expect("world").x, -12.5);
    assert_eq!(readout.time_point, Some(17));

    let endpoints: Vec<Endpoint> = transport
        .requests()
        .iter()
        .map(|request| request.endpoint)
        .collect();
    assert_eq!(
        endpoints,
        vec![
            Endpoint::UpdateLocation,
            Endpoint::GetWorldCoords,
            Endpoint::UpdateTimepoint
        ]
    );
}

#[test]
fn distance_plot_keeps_a_single_series() {
    let (client, transport, bus) = setup();
    let renderer = RecordingRenderer::new();
    let distance = DistancePlotCoordinator::new(renderer.clone(), Rc::clone(&client), bus.clone());
    let updated = record_channel(&bus, Channel::DistancePlotUpdated);

    transport
        .respond(Endpoint::ComputeDistance, json!({ "values": [0.0, 0.4, 1.2] }))
        .respond(Endpoint::ComputeDistance, json!({ "values": [0.3, 0.1] }));

    let first = BrainLocation::Voxel { x: 1, y: 1, z: 1 };
    let second = BrainLocation::Voxel { x: 2, y: 2, z: 2 };
    assert_eq!(distance.show_distance(first, DistanceMetric::Euclidean).expect("first"), 0);
    assert_eq!(distance.show_distance(second, DistanceMetric::Cosine).expect("second"), 0);

    assert_eq!(renderer.trace_labels(), vec![DISTANCE_TRACE_LABEL]);
    assert_eq!(renderer.trace(0).expect("distance").y, vec![0.3, 0.1]);
    assert_eq!(renderer.trace(0).expect("distance").kind, TimeCourseKind::Distance);
    assert_eq!(distance.source(), Some((second, DistanceMetric::Cosine)));
    assert_eq!(updated.borrow().len(), 2);
    assert_eq!(updated.borrow()[1]["metric"], "cosine");

    bus.publish(Channel::TimeSliderChanged, json!({ "time_point": 1 }));
    assert_eq!(
        renderer.layout_value("time_marker"),
        Some(json!({ "x0": 1, "x1": 1 }))
    );

    assert!(distance.close().expect("close"));
    assert!(!distance.close().expect("close again"));
    assert!(renderer.is_empty());
}

#[test]
fn distance_plot_closes_on_context_switch() {
    let (client, transport, bus) = setup();
    let distance = DistancePlotCoordinator::new(NullRenderer::default(), Rc::clone(&client), bus.clone());
    let session = SessionController::new(Rc::clone(&client), bus.clone());

    transport.respond(Endpoint::ComputeDistance, json!({ "values": [1.0] }));
    distance
        .show_distance(BrainLocation::Voxel { x: 0, y: 0, z: 0 }, DistanceMetric::Correlation)
        .expect("show");
    assert!(distance.is_open());

    let report = session.switch_context("ctxB");
    assert!(report.is_clean());
    assert!(!distance.is_open());
    assert_eq!(distance.source(), None);
}

#[test]
fn analysis_completion_is_announced_with_its_context() {
    let (client, transport, bus) = setup();
    let analysis = AnalysisCoordinator::new(Rc::clone(&client), bus.clone());
    let completed = record_channel(&bus, Channel::AnalysisCompleted);
    client.set_context("ctxA");

    transport.respond(
        Endpoint::RunCorrelation,
        json!({ "message": "correlation map ready", "result": { "max": 0.8 } }),
    );
    let outcome = analysis
        .run_correlation(&CorrelationRequest {
            label: "ts1".to_owned(),
            negative_lag: 2,
            positive_lag: 2,
        })
        .expect("correlation");
    assert_eq!(outcome.message.as_deref(), Some("correlation map ready"));

    transport.respond(Endpoint::RunAverage, json!({}));
    analysis
        .run_average(&AverageRequest {
            left_edge: 1,
            right_edge: 4,
        })
        .expect("average");

    let completed = completed.borrow();
    assert_eq!(completed.len(), 2);
    assert_eq!(completed[0]["analysis"], "correlation");
    assert_eq!(completed[0]["result"]["max"], 0.8);
    assert_eq!(completed[0]["context_id"], "ctxA");
    assert_eq!(completed[1]["analysis"], "average");
}

#[test]
fn hrf_convolution_returns_a_task_regressor() {
    let (client, transport, bus) = setup();
    let analysis = AnalysisCoordinator::new(client, bus);
    transport.respond(
        Endpoint::ConvolveHrf,
        json!({ "label": "task_hrf", "values": [0.0, 0.2, 0.9] }),
    );

    let regressor = analysis
        .convolve_hrf(&HrfRequest {
            label: "task".to_owned(),
            delay: 6.0,
            dispersion: 1.0,
            undershoot: None,
        })
        .expect("hrf");

    assert_eq!(regressor.kind, TimeCourseKind::TaskRegressor);
    assert_eq!(regressor.label, "task_hrf");
}

#[test]
fn peaks_become_annotation_markers_on_the_plot() {
    let (client, transport, bus) = setup();
    let renderer = RecordingRenderer::new();
    let plot = TimeSeriesPlotCoordinator::new(renderer.clone(), Rc::clone(&client), bus.clone(), 0);
    let analysis = AnalysisCoordinator::new(Rc::clone(&client), bus.clone());

    transport
        .respond(Endpoint::FindPeaks, json!({ "peaks": [3, 8] }))
        .respond(Endpoint::GetAnnotationMarkers, json!({ "markers": [8] }))
        .respond(Endpoint::AddAnnotationMarker, json!({ "markers": [3, 8] }));

    let markers = analysis
        .find_peaks(&PeakFinderRequest {
            label: "ts1".to_owned(),
            zscore: true,
            height: None,
            prominence: Some(0.5),
            distance: None,
            width: None,
        })
        .expect("peaks");

    assert_eq!(markers, vec![3, 8]);
    assert_eq!(transport.request_count(Endpoint::AddAnnotationMarker), 1);
    assert_eq!(plot.annotation_markers().expect("markers"), vec![3, 8]);
    assert_eq!(renderer.layout_value("annotation_markers"), Some(json!([3, 8])));
}

#[test]
fn context_switch_reloads_every_surface_for_the_new_session() {
    let (client, transport, bus) = setup();
    let renderer = RecordingRenderer::with_background(&["anatomy"]);
    let plot = TimeSeriesPlotCoordinator::new(renderer.clone(), Rc::clone(&client), bus.clone(), 1);
    let colorbar = ColorbarCoordinator::new(Rc::clone(&client), bus.clone());
    let display = CoordinateDisplayCoordinator::new(Rc::clone(&client), bus.clone());
    let session = SessionController::new(Rc::clone(&client), bus.clone());

    transport
        .respond(
            Endpoint::GetTimecourses,
            json!({ "timecourses": [{ "label": "ts_b", "values": [1.0, 2.0] }] }),
        )
        .respond(Endpoint::GetFmriPlotOptions, fmri_options(-1.0, 1.0))
        .respond(Endpoint::GetTimepoint, json!({ "time_point": 0 }));

    let report = session.switch_context("ctxB");

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.delivered, 3);
    assert_eq!(session.context().as_str(), "ctxB");
    assert_eq!(plot.labels().expect("labels"), vec!["ts_b"]);
    assert_eq!(renderer.trace_labels(), vec!["anatomy", "ts_b"]);
    assert_eq!(colorbar.options().expect("options").color_min, -1.0);
    assert_eq!(display.readout().time_point, Some(0));
    assert!(
        transport
            .requests()
            .iter()
            .all(|request| request.context.as_str() == "ctxB")
    );
}

#[test]
fn teardown_releases_every_coordinator_subscription() {
    let (client, _transport, bus) = setup();
    let mut plot = TimeSeriesPlotCoordinator::new(NullRenderer::default(), Rc::clone(&client), bus.clone(), 0);
    let mut colorbar = ColorbarCoordinator::new(Rc::clone(&client), bus.clone());
    let mut display = CoordinateDisplayCoordinator::new(Rc::clone(&client), bus.clone());
    let distance = DistancePlotCoordinator::new(NullRenderer::default(), Rc::clone(&client), bus.clone());
    assert_eq!(bus.total_subscriptions(), 3 + 4 + 3 + 2);

    assert_eq!(plot.teardown(), 3);
    assert_eq!(colorbar.teardown(), 1);
    assert_eq!(display.teardown(), 3);
    drop(distance);

    assert_eq!(bus.total_subscriptions(), 0);
}
