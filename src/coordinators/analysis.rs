use std::rc::Rc;

use serde_json::{Value, json};
use tracing::info;

use crate::client::ContextManager;
use crate::client::contracts::{
    AnalysisOutcome, AverageRequest, CorrelationRequest, HrfRequest, PeakFinderRequest,
};
use crate::core::{ContextId, TimeCourse};
use crate::error::ViewerResult;
use crate::events::{Channel, EventBus};

/// Submits analysis jobs and announces their completion.
///
/// Peak finding writes the detected peaks back as annotation markers so the
/// time-series plot picks them up through `AnnotationMarkersChanged`.
pub struct AnalysisCoordinator {
    client: Rc<ContextManager>,
    bus: EventBus,
}

impl AnalysisCoordinator {
    #[must_use]
    pub fn new(client: Rc<ContextManager>, bus: EventBus) -> Self {
        Self { client, bus }
    }

    pub fn run_correlation(&self, params: &CorrelationRequest) -> ViewerResult<AnalysisOutcome> {
        let analysis = self.client.analysis();
        let outcome = analysis.run_correlation(params)?;
        self.announce("correlation", json!(params), &outcome.result, analysis.context());
        Ok(outcome)
    }

    pub fn run_average(&self, params: &AverageRequest) -> ViewerResult<AnalysisOutcome> {
        let analysis = self.client.analysis();
        let outcome = analysis.run_average(params)?;
        self.announce("average", json!(params), &outcome.result, analysis.context());
        Ok(outcome)
    }

    /// Returns the convolved regressor. Plotting it is left to the caller.
    pub fn convolve_hrf(&self, params: &HrfRequest) -> ViewerResult<TimeCourse> {
        let analysis = self.client.analysis();
        let time_course = analysis.convolve_hrf(params)?;
        self.announce(
            "hrf",
            json!(params),
            &json!({ "label": time_course.label }),
            analysis.context(),
        );
        Ok(time_course)
    }

    /// Detects peaks and stores each one as an annotation marker. Returns the
    /// resulting marker list.
    pub fn find_peaks(&self, params: &PeakFinderRequest) -> ViewerResult<Vec<usize>> {
        let context = self.client.context();
        let analysis = self.client.analysis_in(&context);
        let data = self.client.data_in(&context);

        let outcome = analysis.find_peaks(params)?;
        let mut markers = data.get_annotation_markers()?;
        for peak in &outcome.peaks {
            if !markers.contains(peak) {
                markers = data.add_annotation_marker(*peak)?;
            }
        }
        info!(label = %params.label, peaks = outcome.peaks.len(), "peak finder completed");

        self.announce("peak_finder", json!(params), &json!(outcome), &context);
        self.bus.publish(
            Channel::AnnotationMarkersChanged,
            json!({ "markers": markers, "context_id": context }),
        );
        Ok(markers)
    }

    fn announce(&self, kind: &str, params: Value, result: &Value, context: &ContextId) {
        self.bus.publish(
            Channel::AnalysisCompleted,
            json!({
                "analysis": kind,
                "params": params,
                "result": result,
                "context_id": context,
            }),
        );
    }
}
