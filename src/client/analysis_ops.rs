use crate::core::{ContextId, TimeCourse, TimeCourseKind};
use crate::error::ViewerResult;

use super::context_manager::Binding;
use super::contracts::{
    AnalysisOutcome, AverageRequest, CorrelationRequest, DistanceOutcome, DistanceRequest,
    HrfRequest, PeakFinderOutcome, PeakFinderRequest,
};
use super::request::Endpoint;

/// Analysis submissions bound to one context. The computation runs remotely.
pub struct AnalysisApi<'a> {
    binding: Binding<'a>,
}

impl<'a> AnalysisApi<'a> {
    pub(crate) fn new(binding: Binding<'a>) -> Self {
        Self { binding }
    }

    #[must_use]
    pub fn context(&self) -> &ContextId {
        self.binding.context()
    }

    pub fn run_correlation(&self, params: &CorrelationRequest) -> ViewerResult<AnalysisOutcome> {
        let request = self
            .binding
            .request(Endpoint::RunCorrelation)
            .with_json("params", params)?;
        self.binding.call(&request)
    }

    pub fn run_average(&self, params: &AverageRequest) -> ViewerResult<AnalysisOutcome> {
        params.validate()?;
        let request = self
            .binding
            .request(Endpoint::RunAverage)
            .with_json("params", params)?;
        self.binding.call(&request)
    }

    pub fn find_peaks(&self, params: &PeakFinderRequest) -> ViewerResult<PeakFinderOutcome> {
        let request = self
            .binding
            .request(Endpoint::FindPeaks)
            .with_json("params", params)?;
        self.binding.call(&request)
    }

    pub fn compute_distance(&self, params: &DistanceRequest) -> ViewerResult<DistanceOutcome> {
        let request = self
            .binding
            .request(Endpoint::ComputeDistance)
            .with_json("params", params)?;
        self.binding.call(&request)
    }

    /// Convolves a task regressor with a haemodynamic response function.
    pub fn convolve_hrf(&self, params: &HrfRequest) -> ViewerResult<TimeCourse> {
        let request = self
            .binding
            .request(Endpoint::ConvolveHrf)
            .with_json("params", params)?;
        let mut time_course: TimeCourse = self.binding.call(&request)?;
        time_course.kind = TimeCourseKind::TaskRegressor;
        Ok(time_course)
    }
}
