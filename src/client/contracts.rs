//! Request parameter and response payload shapes exchanged with the backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{BrainLocation, TimeCourse, TimeCourseKind};
use crate::error::{ViewerError, ViewerResult};

/// Response of `get_timecourses`: user inputs followed by task regressors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TimeCourseBundle {
    #[serde(default)]
    pub timecourses: Vec<TimeCourse>,
    #[serde(default)]
    pub task_regressors: Vec<TimeCourse>,
}

impl TimeCourseBundle {
    /// Flattens into plot order with kinds assigned from the section each
    /// series came from.
    #[must_use]
    pub fn into_time_courses(self) -> Vec<TimeCourse> {
        let inputs = self.timecourses.into_iter().map(|mut tc| {
            if tc.kind == TimeCourseKind::TaskRegressor {
                tc.kind = TimeCourseKind::Input;
            }
            tc
        });
        let regressors = self.task_regressors.into_iter().map(|mut tc| {
            tc.kind = TimeCourseKind::TaskRegressor;
            tc
        });
        inputs.chain(regressors).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PoppedTimecourse {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimepointResponse {
    pub time_point: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldCoords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnnotationMarkers {
    #[serde(default)]
    pub markers: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmriPlotOptions {
    pub color_min: f64,
    pub color_max: f64,
    #[serde(default = "default_colormap")]
    pub colormap: String,
    #[serde(default)]
    pub threshold_min: Option<f64>,
    #[serde(default)]
    pub threshold_max: Option<f64>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Options this client does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimecoursePlotOptions {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_line_width")]
    pub width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub constant_shift: f64,
    #[serde(default)]
    pub time_shift: i64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Offset applied to a plotted time course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TimecourseShift {
    /// Added to every value.
    Constant(f64),
    /// Moves the series along the time axis by whole time points.
    TimePoints(i64),
}

/// Response of shift/scale updates: the series as it should now be drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimecourseUpdate {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRequest {
    pub label: String,
    pub negative_lag: usize,
    pub positive_lag: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageRequest {
    pub left_edge: usize,
    pub right_edge: usize,
}

impl AverageRequest {
    pub fn validate(&self) -> ViewerResult<()> {
        if self.left_edge >= self.right_edge {
            return Err(ViewerError::InvalidData(format!(
                "average window left edge {} must be < right edge {}",
                self.left_edge, self.right_edge
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakFinderRequest {
    pub label: String,
    #[serde(default)]
    pub zscore: bool,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub prominence: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Euclidean,
    Cosine,
    Correlation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRequest {
    pub location: BrainLocation,
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrfRequest {
    pub label: String,
    pub delay: f64,
    pub dispersion: f64,
    #[serde(default)]
    pub undershoot: Option<f64>,
}

/// Acknowledgement of an analysis job whose result the backend keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisOutcome {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PeakFinderOutcome {
    #[serde(default)]
    pub peaks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DistanceOutcome {
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
    Zscore,
    Mean,
    PercentChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandpassFilter {
    /// Repetition time in seconds.
    pub tr: f64,
    pub low_cut: Option<f64>,
    pub high_cut: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PreprocessingParams {
    #[serde(default)]
    pub normalize: Option<NormalizeMethod>,
    #[serde(default)]
    pub filter: Option<BandpassFilter>,
    #[serde(default)]
    pub detrend: bool,
    #[serde(default)]
    pub smoothing_fwhm: Option<f64>,
}

impl PreprocessingParams {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.normalize.is_none()
            && self.filter.is_none()
            && !self.detrend
            && self.smoothing_fwhm.is_none()
    }

    /// Local checks run before anything is submitted.
    pub fn validate(&self) -> ViewerResult<()> {
        if self.is_noop() {
            return Err(ViewerError::InvalidData(
                "no preprocessing step selected".to_owned(),
            ));
        }
        if let Some(filter) = self.filter {
            if !filter.tr.is_finite() || filter.tr <= 0.0 {
                return Err(ViewerError::InvalidData(
                    "filter repetition time must be finite and > 0".to_owned(),
                ));
            }
            if filter.low_cut.is_none() && filter.high_cut.is_none() {
                return Err(ViewerError::InvalidData(
                    "filter needs a low cut, a high cut or both".to_owned(),
                ));
            }
            let nyquist = 0.5 / filter.tr;
            for cut in [filter.low_cut, filter.high_cut].into_iter().flatten() {
                if !cut.is_finite() || cut <= 0.0 || cut >= nyquist {
                    return Err(ViewerError::InvalidData(format!(
                        "filter cutoff {cut} must lie in (0, {nyquist})"
                    )));
                }
            }
            if let (Some(low), Some(high)) = (filter.low_cut, filter.high_cut) {
                if low >= high {
                    return Err(ViewerError::InvalidData(format!(
                        "filter low cut {low} must be < high cut {high}"
                    )));
                }
            }
        }
        if let Some(fwhm) = self.smoothing_fwhm {
            if !fwhm.is_finite() || fwhm <= 0.0 {
                return Err(ViewerError::InvalidData(
                    "smoothing fwhm must be finite and > 0".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

fn default_colormap() -> String {
    "viridis".to_owned()
}

fn default_opacity() -> f64 {
    1.0
}

fn default_line_width() -> f64 {
    2.0
}

fn default_visible() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}
