use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ContextId;
use crate::error::{ViewerError, ViewerResult};

/// Name of the field every request carries last.
pub const CONTEXT_FIELD: &str = "context_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Backend resource area an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityGroup {
    Data,
    PlotOptions,
    Analysis,
    Preprocessing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    GetTimecourses,
    GetFmriTimecourse,
    AddFmriTimecourse,
    RemoveFmriTimecourse,
    PopFmriTimecourse,
    RemoveAllFmriTimecourses,
    GetTimepoint,
    UpdateTimepoint,
    UpdateLocation,
    GetWorldCoords,
    GetAnnotationMarkers,
    AddAnnotationMarker,
    MoveAnnotationMarker,
    RemoveAnnotationMarker,
    ClearAnnotationMarkers,
    GetFmriPlotOptions,
    UpdateFmriPlotOptions,
    GetTimecoursePlotOptions,
    UpdateTimecoursePlotOptions,
    UpdateTimecourseShift,
    UpdateTimecourseScale,
    RunCorrelation,
    RunAverage,
    FindPeaks,
    ComputeDistance,
    ConvolveHrf,
    RunFmriPreprocessing,
    RunTimecoursePreprocessing,
    ResetFmriPreprocessing,
    ResetTimecoursePreprocessing,
}

impl Endpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::GetTimecourses => "/get_timecourses",
            Self::GetFmriTimecourse => "/get_fmri_timecourse",
            Self::AddFmriTimecourse => "/add_fmri_timecourse",
            Self::RemoveFmriTimecourse => "/remove_fmri_timecourse",
            Self::PopFmriTimecourse => "/pop_fmri_timecourse",
            Self::RemoveAllFmriTimecourses => "/remove_fmri_timecourses",
            Self::GetTimepoint => "/get_timepoint",
            Self::UpdateTimepoint => "/update_timepoint",
            Self::UpdateLocation => "/update_location",
            Self::GetWorldCoords => "/get_world_coords",
            Self::GetAnnotationMarkers => "/get_annotation_markers",
            Self::AddAnnotationMarker => "/add_annotation_marker",
            Self::MoveAnnotationMarker => "/move_annotation_marker",
            Self::RemoveAnnotationMarker => "/remove_annotation_marker",
            Self::ClearAnnotationMarkers => "/clear_annotation_markers",
            Self::GetFmriPlotOptions => "/get_fmri_plot_options",
            Self::UpdateFmriPlotOptions => "/update_fmri_plot_options",
            Self::GetTimecoursePlotOptions => "/get_timecourse_plot_options",
            Self::UpdateTimecoursePlotOptions => "/update_timecourse_plot_options",
            Self::UpdateTimecourseShift => "/update_timecourse_shift",
            Self::UpdateTimecourseScale => "/update_timecourse_scale",
            Self::RunCorrelation => "/run_correlation",
            Self::RunAverage => "/run_average",
            Self::FindPeaks => "/find_peaks",
            Self::ComputeDistance => "/compute_distance",
            Self::ConvolveHrf => "/convolve_hrf",
            Self::RunFmriPreprocessing => "/run_fmri_preprocessing",
            Self::RunTimecoursePreprocessing => "/run_timecourse_preprocessing",
            Self::ResetFmriPreprocessing => "/reset_fmri_preprocessing",
            Self::ResetTimecoursePreprocessing => "/reset_timecourse_preprocessing",
        }
    }

    #[must_use]
    pub const fn method(self) -> HttpMethod {
        match self {
            Self::GetTimecourses
            | Self::GetFmriTimecourse
            | Self::GetTimepoint
            | Self::GetWorldCoords
            | Self::GetAnnotationMarkers
            | Self::GetFmriPlotOptions
            | Self::GetTimecoursePlotOptions => HttpMethod::Get,
            _ => HttpMethod::Post,
        }
    }

    #[must_use]
    pub const fn group(self) -> CapabilityGroup {
        match self {
            Self::GetFmriPlotOptions
            | Self::UpdateFmriPlotOptions
            | Self::GetTimecoursePlotOptions
            | Self::UpdateTimecoursePlotOptions
            | Self::UpdateTimecourseShift
            | Self::UpdateTimecourseScale => CapabilityGroup::PlotOptions,
            Self::RunCorrelation
            | Self::RunAverage
            | Self::FindPeaks
            | Self::ComputeDistance
            | Self::ConvolveHrf => CapabilityGroup::Analysis,
            Self::RunFmriPreprocessing
            | Self::RunTimecoursePreprocessing
            | Self::ResetFmriPreprocessing
            | Self::ResetTimecoursePreprocessing => CapabilityGroup::Preprocessing,
            _ => CapabilityGroup::Data,
        }
    }
}

/// One request field before transport encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RequestField {
    Text(String),
    /// Serialized to a JSON string before transmission.
    Json(Value),
}

impl RequestField {
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }
}

/// Transport-independent description of one backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub context: ContextId,
    fields: IndexMap<String, RequestField>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(endpoint: Endpoint, context: ContextId) -> Self {
        Self {
            endpoint,
            context,
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.endpoint.method()
    }

    #[must_use]
    pub fn with_text(mut self, key: &str, value: impl ToString) -> Self {
        self.fields
            .insert(key.to_owned(), RequestField::Text(value.to_string()));
        self
    }

    #[must_use]
    pub fn with_json_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_owned(), RequestField::Json(value));
        self
    }

    pub fn with_json<T: Serialize>(self, key: &str, value: &T) -> ViewerResult<Self> {
        let value = serde_json::to_value(value).map_err(|e| {
            ViewerError::InvalidData(format!(
                "failed to serialize field `{key}` for {}: {e}",
                self.endpoint.path()
            ))
        })?;
        Ok(self.with_json_value(key, value))
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&RequestField> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &RequestField)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    /// Key/value pairs as sent on the wire: query parameters for GET, form
    /// body for POST. `context_id` is always the final pair.
    #[must_use]
    pub fn encoded_fields(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != CONTEXT_FIELD)
            .map(|(key, field)| (key.clone(), field.encode()))
            .collect();
        pairs.push((CONTEXT_FIELD.to_owned(), self.context.as_str().to_owned()));
        pairs
    }
}
