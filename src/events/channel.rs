use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named category of occurrence carried on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    ContextChanged,
    TimeSliderChanged,
    LocationChanged,
    FmriTimecourseAdded,
    FmriTimecourseRemoved,
    FmriTimecoursesCleared,
    TimecoursesReloaded,
    TimecourseShiftChanged,
    TimecourseScaleChanged,
    PreprocessingApplied,
    PreprocessingReset,
    PlotOptionsChanged,
    AnnotationMarkersChanged,
    AnnotationMarkerMoved,
    AnalysisCompleted,
    DistancePlotUpdated,
}

impl Channel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContextChanged => "context_changed",
            Self::TimeSliderChanged => "time_slider_changed",
            Self::LocationChanged => "location_changed",
            Self::FmriTimecourseAdded => "fmri_timecourse_added",
            Self::FmriTimecourseRemoved => "fmri_timecourse_removed",
            Self::FmriTimecoursesCleared => "fmri_timecourses_cleared",
            Self::TimecoursesReloaded => "timecourses_reloaded",
            Self::TimecourseShiftChanged => "timecourse_shift_changed",
            Self::TimecourseScaleChanged => "timecourse_scale_changed",
            Self::PreprocessingApplied => "preprocessing_applied",
            Self::PreprocessingReset => "preprocessing_reset",
            Self::PlotOptionsChanged => "plot_options_changed",
            Self::AnnotationMarkersChanged => "annotation_markers_changed",
            Self::AnnotationMarkerMoved => "annotation_marker_moved",
            Self::AnalysisCompleted => "analysis_completed",
            Self::DistancePlotUpdated => "distance_plot_updated",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published occurrence. `payload` is `Value::Null` when none was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub channel: Channel,
    pub payload: Value,
}

impl Event {
    #[must_use]
    pub fn new(channel: Channel, payload: Value) -> Self {
        Self { channel, payload }
    }

    /// Reads a string field from an object payload.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Reads an unsigned integer field from an object payload.
    #[must_use]
    pub fn usize_field(&self, key: &str) -> Option<usize> {
        self.payload
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|value| usize::try_from(value).ok())
    }
}
