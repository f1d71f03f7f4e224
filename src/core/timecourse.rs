use serde::{Deserialize, Serialize};

/// Origin of a plotted time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeCourseKind {
    /// Time course loaded by the user alongside the imaging data.
    #[default]
    Input,
    /// Task design regressor.
    TaskRegressor,
    /// Time course extracted from the functional image at a selected location.
    Fmri,
    /// Distance from a reference time course to every time point.
    Distance,
}

/// Spatial selection inside the loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrainLocation {
    /// Voxel coordinates in a volumetric (nifti) image.
    Voxel { x: usize, y: usize, z: usize },
    /// Vertex index on a surface (gifti) mesh.
    Vertex {
        index: usize,
        hemisphere: Hemisphere,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCourse {
    pub label: String,
    #[serde(default)]
    pub kind: TimeCourseKind,
    pub values: Vec<f64>,
}

impl TimeCourse {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: TimeCourseKind, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            kind,
            values,
        }
    }
}

/// Data handed to the rendering collaborator for one trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceData {
    pub label: String,
    pub kind: TimeCourseKind,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl TraceData {
    /// Plots values against their time point index.
    #[must_use]
    pub fn from_time_course(time_course: &TimeCourse) -> Self {
        Self {
            label: time_course.label.clone(),
            kind: time_course.kind,
            x: (0..time_course.values.len()).map(|i| i as f64).collect(),
            y: time_course.values.clone(),
        }
    }
}
