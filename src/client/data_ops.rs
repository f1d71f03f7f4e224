use crate::core::{BrainLocation, ContextId, TimeCourse, TimeCourseKind};
use crate::error::ViewerResult;

use super::context_manager::Binding;
use super::contracts::{
    AnnotationMarkers, PoppedTimecourse, TimeCourseBundle, TimepointResponse, WorldCoords,
};
use super::request::{ApiRequest, Endpoint};

/// Data retrieval and mutation calls bound to one context.
pub struct DataApi<'a> {
    binding: Binding<'a>,
}

impl<'a> DataApi<'a> {
    pub(crate) fn new(binding: Binding<'a>) -> Self {
        Self { binding }
    }

    #[must_use]
    pub fn context(&self) -> &ContextId {
        self.binding.context()
    }

    /// Loaded input time courses followed by task regressors, in plot order.
    pub fn get_timecourses(&self) -> ViewerResult<Vec<TimeCourse>> {
        let request = self.binding.request(Endpoint::GetTimecourses);
        let bundle: TimeCourseBundle = self.binding.call(&request)?;
        Ok(bundle.into_time_courses())
    }

    /// Previews the time course at `location` without adding it to the plot.
    pub fn get_fmri_timecourse(&self, location: BrainLocation) -> ViewerResult<TimeCourse> {
        let request = self
            .binding
            .request(Endpoint::GetFmriTimecourse)
            .with_json("location", &location)?;
        self.fmri_time_course(&request)
    }

    /// Stores the time course at `location`; the backend assigns its label.
    pub fn add_fmri_timecourse(&self, location: BrainLocation) -> ViewerResult<TimeCourse> {
        let request = self
            .binding
            .request(Endpoint::AddFmriTimecourse)
            .with_json("location", &location)?;
        self.fmri_time_course(&request)
    }

    pub fn remove_fmri_timecourse(&self, label: &str) -> ViewerResult<()> {
        let request = self
            .binding
            .request(Endpoint::RemoveFmriTimecourse)
            .with_text("label", label);
        self.binding.send(&request)
    }

    /// Drops the most recently added fMRI time course. Returns its label, or
    /// `None` when there was nothing to pop.
    pub fn pop_fmri_timecourse(&self) -> ViewerResult<Option<String>> {
        let request = self.binding.request(Endpoint::PopFmriTimecourse);
        let popped: PoppedTimecourse = self.binding.call(&request)?;
        Ok(popped.label)
    }

    pub fn remove_all_fmri_timecourses(&self) -> ViewerResult<()> {
        let request = self.binding.request(Endpoint::RemoveAllFmriTimecourses);
        self.binding.send(&request)
    }

    pub fn get_timepoint(&self) -> ViewerResult<usize> {
        let request = self.binding.request(Endpoint::GetTimepoint);
        let response: TimepointResponse = self.binding.call(&request)?;
        Ok(response.time_point)
    }

    pub fn update_timepoint(&self, time_point: usize) -> ViewerResult<()> {
        let request = self
            .binding
            .request(Endpoint::UpdateTimepoint)
            .with_text("time_point", time_point);
        self.binding.send(&request)
    }

    pub fn update_location(&self, location: BrainLocation) -> ViewerResult<()> {
        let request = self
            .binding
            .request(Endpoint::UpdateLocation)
            .with_json("location", &location)?;
        self.binding.send(&request)
    }

    pub fn get_world_coords(&self, location: BrainLocation) -> ViewerResult<WorldCoords> {
        let request = self
            .binding
            .request(Endpoint::GetWorldCoords)
            .with_json("location", &location)?;
        self.binding.call(&request)
    }

    pub fn get_annotation_markers(&self) -> ViewerResult<Vec<usize>> {
        let request = self.binding.request(Endpoint::GetAnnotationMarkers);
        self.markers(&request)
    }

    /// Adds a marker and returns the updated marker list.
    pub fn add_annotation_marker(&self, time_point: usize) -> ViewerResult<Vec<usize>> {
        let request = self
            .binding
            .request(Endpoint::AddAnnotationMarker)
            .with_text("time_point", time_point);
        self.markers(&request)
    }

    pub fn move_annotation_marker(&self, from: usize, to: usize) -> ViewerResult<Vec<usize>> {
        let request = self
            .binding
            .request(Endpoint::MoveAnnotationMarker)
            .with_text("from", from)
            .with_text("to", to);
        self.markers(&request)
    }

    pub fn remove_annotation_marker(&self, time_point: usize) -> ViewerResult<Vec<usize>> {
        let request = self
            .binding
            .request(Endpoint::RemoveAnnotationMarker)
            .with_text("time_point", time_point);
        self.markers(&request)
    }

    pub fn clear_annotation_markers(&self) -> ViewerResult<()> {
        let request = self.binding.request(Endpoint::ClearAnnotationMarkers);
        self.binding.send(&request)
    }

    fn fmri_time_course(&self, request: &ApiRequest) -> ViewerResult<TimeCourse> {
        let mut time_course: TimeCourse = self.binding.call(request)?;
        time_course.kind = TimeCourseKind::Fmri;
        Ok(time_course)
    }

    fn markers(&self, request: &ApiRequest) -> ViewerResult<Vec<usize>> {
        let markers: AnnotationMarkers = self.binding.call(request)?;
        Ok(markers.markers)
    }
}
