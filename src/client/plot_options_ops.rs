use serde_json::Value;

use crate::core::ContextId;
use crate::error::{ViewerError, ViewerResult};

use super::context_manager::Binding;
use super::contracts::{FmriPlotOptions, TimecoursePlotOptions, TimecourseShift, TimecourseUpdate};
use super::request::Endpoint;

/// Plot-option retrieval and mutation calls bound to one context.
pub struct PlotOptionsApi<'a> {
    binding: Binding<'a>,
}

impl<'a> PlotOptionsApi<'a> {
    pub(crate) fn new(binding: Binding<'a>) -> Self {
        Self { binding }
    }

    #[must_use]
    pub fn context(&self) -> &ContextId {
        self.binding.context()
    }

    pub fn get_fmri_plot_options(&self) -> ViewerResult<FmriPlotOptions> {
        let request = self.binding.request(Endpoint::GetFmriPlotOptions);
        self.binding.call(&request)
    }

    /// Applies a partial update and returns the resulting options.
    pub fn update_fmri_plot_options(&self, patch: Value) -> ViewerResult<FmriPlotOptions> {
        let request = self
            .binding
            .request(Endpoint::UpdateFmriPlotOptions)
            .with_json_value("plot_options", require_object(patch)?);
        self.binding.call(&request)
    }

    pub fn get_timecourse_plot_options(&self, label: &str) -> ViewerResult<TimecoursePlotOptions> {
        let request = self
            .binding
            .request(Endpoint::GetTimecoursePlotOptions)
            .with_text("label", label);
        self.binding.call(&request)
    }

    pub fn update_timecourse_plot_options(
        &self,
        label: &str,
        patch: Value,
    ) -> ViewerResult<TimecoursePlotOptions> {
        let request = self
            .binding
            .request(Endpoint::UpdateTimecoursePlotOptions)
            .with_text("label", label)
            .with_json_value("plot_options", require_object(patch)?);
        self.binding.call(&request)
    }

    pub fn update_timecourse_shift(
        &self,
        label: &str,
        shift: TimecourseShift,
    ) -> ViewerResult<TimecourseUpdate> {
        let request = self
            .binding
            .request(Endpoint::UpdateTimecourseShift)
            .with_text("label", label)
            .with_json("shift", &shift)?;
        self.binding.call(&request)
    }

    pub fn update_timecourse_scale(&self, label: &str, scale: f64) -> ViewerResult<TimecourseUpdate> {
        if !scale.is_finite() {
            return Err(ViewerError::InvalidData(
                "time course scale must be finite".to_owned(),
            ));
        }
        let request = self
            .binding
            .request(Endpoint::UpdateTimecourseScale)
            .with_text("label", label)
            .with_text("scale", scale);
        self.binding.call(&request)
    }
}

fn require_object(patch: Value) -> ViewerResult<Value> {
    if patch.is_object() {
        Ok(patch)
    } else {
        Err(ViewerError::InvalidData(
            "plot option patch must be a json object".to_owned(),
        ))
    }
}
