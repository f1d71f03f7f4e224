use crate::core::ContextId;
use crate::error::{ViewerError, ViewerResult};

use super::context_manager::Binding;
use super::contracts::PreprocessingParams;
use super::request::Endpoint;

/// Preprocessing submissions bound to one context.
pub struct PreprocessingApi<'a> {
    binding: Binding<'a>,
}

impl<'a> PreprocessingApi<'a> {
    pub(crate) fn new(binding: Binding<'a>) -> Self {
        Self { binding }
    }

    #[must_use]
    pub fn context(&self) -> &ContextId {
        self.binding.context()
    }

    pub fn run_fmri_preprocessing(&self, params: &PreprocessingParams) -> ViewerResult<()> {
        params.validate()?;
        let request = self
            .binding
            .request(Endpoint::RunFmriPreprocessing)
            .with_json("params", params)?;
        self.binding.send(&request)
    }

    pub fn run_timecourse_preprocessing(
        &self,
        labels: &[String],
        params: &PreprocessingParams,
    ) -> ViewerResult<()> {
        if labels.is_empty() {
            return Err(ViewerError::InvalidData(
                "select at least one time course to preprocess".to_owned(),
            ));
        }
        params.validate()?;
        let request = self
            .binding
            .request(Endpoint::RunTimecoursePreprocessing)
            .with_json("labels", &labels)?
            .with_json("params", params)?;
        self.binding.send(&request)
    }

    pub fn reset_fmri_preprocessing(&self) -> ViewerResult<()> {
        let request = self.binding.request(Endpoint::ResetFmriPreprocessing);
        self.binding.send(&request)
    }

    pub fn reset_timecourse_preprocessing(&self) -> ViewerResult<()> {
        let request = self.binding.request(Endpoint::ResetTimecoursePreprocessing);
        self.binding.send(&request)
    }
}
