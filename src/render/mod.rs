mod null_renderer;
mod recording_renderer;

pub use null_renderer::NullRenderer;
pub use recording_renderer::{RecordingRenderer, RenderCommand};

use serde_json::Value;

use crate::core::TraceData;
use crate::error::ViewerResult;

/// Contract of the external plotting library.
///
/// Traces form an ordered list. `add_trace` appends at `at_index`, which must
/// equal the current length; `delete_trace(k)` removes position `k` and
/// shifts every later trace down by one. `TraceIndexRegistry` mirrors exactly
/// this behavior.
pub trait PlotRenderer {
    fn add_trace(&mut self, trace: &TraceData, at_index: usize) -> ViewerResult<()>;
    fn delete_trace(&mut self, at_index: usize) -> ViewerResult<()>;
    fn restyle(&mut self, props: &Value, at_index: usize) -> ViewerResult<()>;
    fn relayout(&mut self, props: &Value) -> ViewerResult<()>;
}

impl<R: PlotRenderer + ?Sized> PlotRenderer for Box<R> {
    fn add_trace(&mut self, trace: &TraceData, at_index: usize) -> ViewerResult<()> {
        (**self).add_trace(trace, at_index)
    }

    fn delete_trace(&mut self, at_index: usize) -> ViewerResult<()> {
        (**self).delete_trace(at_index)
    }

    fn restyle(&mut self, props: &Value, at_index: usize) -> ViewerResult<()> {
        (**self).restyle(props, at_index)
    }

    fn relayout(&mut self, props: &Value) -> ViewerResult<()> {
        (**self).relayout(props)
    }
}
