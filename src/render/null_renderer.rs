use serde_json::Value;

use crate::core::TraceData;
use crate::error::{ViewerError, ViewerResult};
use crate::render::PlotRenderer;

/// No-op renderer for headless coordinator usage.
///
/// It still tracks the trace count so out-of-range indices are caught before
/// a real plotting backend is attached.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub trace_count: usize,
}

impl PlotRenderer for NullRenderer {
    fn add_trace(&mut self, _trace: &TraceData, at_index: usize) -> ViewerResult<()> {
        if at_index != self.trace_count {
            return Err(ViewerError::InvalidRenderIndex {
                index: at_index,
                len: self.trace_count,
            });
        }
        self.trace_count += 1;
        Ok(())
    }

    fn delete_trace(&mut self, at_index: usize) -> ViewerResult<()> {
        if at_index >= self.trace_count {
            return Err(ViewerError::InvalidRenderIndex {
                index: at_index,
                len: self.trace_count,
            });
        }
        self.trace_count -= 1;
        Ok(())
    }

    fn restyle(&mut self, _props: &Value, at_index: usize) -> ViewerResult<()> {
        if at_index >= self.trace_count {
            return Err(ViewerError::InvalidRenderIndex {
                index: at_index,
                len: self.trace_count,
            });
        }
        Ok(())
    }

    fn relayout(&mut self, _props: &Value) -> ViewerResult<()> {
        Ok(())
    }
}
