use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{TimeCourseKind, TraceData};
use crate::error::{ViewerError, ViewerResult};
use crate::render::PlotRenderer;

/// One command as received by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    AddTrace { label: String, at_index: usize },
    DeleteTrace { at_index: usize },
    Restyle { at_index: usize, props: Value },
    Relayout { props: Value },
}

#[derive(Debug, Default)]
struct RenderLog {
    traces: Vec<TraceData>,
    commands: Vec<RenderCommand>,
    layout: Map<String, Value>,
}

/// Renderer that keeps its own ordered trace list with the plotting library's
/// append/delete-shift semantics and records every command.
///
/// Clones share state, so a test can keep a handle while a coordinator owns
/// the renderer.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Rc<RefCell<RenderLog>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with fixed background traces occupying the lowest positions.
    #[must_use]
    pub fn with_background(labels: &[&str]) -> Self {
        let renderer = Self::default();
        renderer.log.borrow_mut().traces = labels
            .iter()
            .map(|label| TraceData {
                label: (*label).to_owned(),
                kind: TimeCourseKind::Input,
                x: Vec::new(),
                y: Vec::new(),
            })
            .collect();
        renderer
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.borrow().traces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.borrow().traces.is_empty()
    }

    #[must_use]
    pub fn trace_labels(&self) -> Vec<String> {
        self.log
            .borrow()
            .traces
            .iter()
            .map(|trace| trace.label.clone())
            .collect()
    }

    #[must_use]
    pub fn trace(&self, index: usize) -> Option<TraceData> {
        self.log.borrow().traces.get(index).cloned()
    }

    #[must_use]
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.log.borrow().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.log.borrow_mut().commands.clear();
    }

    #[must_use]
    pub fn layout(&self) -> Map<String, Value> {
        self.log.borrow().layout.clone()
    }

    #[must_use]
    pub fn layout_value(&self, key: &str) -> Option<Value> {
        self.log.borrow().layout.get(key).cloned()
    }
}

impl PlotRenderer for RecordingRenderer {
    fn add_trace(&mut self, trace: &TraceData, at_index: usize) -> ViewerResult<()> {
        let mut log = self.log.borrow_mut();
        if at_index != log.traces.len() {
            return Err(ViewerError::InvalidRenderIndex {
                index: at_index,
                len: log.traces.len(),
            });
        }
        log.traces.push(trace.clone());
        log.commands.push(RenderCommand::AddTrace {
            label: trace.label.clone(),
            at_index,
        });
        Ok(())
    }

    fn delete_trace(&mut self, at_index: usize) -> ViewerResult<()> {
        let mut log = self.log.borrow_mut();
        if at_index >= log.traces.len() {
            return Err(ViewerError::InvalidRenderIndex {
                index: at_index,
                len: log.traces.len(),
            });
        }
        log.traces.remove(at_index);
        log.commands.push(RenderCommand::DeleteTrace { at_index });
        Ok(())
    }

    fn restyle(&mut self, props: &Value, at_index: usize) -> ViewerResult<()> {
        let mut log = self.log.borrow_mut();
        let len = log.traces.len();
        let trace = log
            .traces
            .get_mut(at_index)
            .ok_or(ViewerError::InvalidRenderIndex {
                index: at_index,
                len,
            })?;
        if let Some(y) = props.get("y").and_then(Value::as_array) {
            trace.y = y.iter().filter_map(Value::as_f64).collect();
        }
        if let Some(x) = props.get("x").and_then(Value::as_array) {
            trace.x = x.iter().filter_map(Value::as_f64).collect();
        }
        log.commands.push(RenderCommand::Restyle {
            at_index,
            props: props.clone(),
        });
        Ok(())
    }

    fn relayout(&mut self, props: &Value) -> ViewerResult<()> {
        let Some(update) = props.as_object() else {
            return Err(ViewerError::InvalidData(
                "relayout props must be a json object".to_owned(),
            ));
        };
        let mut log = self.log.borrow_mut();
        for (key, value) in update {
            log.layout.insert(key.clone(), value.clone());
        }
        log.commands.push(RenderCommand::Relayout {
            props: props.clone(),
        });
        Ok(())
    }
}
