//! neuroviz-sync: client-side coordination core of a neuroimaging viewer.
//!
//! The crate keeps several independently rendered surfaces (time-series
//! plot, colorbar, coordinate readout, distance plot) consistent with a
//! remote analysis backend. Plotted series are tracked by a
//! `TraceIndexRegistry` that mirrors the renderer's append/delete-shift trace
//! list, surfaces talk to each other only through the synchronous `EventBus`,
//! and every backend call is bound to the current session by the
//! `ContextManager`.

pub mod client;
pub mod coordinators;
pub mod core;
pub mod error;
pub mod events;
pub mod render;
pub mod telemetry;

pub use client::{ClientConfig, ContextManager, RecordingTransport, Transport};
pub use coordinators::{SessionController, TimeSeriesPlotCoordinator};
pub use crate::core::{ContextId, TraceIndexRegistry};
pub use error::{ViewerError, ViewerResult};
pub use events::{Channel, EventBus};
