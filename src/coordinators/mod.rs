//! Per-surface coordinators.
//!
//! Each coordinator owns the state of one UI surface, talks to the backend
//! through a shared `ContextManager` and learns about changes made elsewhere
//! only through the `EventBus`. Surfaces that draw traces own their own
//! `TraceIndexRegistry` and renderer.

mod analysis;
mod colorbar;
mod coordinate_display;
mod distance_plot;
mod session;
mod timeseries_plot;

pub use analysis::AnalysisCoordinator;
pub use colorbar::ColorbarCoordinator;
pub use coordinate_display::{CoordinateDisplayCoordinator, CoordinateReadout};
pub use distance_plot::{DISTANCE_TRACE_LABEL, DistancePlotCoordinator};
pub use session::SessionController;
pub use timeseries_plot::{PlotAction, PreprocessingTarget, TimeSeriesPlotCoordinator};
