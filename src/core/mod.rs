pub mod context;
pub mod generation;
pub mod json_contract;
pub mod timecourse;
pub mod trace_registry;

pub use context::{ContextId, MAIN_CONTEXT_ID};
pub use generation::{ActionGenerations, ActionTicket};
pub use json_contract::{TRACE_REGISTRY_JSON_SCHEMA_V1, TraceRegistryJsonContractV1};
pub use timecourse::{BrainLocation, Hemisphere, TimeCourse, TimeCourseKind, TraceData};
pub use trace_registry::{
    TraceAllocation, TraceIndexRegistry, TraceRegistrySnapshot, TraceRemoval,
};
