use serde::{Deserialize, Serialize};

use crate::error::{ViewerError, ViewerResult};

use super::{TraceIndexRegistry, TraceRegistrySnapshot};

pub const TRACE_REGISTRY_JSON_SCHEMA_V1: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRegistryJsonContractV1 {
    pub schema_version: u32,
    pub registry: TraceRegistrySnapshot,
}

impl TraceRegistrySnapshot {
    pub fn to_json_contract_v1_pretty(&self) -> ViewerResult<String> {
        let payload = TraceRegistryJsonContractV1 {
            schema_version: TRACE_REGISTRY_JSON_SCHEMA_V1,
            registry: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ViewerError::InvalidData(format!("failed to serialize registry contract v1: {e}"))
        })
    }

    /// Accepts either a bare snapshot or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> ViewerResult<Self> {
        if let Ok(snapshot) = serde_json::from_str::<TraceRegistrySnapshot>(input) {
            return Ok(snapshot);
        }
        let payload: TraceRegistryJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            ViewerError::InvalidData(format!("failed to parse registry json payload: {e}"))
        })?;
        if payload.schema_version != TRACE_REGISTRY_JSON_SCHEMA_V1 {
            return Err(ViewerError::InvalidData(format!(
                "unsupported registry schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.registry)
    }
}

impl TraceIndexRegistry {
    pub fn to_json_contract_v1_pretty(&self) -> ViewerResult<String> {
        self.snapshot().to_json_contract_v1_pretty()
    }

    /// Rebuilds a registry from JSON, validating the restored positions.
    pub fn from_json_compat_str(input: &str) -> ViewerResult<Self> {
        Self::from_snapshot(TraceRegistrySnapshot::from_json_compat_str(input)?)
    }
}
