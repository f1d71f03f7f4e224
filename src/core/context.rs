use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known identifier of the session active before any context switch.
pub const MAIN_CONTEXT_ID: &str = "main";

/// Identifier of an independent visualization session.
///
/// The value is opaque on the client: unknown ids are only rejected by the
/// backend when a call carrying them is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn main() -> Self {
        Self(MAIN_CONTEXT_ID.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_main(&self) -> bool {
        self.0 == MAIN_CONTEXT_ID
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContextId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
