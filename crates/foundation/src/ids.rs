//! Unique identifiers for simulation entities
//!
//! Simulators and modules are identified by typed integer wrappers. Module
//! ids are process-unique and monotonically assigned, so a destroyed module's
//! id is never reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a logical simulation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct SimId(pub u64);

impl fmt::Display for SimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SimId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Unique identifier for a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub u64);

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(0);

impl ModuleId {
    /// Allocate the next process-unique module id.
    pub fn next() -> Self {
        Self(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ModuleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
