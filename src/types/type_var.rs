//! Type variables with a process-wide unique ID supply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global type variable counter for generating unique type variables.
///
/// This is the only process-wide mutable state in the core; atomic access
/// keeps IDs monotonic and unique even when test suites run in parallel.
static TYPE_VAR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_type_var_id() -> u64 {
    TYPE_VAR_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Type variable with a unique identifier and optional source-level name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeVar {
    /// Globally unique ID
    pub id: u64,
    /// Name when the variable was spelled in source (e.g. a type parameter)
    pub name: Option<String>,
}

impl TypeVar {
    /// Creates a fresh type variable with a unique ID.
    pub fn fresh() -> Self {
        Self {
            id: next_type_var_id(),
            name: None,
        }
    }

    /// Creates a fresh type variable carrying a source-level name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            id: next_type_var_id(),
            name: Some(name.into()),
        }
    }

    /// Creates a type variable with a specific ID. Intended for tests that
    /// need deterministic variables.
    pub fn with_id(id: u64) -> Self {
        Self { id, name: None }
    }

    /// Resets the global counter. Intended only for test isolation; calling
    /// this while a checker invocation is live breaks ID uniqueness.
    pub fn reset_counter() {
        TYPE_VAR_COUNTER.store(0, Ordering::SeqCst);
    }
}

impl Default for TypeVar {
    fn default() -> Self {
        Self::fresh()
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}")
        } else {
            write!(f, "t{}", self.id)
        }
    }
}
