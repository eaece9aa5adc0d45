//! Reconciliation passes: load, diff, resolve, generate, execute, refresh.

/// Per-pass context owning the warehouse borrow and inventory cache.
pub mod context;
/// Creating and dropping principals.
pub mod lifecycle;
/// The reconciliation algorithm and its result.
pub mod orchestrator;

pub use context::{PassState, ReconcileError, ReconciliationContext};
pub use lifecycle::{create_principal, drop_principal, LifecycleError};
pub use orchestrator::ReconciliationResult;
