//! Object Type Resolver: decide what kind of object a submitted name refers to.

/// Per-pass schema inventory cache that refreshes a schema on its first miss.
pub mod cache;
/// Inventory lookup precedence and default-classification fallback.
pub mod object_type;
