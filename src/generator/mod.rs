/// Identifier normalization and quoting.
pub mod names;
/// Grant, revoke, membership, `ALTER USER`, and lifecycle statements.
pub mod statement;
