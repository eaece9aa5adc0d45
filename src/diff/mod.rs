/// Scalar user attribute diff producing `ALTER USER` clauses.
pub mod attributes;
/// Group membership and role nesting diff.
pub mod membership;
/// Object privilege diff keyed on `(schema, object, privilege)`.
pub mod privileges;
