//! Reconcile Redshift users, groups, and roles against a desired access-control state.
#![warn(missing_docs)]

/// Catalog reader and statement executor interfaces, with in-memory and live backends.
pub mod catalog;
/// Current-versus-desired diffs for privileges, memberships, and user attributes.
pub mod diff;
/// SQL statement generation and identifier rendering.
pub mod generator;
/// Principals, grants, attributes, and schema inventories.
pub mod model;
/// Pass summaries, Markdown reports, and on-disk artifacts.
pub mod output;
/// Reconciliation passes and principal lifecycle.
pub mod reconcile;
/// Desired-state requests and the form submission parser.
pub mod request;
/// Object kind resolution for privileges on unlabeled objects.
pub mod resolver;
