//! Typed desired state and the boundary parser that builds it from a form body.

/// Defensive parser for flat-key form submissions.
pub mod form;

use crate::diff::membership::DesiredMembership;
use crate::model::{AttributePatch, DesiredPrivilege};

/// What an operator wants one principal to look like.
///
/// Every domain is optional: an absent domain is left untouched by the
/// reconciliation pass, while a present but empty one clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    /// Complete set of object privileges the principal should hold.
    pub privileges: Option<Vec<DesiredPrivilege>>,
    /// Desired membership sets.
    pub membership: DesiredMembership,
    /// Attribute overrides (users only).
    pub attributes: Option<AttributePatch>,
}

impl DesiredState {
    /// Desired state that only manages privileges.
    pub fn privileges(privileges: impl IntoIterator<Item = DesiredPrivilege>) -> Self {
        Self {
            privileges: Some(privileges.into_iter().collect()),
            ..Self::default()
        }
    }

    /// True when no domain was submitted.
    pub fn is_empty(&self) -> bool {
        self.privileges.is_none() && self.membership.is_empty() && self.attributes.is_none()
    }
}
