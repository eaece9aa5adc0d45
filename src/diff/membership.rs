use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{Membership, Principal, PrincipalKind};

/// Result of diffing two member sets.
///
/// An empty diff means "no changes needed", which callers report
/// differently from a failed comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDiff {
    /// Members present only in the desired set.
    pub to_add: BTreeSet<String>,
    /// Members present only in the current set.
    pub to_remove: BTreeSet<String>,
}

impl MemberDiff {
    /// True when both sets already agree.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Plain symmetric difference of two member sets.
pub fn diff_members(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> MemberDiff {
    MemberDiff {
        to_add: desired.difference(current).cloned().collect(),
        to_remove: current.difference(desired).cloned().collect(),
    }
}

/// Desired membership sets; `None` leaves that domain untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredMembership {
    /// Desired group names (users only).
    pub groups: Option<BTreeSet<String>>,
    /// Desired role names (users and roles).
    pub roles: Option<BTreeSet<String>>,
    /// Desired user names (groups and roles).
    pub users: Option<BTreeSet<String>>,
}

impl DesiredMembership {
    /// True when no membership domain was submitted.
    pub fn is_empty(&self) -> bool {
        self.groups.is_none() && self.roles.is_none() && self.users.is_none()
    }
}

/// Whether a membership edge is created or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipAction {
    /// Add the edge.
    Add,
    /// Remove the edge.
    Remove,
}

/// A single membership relation between two principals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MembershipEdge {
    /// `user` belongs to `group`.
    GroupUser {
        /// Owning group.
        group: String,
        /// Member user.
        user: String,
    },
    /// `role` is granted to `user`.
    RoleUser {
        /// Granted role.
        role: String,
        /// Receiving user.
        user: String,
    },
    /// `role` is nested in (granted to) `grantee` role.
    RoleRole {
        /// Granted (nested) role.
        role: String,
        /// Receiving role.
        grantee: String,
    },
}

/// One membership edge to add or remove.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipChange {
    /// Add or remove.
    pub action: MembershipAction,
    /// The relation affected.
    pub edge: MembershipEdge,
}

/// Turn the submitted membership domains of `principal` into edge changes.
///
/// Removals come before additions. Domains that make no sense for the
/// principal kind (e.g. groups of a role) are ignored.
pub fn diff_membership(
    principal: &Principal,
    current: &Membership,
    desired: &DesiredMembership,
) -> Vec<MembershipChange> {
    let mut removals = Vec::new();
    let mut additions = Vec::new();

    let me = principal.name.as_str();
    match principal.kind {
        PrincipalKind::User => {
            if let Some(groups) = &desired.groups {
                split_changes(
                    diff_members(&current.groups, groups),
                    |g| MembershipEdge::GroupUser {
                        group: g.to_string(),
                        user: me.to_string(),
                    },
                    &mut removals,
                    &mut additions,
                );
            }
            if let Some(roles) = &desired.roles {
                split_changes(
                    diff_members(&current.roles, roles),
                    |r| MembershipEdge::RoleUser {
                        role: r.to_string(),
                        user: me.to_string(),
                    },
                    &mut removals,
                    &mut additions,
                );
            }
        }
        PrincipalKind::Group => {
            if let Some(users) = &desired.users {
                split_changes(
                    diff_members(&current.users, users),
                    |u| MembershipEdge::GroupUser {
                        group: me.to_string(),
                        user: u.to_string(),
                    },
                    &mut removals,
                    &mut additions,
                );
            }
        }
        PrincipalKind::Role => {
            if let Some(users) = &desired.users {
                split_changes(
                    diff_members(&current.users, users),
                    |u| MembershipEdge::RoleUser {
                        role: me.to_string(),
                        user: u.to_string(),
                    },
                    &mut removals,
                    &mut additions,
                );
            }
            if let Some(roles) = &desired.roles {
                split_changes(
                    diff_members(&current.roles, roles),
                    |r| MembershipEdge::RoleRole {
                        role: r.to_string(),
                        grantee: me.to_string(),
                    },
                    &mut removals,
                    &mut additions,
                );
            }
        }
    }

    removals.extend(additions);
    removals
}

fn split_changes(
    diff: MemberDiff,
    edge: impl Fn(&str) -> MembershipEdge,
    removals: &mut Vec<MembershipChange>,
    additions: &mut Vec<MembershipChange>,
) {
    for name in &diff.to_remove {
        removals.push(MembershipChange {
            action: MembershipAction::Remove,
            edge: edge(name.as_str()),
        });
    }
    for name in &diff.to_add {
        additions.push(MembershipChange {
            action: MembershipAction::Add,
            edge: edge(name.as_str()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn role_nesting_edges_point_at_the_edited_role() {
        let current = Membership {
            roles: set(&["old_child"]),
            ..Membership::default()
        };
        let desired = DesiredMembership {
            roles: Some(set(&["new_child"])),
            ..DesiredMembership::default()
        };

        let changes = diff_membership(&Principal::role("parent"), &current, &desired);
        assert_eq!(
            changes,
            vec![
                MembershipChange {
                    action: MembershipAction::Remove,
                    edge: MembershipEdge::RoleRole {
                        role: "old_child".to_string(),
                        grantee: "parent".to_string(),
                    },
                },
                MembershipChange {
                    action: MembershipAction::Add,
                    edge: MembershipEdge::RoleRole {
                        role: "new_child".to_string(),
                        grantee: "parent".to_string(),
                    },
                },
            ]
        );
    }

    #[test]
    fn domains_not_submitted_are_left_alone() {
        let current = Membership {
            groups: set(&["analysts"]),
            roles: set(&["reader"]),
            ..Membership::default()
        };
        let desired = DesiredMembership {
            roles: Some(set(&["reader"])),
            ..DesiredMembership::default()
        };

        assert!(diff_membership(&Principal::user("alice"), &current, &desired).is_empty());
    }

    #[test]
    fn groups_domain_is_ignored_for_roles() {
        let desired = DesiredMembership {
            groups: Some(set(&["analysts"])),
            ..DesiredMembership::default()
        };
        assert!(diff_membership(&Principal::role("r"), &Membership::default(), &desired).is_empty());
    }
}
