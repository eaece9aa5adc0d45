use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diff::attributes::ClauseChange;
use crate::diff::membership::{MembershipAction, MembershipChange, MembershipEdge};
use crate::generator::names::{qualified, quote_ident};
use crate::model::{ObjectType, Principal, PrincipalAttributes, PrincipalKind, PrivilegeGrant};

/// The structured change a statement applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Grant a privilege to a principal.
    Grant {
        /// Receiving principal.
        principal: Principal,
        /// Privilege granted.
        grant: PrivilegeGrant,
    },
    /// Revoke a privilege from a principal.
    Revoke {
        /// Principal losing the privilege.
        principal: Principal,
        /// Privilege revoked.
        grant: PrivilegeGrant,
    },
    /// Add or remove a membership edge.
    Membership(MembershipChange),
    /// Alter scalar user attributes.
    Alter {
        /// Altered user.
        principal: Principal,
        /// Clauses rendered into the statement.
        clauses: Vec<ClauseChange>,
        /// Attribute values once the statement succeeds.
        updated: PrincipalAttributes,
    },
    /// Create a principal.
    Create(Principal),
    /// Drop a principal.
    Drop(Principal),
}

/// One mutating warehouse statement and the change it performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// SQL text sent to the warehouse.
    pub sql: String,
    /// What the statement does, for executors that apply changes structurally.
    pub change: Change,
}

impl Statement {
    /// True for privilege revokes.
    pub fn is_revoke(&self) -> bool {
        matches!(self.change, Change::Revoke { .. })
    }

    /// True for privilege grants.
    pub fn is_grant(&self) -> bool {
        matches!(self.change, Change::Grant { .. })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

fn grantee(principal: &Principal) -> String {
    let name = quote_ident(&principal.name);
    match principal.kind {
        PrincipalKind::User => name,
        PrincipalKind::Group => format!("GROUP {name}"),
        PrincipalKind::Role => format!("ROLE {name}"),
    }
}

fn privilege_target(grant: &PrivilegeGrant) -> String {
    match grant.object_type {
        ObjectType::Table | ObjectType::View => qualified(&grant.schema, &grant.object),
        ObjectType::Function | ObjectType::Procedure => {
            format!(
                "{} {}",
                grant.object_type,
                qualified(&grant.schema, &grant.object)
            )
        }
        ObjectType::Schema => format!("SCHEMA {}", quote_ident(&grant.schema)),
    }
}

fn privilege_keyword(grant: &PrivilegeGrant) -> String {
    if grant.object_type.is_routine() {
        "EXECUTE".to_string()
    } else {
        grant.privilege.to_string()
    }
}

/// `GRANT {privilege} ON {target} TO {principal};`
pub fn grant_statement(principal: &Principal, grant: &PrivilegeGrant) -> Statement {
    Statement {
        sql: format!(
            "GRANT {} ON {} TO {};",
            privilege_keyword(grant),
            privilege_target(grant),
            grantee(principal)
        ),
        change: Change::Grant {
            principal: principal.clone(),
            grant: grant.clone(),
        },
    }
}

/// `REVOKE {privilege} ON {target} FROM {principal};`
pub fn revoke_statement(principal: &Principal, grant: &PrivilegeGrant) -> Statement {
    Statement {
        sql: format!(
            "REVOKE {} ON {} FROM {};",
            privilege_keyword(grant),
            privilege_target(grant),
            grantee(principal)
        ),
        change: Change::Revoke {
            principal: principal.clone(),
            grant: grant.clone(),
        },
    }
}

/// Render a membership edge change.
pub fn membership_statement(change: &MembershipChange) -> Statement {
    let add = change.action == MembershipAction::Add;
    let sql = match &change.edge {
        MembershipEdge::GroupUser { group, user } => format!(
            "ALTER GROUP {} {} USER {};",
            quote_ident(group),
            if add { "ADD" } else { "DROP" },
            quote_ident(user)
        ),
        MembershipEdge::RoleUser { role, user } => {
            if add {
                format!("GRANT ROLE {} TO {};", quote_ident(role), quote_ident(user))
            } else {
                format!("REVOKE ROLE {} FROM {};", quote_ident(role), quote_ident(user))
            }
        }
        MembershipEdge::RoleRole { role, grantee } => {
            if add {
                format!(
                    "GRANT ROLE {} TO ROLE {};",
                    quote_ident(role),
                    quote_ident(grantee)
                )
            } else {
                format!(
                    "REVOKE ROLE {} FROM ROLE {};",
                    quote_ident(role),
                    quote_ident(grantee)
                )
            }
        }
    };
    Statement {
        sql,
        change: Change::Membership(change.clone()),
    }
}

/// Concatenate attribute clauses into one `ALTER USER ... WITH ...;`.
///
/// Returns `None` for an empty clause list; an empty `ALTER` is never emitted.
pub fn alter_statement(
    user: &Principal,
    clauses: &[ClauseChange],
    updated: &PrincipalAttributes,
) -> Option<Statement> {
    if clauses.is_empty() {
        return None;
    }
    let rendered = clauses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    Some(Statement {
        sql: format!("ALTER USER {} WITH {rendered};", quote_ident(&user.name)),
        change: Change::Alter {
            principal: user.clone(),
            clauses: clauses.to_vec(),
            updated: updated.clone(),
        },
    })
}

/// `CREATE USER|GROUP|ROLE`. New users start with password login disabled.
pub fn create_statement(principal: &Principal) -> Statement {
    let name = quote_ident(&principal.name);
    let sql = match principal.kind {
        PrincipalKind::User => format!("CREATE USER {name} PASSWORD DISABLE;"),
        PrincipalKind::Group => format!("CREATE GROUP {name};"),
        PrincipalKind::Role => format!("CREATE ROLE {name};"),
    };
    Statement {
        sql,
        change: Change::Create(principal.clone()),
    }
}

/// `DROP USER|GROUP|ROLE`.
pub fn drop_statement(principal: &Principal) -> Statement {
    Statement {
        sql: format!("DROP {} {};", principal.kind, quote_ident(&principal.name)),
        change: Change::Drop(principal.clone()),
    }
}

/// Format statements as a newline-separated SQL script.
pub fn format_plan(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|statement| statement.sql.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
