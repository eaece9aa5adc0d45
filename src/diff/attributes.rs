use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::model::{PrincipalAttributes, SyslogAccess};

/// One `ALTER USER` option produced by an attribute change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseChange {
    /// `CREATEUSER` / `NOCREATEUSER`.
    SuperUser(bool),
    /// `CREATEDB` / `NOCREATEDB`.
    CreateDb(bool),
    /// `VALID UNTIL`; absent renders as `'infinity'`.
    ValidUntil(Option<NaiveDate>),
    /// `CONNECTION LIMIT`; absent renders as `UNLIMITED`.
    ConnectionLimit(Option<u32>),
    /// `SYSLOG ACCESS`.
    SyslogAccess(SyslogAccess),
    /// `SESSION TIMEOUT`; absent renders as `RESET SESSION TIMEOUT`.
    SessionTimeout(Option<u32>),
}

impl fmt::Display for ClauseChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseChange::SuperUser(true) => write!(f, "CREATEUSER"),
            ClauseChange::SuperUser(false) => write!(f, "NOCREATEUSER"),
            ClauseChange::CreateDb(true) => write!(f, "CREATEDB"),
            ClauseChange::CreateDb(false) => write!(f, "NOCREATEDB"),
            ClauseChange::ValidUntil(Some(date)) => {
                write!(f, "VALID UNTIL '{}'", date.format("%Y-%m-%d"))
            }
            ClauseChange::ValidUntil(None) => write!(f, "VALID UNTIL 'infinity'"),
            ClauseChange::ConnectionLimit(Some(limit)) => write!(f, "CONNECTION LIMIT {limit}"),
            ClauseChange::ConnectionLimit(None) => write!(f, "CONNECTION LIMIT UNLIMITED"),
            ClauseChange::SyslogAccess(access) => write!(f, "SYSLOG ACCESS {access}"),
            ClauseChange::SessionTimeout(Some(seconds)) => write!(f, "SESSION TIMEOUT {seconds}"),
            ClauseChange::SessionTimeout(None) => write!(f, "RESET SESSION TIMEOUT"),
        }
    }
}

/// Compare two attribute sets and list the clauses needed to turn one into the other.
///
/// Values are compared after collapsing defaults (0 or absent limits,
/// absent syslog access), so equivalent wire states produce no clause.
/// Returns an empty list when nothing changed.
pub fn diff_attributes(
    original: &PrincipalAttributes,
    updated: &PrincipalAttributes,
) -> Vec<ClauseChange> {
    let mut clauses = Vec::new();

    if original.super_user != updated.super_user {
        clauses.push(ClauseChange::SuperUser(updated.super_user));
    }
    if original.can_create_db != updated.can_create_db {
        clauses.push(ClauseChange::CreateDb(updated.can_create_db));
    }
    if original.can_update_catalog != updated.can_update_catalog {
        // No ALTER USER option exists for the catalog update flag.
        warn!(
            requested = updated.can_update_catalog,
            "ignoring catalog update flag change"
        );
    }
    if original.password_expiry != updated.password_expiry {
        clauses.push(ClauseChange::ValidUntil(updated.password_expiry));
    }
    if original.effective_connection_limit() != updated.effective_connection_limit() {
        clauses.push(ClauseChange::ConnectionLimit(
            updated.effective_connection_limit(),
        ));
    }
    if original.effective_syslog_access() != updated.effective_syslog_access() {
        clauses.push(ClauseChange::SyslogAccess(updated.effective_syslog_access()));
    }
    if original.effective_session_timeout() != updated.effective_session_timeout() {
        clauses.push(ClauseChange::SessionTimeout(
            updated.effective_session_timeout(),
        ));
    }

    clauses
}
