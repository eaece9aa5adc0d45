use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::grant::PrivilegeGrant;

/// Kind of principal that can hold grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// Database user.
    User,
    /// Legacy user group.
    Group,
    /// Role (may nest other roles).
    Role,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "USER"),
            PrincipalKind::Group => write!(f, "GROUP"),
            PrincipalKind::Role => write!(f, "ROLE"),
        }
    }
}

impl std::str::FromStr for PrincipalKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(PrincipalKind::User),
            "group" => Ok(PrincipalKind::Group),
            "role" => Ok(PrincipalKind::Role),
            _ => Err(format!("Invalid principal kind: {s}")),
        }
    }
}

/// A user, group, or role subject to grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Principal name as stored in the catalog.
    pub name: String,
    /// Namespace the name lives in.
    pub kind: PrincipalKind,
}

impl Principal {
    /// A database user.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PrincipalKind::User,
        }
    }

    /// A user group.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PrincipalKind::Group,
        }
    }

    /// A role.
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PrincipalKind::Role,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Membership sets of a principal.
///
/// Which sets are meaningful depends on the principal kind:
/// - user: `groups` it belongs to, `roles` granted to it
/// - group: member `users`
/// - role: `users` granted the role, nested `roles` granted to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Group names.
    #[serde(default)]
    pub groups: BTreeSet<String>,
    /// Role names.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// User names.
    #[serde(default)]
    pub users: BTreeSet<String>,
}

/// `SYSLOG ACCESS` level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyslogAccess {
    /// Only the user's own rows are visible in system tables.
    #[default]
    Restricted,
    /// All rows are visible in system tables.
    Unrestricted,
}

impl fmt::Display for SyslogAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyslogAccess::Restricted => write!(f, "RESTRICTED"),
            SyslogAccess::Unrestricted => write!(f, "UNRESTRICTED"),
        }
    }
}

impl std::str::FromStr for SyslogAccess {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RESTRICTED" => Ok(SyslogAccess::Restricted),
            "UNRESTRICTED" => Ok(SyslogAccess::Unrestricted),
            _ => Err(format!("Invalid syslog access: {s}")),
        }
    }
}

/// Scalar, mutable properties of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalAttributes {
    /// `CREATEUSER` (superuser) flag.
    #[serde(default)]
    pub super_user: bool,
    /// `CREATEDB` flag.
    #[serde(default)]
    pub can_create_db: bool,
    /// Catalog update flag (read-only in the warehouse grammar).
    #[serde(default)]
    pub can_update_catalog: bool,
    /// Password expiry; absent means it never expires.
    #[serde(default)]
    pub password_expiry: Option<NaiveDate>,
    /// Connection limit; absent or 0 means unlimited.
    #[serde(default)]
    pub connection_limit: Option<u32>,
    /// System-table visibility; absent means restricted.
    #[serde(default)]
    pub syslog_access: Option<SyslogAccess>,
    /// Session timeout in seconds; absent or 0 means the cluster default.
    #[serde(default)]
    pub session_timeout: Option<u32>,
}

impl PrincipalAttributes {
    /// Connection limit with `0` collapsed into "unlimited".
    pub fn effective_connection_limit(&self) -> Option<u32> {
        self.connection_limit.filter(|limit| *limit != 0)
    }

    /// Syslog access with absence collapsed into `RESTRICTED`.
    pub fn effective_syslog_access(&self) -> SyslogAccess {
        self.syslog_access.unwrap_or_default()
    }

    /// Session timeout with `0` collapsed into "cluster default".
    pub fn effective_session_timeout(&self) -> Option<u32> {
        self.session_timeout.filter(|timeout| *timeout != 0)
    }
}

/// Partial attribute update: present fields override the loaded values.
///
/// The inner `Option` of the nullable fields distinguishes "set to absent"
/// (`Some(None)`) from "not submitted" (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePatch {
    /// New superuser flag.
    pub super_user: Option<bool>,
    /// New `CREATEDB` flag.
    pub can_create_db: Option<bool>,
    /// New catalog update flag.
    pub can_update_catalog: Option<bool>,
    /// New password expiry.
    pub password_expiry: Option<Option<NaiveDate>>,
    /// New connection limit.
    pub connection_limit: Option<Option<u32>>,
    /// New syslog access level.
    pub syslog_access: Option<Option<SyslogAccess>>,
    /// New session timeout.
    pub session_timeout: Option<Option<u32>>,
}

impl AttributePatch {
    /// True when no field was submitted.
    pub fn is_empty(&self) -> bool {
        *self == AttributePatch::default()
    }

    /// Overlay the submitted fields on `original`.
    pub fn apply(&self, original: &PrincipalAttributes) -> PrincipalAttributes {
        let mut updated = original.clone();
        if let Some(v) = self.super_user {
            updated.super_user = v;
        }
        if let Some(v) = self.can_create_db {
            updated.can_create_db = v;
        }
        if let Some(v) = self.can_update_catalog {
            updated.can_update_catalog = v;
        }
        if let Some(v) = self.password_expiry {
            updated.password_expiry = v;
        }
        if let Some(v) = self.connection_limit {
            updated.connection_limit = v;
        }
        if let Some(v) = self.syslog_access {
            updated.syslog_access = v;
        }
        if let Some(v) = self.session_timeout {
            updated.session_timeout = v;
        }
        updated
    }
}

/// Parse a password expiry as rendered by the catalog or a form.
///
/// Accepts `YYYY-MM-DD` optionally followed by a time part. Empty text and
/// `infinity` mean "never expires".
pub fn parse_password_expiry(text: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("infinity") {
        return Ok(None);
    }
    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| format!("Invalid password expiry '{trimmed}': {e}"))
}

/// Everything the catalog records about one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalState {
    /// The principal described.
    pub principal: Principal,
    /// Object privileges held.
    pub privileges: Vec<PrivilegeGrant>,
    /// Group and role memberships.
    pub membership: Membership,
    /// Scalar attributes; only users carry them.
    pub attributes: Option<PrincipalAttributes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_expiry_accepts_catalog_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert_eq!(parse_password_expiry("2025-01-01 00:00:00"), Ok(expected));
        assert_eq!(parse_password_expiry("2025-01-01"), Ok(expected));
        assert_eq!(parse_password_expiry(" infinity "), Ok(None));
        assert_eq!(parse_password_expiry(""), Ok(None));
        assert!(parse_password_expiry("next tuesday").is_err());
    }

    #[test]
    fn patch_overrides_only_submitted_fields() {
        let original = PrincipalAttributes {
            super_user: true,
            connection_limit: Some(5),
            password_expiry: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..PrincipalAttributes::default()
        };
        let patch = AttributePatch {
            connection_limit: Some(Some(10)),
            password_expiry: Some(None),
            ..AttributePatch::default()
        };

        let updated = patch.apply(&original);
        assert!(updated.super_user);
        assert_eq!(updated.connection_limit, Some(10));
        assert_eq!(updated.password_expiry, None);
    }

    #[test]
    fn effective_values_collapse_defaults() {
        let attrs = PrincipalAttributes {
            connection_limit: Some(0),
            session_timeout: Some(0),
            ..PrincipalAttributes::default()
        };
        assert_eq!(attrs.effective_connection_limit(), None);
        assert_eq!(attrs.effective_session_timeout(), None);
        assert_eq!(attrs.effective_syslog_access(), SyslogAccess::Restricted);
    }
}
