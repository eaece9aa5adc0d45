use serde::{Deserialize, Serialize};
use std::fmt;

use super::object::{ObjectType, PrivilegeType};

/// Identity of a privilege for diffing: `(schema, object, privilege)`.
///
/// The object kind is deliberately absent, since the submission and the
/// catalog may label the same tuple differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantKey {
    /// Schema containing the object.
    pub schema: String,
    /// Object name; empty for schema-level privileges.
    pub object: String,
    /// Privilege granted on the object.
    pub privilege: PrivilegeType,
}

impl GrantKey {
    /// Build a key from its parts.
    ///
    /// A self-named object (`sales.sales`) addresses the schema and is stored
    /// with an empty object, the form the catalog reports.
    pub fn new(schema: impl Into<String>, object: impl Into<String>, privilege: PrivilegeType) -> Self {
        let schema = schema.into();
        let mut object = object.into();
        if object == schema {
            object.clear();
        }
        Self {
            schema,
            object,
            privilege,
        }
    }

    /// True when the key targets the schema itself rather than an object in it.
    pub fn is_schema_level(&self) -> bool {
        self.object.is_empty() || self.object == self.schema
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.object.is_empty() {
            write!(f, "{} on schema {}", self.privilege, self.schema)
        } else {
            write!(f, "{} on {}.{}", self.privilege, self.schema, self.object)
        }
    }
}

/// A privilege held by (or to be granted to) a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrivilegeGrant {
    /// Schema containing the object.
    pub schema: String,
    /// Object name; empty for schema-level privileges.
    pub object: String,
    /// Kind of object, as classified by the catalog or the resolver.
    pub object_type: ObjectType,
    /// Privilege granted on the object.
    pub privilege: PrivilegeType,
    /// Whether the grant carries `WITH GRANT OPTION`.
    #[serde(default)]
    pub grantable: bool,
}

impl PrivilegeGrant {
    /// Attach an object kind to a diff key.
    pub fn from_key(key: GrantKey, object_type: ObjectType) -> Self {
        Self {
            schema: key.schema,
            object: key.object,
            object_type,
            privilege: key.privilege,
            grantable: false,
        }
    }

    /// Diff identity of this grant.
    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.schema.clone(), self.object.clone(), self.privilege)
    }

    /// True when `key` identifies this grant.
    pub fn matches(&self, key: &GrantKey) -> bool {
        self.key() == GrantKey::new(key.schema.as_str(), key.object.as_str(), key.privilege)
    }
}

/// One privilege selected in a desired-state submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesiredPrivilege {
    /// Diff identity of the selection.
    pub key: GrantKey,
    /// Object kind, when the submitter knows it; otherwise resolved.
    #[serde(default)]
    pub object_type: Option<ObjectType>,
}

impl DesiredPrivilege {
    /// Selection without a known object kind.
    pub fn new(key: GrantKey) -> Self {
        Self {
            key,
            object_type: None,
        }
    }

    /// Selection whose object kind was supplied explicitly.
    pub fn typed(key: GrantKey, object_type: ObjectType) -> Self {
        Self {
            key,
            object_type: Some(object_type),
        }
    }
}

impl From<GrantKey> for DesiredPrivilege {
    fn from(key: GrantKey) -> Self {
        Self::new(key)
    }
}
