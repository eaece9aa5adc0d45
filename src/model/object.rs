use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of warehouse object a privilege applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectType {
    /// Base table.
    Table,
    /// View or late-binding view.
    View,
    /// User-defined function.
    Function,
    /// Stored procedure.
    Procedure,
    /// The schema itself (schema-level privilege).
    Schema,
}

impl ObjectType {
    /// Whether privileges on this object are granted as `EXECUTE ON {type}`.
    pub fn is_routine(self) -> bool {
        matches!(self, ObjectType::Function | ObjectType::Procedure)
    }

    /// Whether this object lives in a schema's relation namespace.
    pub fn is_relation(self) -> bool {
        matches!(self, ObjectType::Table | ObjectType::View)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Table => write!(f, "TABLE"),
            ObjectType::View => write!(f, "VIEW"),
            ObjectType::Function => write!(f, "FUNCTION"),
            ObjectType::Procedure => write!(f, "PROCEDURE"),
            ObjectType::Schema => write!(f, "SCHEMA"),
        }
    }
}

impl std::str::FromStr for ObjectType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TABLE" | "BASE TABLE" => Ok(ObjectType::Table),
            "VIEW" | "LATE BINDING VIEW" | "MATERIALIZED VIEW" => Ok(ObjectType::View),
            "FUNCTION" => Ok(ObjectType::Function),
            "PROCEDURE" => Ok(ObjectType::Procedure),
            "SCHEMA" => Ok(ObjectType::Schema),
            _ => Err(format!("Invalid object type: {s}")),
        }
    }
}

/// Outcome of classifying an object whose kind was not supplied.
///
/// `Uncertain` carries the best-effort default picked when neither the
/// cached nor the live inventory knows the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Kind confirmed by the schema inventory (or by an explicit rule).
    Confirmed(ObjectType),
    /// Kind guessed by the default fallback.
    Uncertain(ObjectType),
}

impl Resolution {
    /// The object kind, regardless of certainty.
    pub fn object_type(self) -> ObjectType {
        match self {
            Resolution::Confirmed(t) | Resolution::Uncertain(t) => t,
        }
    }

    /// True when the kind comes from the default fallback.
    pub fn is_uncertain(self) -> bool {
        matches!(self, Resolution::Uncertain(_))
    }
}

/// A privilege that can be granted on a warehouse object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivilegeType {
    /// `SELECT` on a relation.
    Select,
    /// `INSERT` on a relation.
    Insert,
    /// `UPDATE` on a relation.
    Update,
    /// `DELETE` on a relation.
    Delete,
    /// `REFERENCES` on a relation.
    References,
    /// `TRIGGER` on a relation.
    Trigger,
    /// `TRUNCATE` on a relation.
    Truncate,
    /// `DROP` on a relation.
    Drop,
    /// `ALTER` on a relation or schema.
    Alter,
    /// `EXECUTE` on a function or procedure.
    Execute,
    /// `USAGE` on a schema.
    Usage,
    /// `CREATE` on a schema.
    Create,
    /// `TEMPORARY` on a database.
    Temporary,
}

impl PrivilegeType {
    /// Privileges that only make sense on routines.
    pub fn is_execute(self) -> bool {
        self == PrivilegeType::Execute
    }
}

impl fmt::Display for PrivilegeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            PrivilegeType::Select => "SELECT",
            PrivilegeType::Insert => "INSERT",
            PrivilegeType::Update => "UPDATE",
            PrivilegeType::Delete => "DELETE",
            PrivilegeType::References => "REFERENCES",
            PrivilegeType::Trigger => "TRIGGER",
            PrivilegeType::Truncate => "TRUNCATE",
            PrivilegeType::Drop => "DROP",
            PrivilegeType::Alter => "ALTER",
            PrivilegeType::Execute => "EXECUTE",
            PrivilegeType::Usage => "USAGE",
            PrivilegeType::Create => "CREATE",
            PrivilegeType::Temporary => "TEMPORARY",
        };
        f.write_str(keyword)
    }
}

impl std::str::FromStr for PrivilegeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(PrivilegeType::Select),
            "INSERT" => Ok(PrivilegeType::Insert),
            "UPDATE" => Ok(PrivilegeType::Update),
            "DELETE" => Ok(PrivilegeType::Delete),
            "REFERENCES" => Ok(PrivilegeType::References),
            "TRIGGER" => Ok(PrivilegeType::Trigger),
            "TRUNCATE" => Ok(PrivilegeType::Truncate),
            "DROP" => Ok(PrivilegeType::Drop),
            "ALTER" => Ok(PrivilegeType::Alter),
            "EXECUTE" => Ok(PrivilegeType::Execute),
            "USAGE" => Ok(PrivilegeType::Usage),
            "CREATE" => Ok(PrivilegeType::Create),
            "TEMPORARY" | "TEMP" => Ok(PrivilegeType::Temporary),
            _ => Err(format!("Invalid privilege type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_names_parse_case_insensitively() {
        assert_eq!("select".parse::<PrivilegeType>(), Ok(PrivilegeType::Select));
        assert_eq!("Temp".parse::<PrivilegeType>(), Ok(PrivilegeType::Temporary));
        assert!("SELECT; DROP TABLE x".parse::<PrivilegeType>().is_err());
    }

    #[test]
    fn catalog_relation_kinds_map_to_object_types() {
        assert_eq!("BASE TABLE".parse::<ObjectType>(), Ok(ObjectType::Table));
        assert_eq!("late binding view".parse::<ObjectType>(), Ok(ObjectType::View));
        assert!("SEQUENCE".parse::<ObjectType>().is_err());
    }

    #[test]
    fn resolution_exposes_kind_and_certainty() {
        let guessed = Resolution::Uncertain(ObjectType::Table);
        assert_eq!(guessed.object_type(), ObjectType::Table);
        assert!(guessed.is_uncertain());
        assert!(!Resolution::Confirmed(ObjectType::View).is_uncertain());
    }
}
