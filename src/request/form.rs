use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::diff::membership::DesiredMembership;
use crate::generator::names::normalize_identifier;
use crate::model::principal::parse_password_expiry;
use crate::model::{AttributePatch, DesiredPrivilege, GrantKey, PrivilegeType, SyslogAccess};
use crate::request::DesiredState;

const PRIVILEGE_PREFIX: &str = "priv";
/// Key whose presence marks the privilege domain as submitted, even with
/// every checkbox cleared.
pub const PRIVILEGES_MARKER: &str = "privileges";

/// Rejected submission body.
#[derive(Debug, Error)]
pub enum FormError {
    /// The body is not a flat key/value object.
    #[error("submission must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Form field names carrying the membership lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionKeys {
    /// Field listing group names.
    pub groups: String,
    /// Field listing role names.
    pub roles: String,
    /// Field listing user names.
    pub users: String,
}

impl Default for SubmissionKeys {
    fn default() -> Self {
        Self {
            groups: "groups".to_string(),
            roles: "roles".to_string(),
            users: "users".to_string(),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Collapse the legacy list shape to its first selected value.
fn first_value(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find(|item| !is_blank(item)),
        Value::Null => None,
        other => Some(other),
    }
}

fn text(value: &Value) -> String {
    match first_value(value) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Checkbox semantics: `true`, `"1"`, `"on"`, `"true"`, `"yes"`, non-zero numbers.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "on" | "true" | "yes"
        ),
        Value::Array(items) => items.iter().any(is_truthy),
        Value::Null | Value::Object(_) => false,
    }
}

/// Split `priv-{schema}-{object}-{privilege}` into a diff key.
///
/// Returns `None` for anything else: wrong segment count, empty schema, or
/// an unknown privilege name.
pub fn parse_privilege_key(key: &str) -> Option<GrantKey> {
    let segments: Vec<&str> = key.split('-').collect();
    let [prefix, schema, object, privilege] = segments.as_slice() else {
        return None;
    };
    if *prefix != PRIVILEGE_PREFIX {
        return None;
    }
    let schema = normalize_identifier(schema);
    if schema.is_empty() {
        return None;
    }
    let privilege = match privilege.parse::<PrivilegeType>() {
        Ok(privilege) => privilege,
        Err(e) => {
            warn!(key, error = %e, "ignoring privilege key");
            return None;
        }
    };
    Some(GrantKey::new(schema, normalize_identifier(object), privilege))
}

fn parse_privileges(fields: &Map<String, Value>) -> Option<Vec<DesiredPrivilege>> {
    let mut present = fields.contains_key(PRIVILEGES_MARKER);
    let mut selected = BTreeSet::new();

    for (key, value) in fields {
        if !key.starts_with("priv-") {
            continue;
        }
        let Some(grant_key) = parse_privilege_key(key) else {
            debug!(key = key.as_str(), "skipping malformed privilege key");
            continue;
        };
        present = true;
        if is_truthy(value) {
            selected.insert(grant_key);
        }
    }

    present.then(|| selected.into_iter().map(DesiredPrivilege::new).collect())
}

fn parse_name_list(value: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut push = |raw: &str| {
        for part in raw.split(',') {
            let name = normalize_identifier(part);
            if !name.is_empty() {
                names.insert(name);
            }
        }
    };
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push(s),
                    Value::Null => {}
                    other => push(&other.to_string()),
                }
            }
        }
        Value::String(s) => push(s),
        Value::Null => {}
        other => push(&other.to_string()),
    }
    names
}

fn parse_membership(fields: &Map<String, Value>, keys: &SubmissionKeys) -> DesiredMembership {
    let list = |key: &str| fields.get(key).map(parse_name_list);
    DesiredMembership {
        groups: list(&keys.groups),
        roles: list(&keys.roles),
        users: list(&keys.users),
    }
}

/// Parse an optional numeric limit where blank, 0 or negative means "none".
fn parse_limit(field: &str, value: &Value) -> Option<Option<u32>> {
    let raw = text(value);
    if raw.is_empty() {
        return Some(None);
    }
    match raw.parse::<i64>() {
        Ok(n) if n <= 0 => Some(None),
        Ok(n) => match u32::try_from(n) {
            Ok(n) => Some(Some(n)),
            Err(_) => {
                warn!(field, value = raw.as_str(), "ignoring out of range attribute");
                None
            }
        },
        Err(_) => {
            warn!(field, value = raw.as_str(), "ignoring non-numeric attribute");
            None
        }
    }
}

fn parse_attributes(fields: &Map<String, Value>) -> Option<AttributePatch> {
    let mut patch = AttributePatch::default();
    let mut present = false;

    // A checkbox counts as set when any submitted value is truthy.
    let flag = |name: &str| fields.get(name).map(is_truthy);
    if let Some(v) = flag("super_user") {
        patch.super_user = Some(v);
        present = true;
    }
    if let Some(v) = flag("can_create_db") {
        patch.can_create_db = Some(v);
        present = true;
    }
    if let Some(v) = flag("can_update_catalog") {
        patch.can_update_catalog = Some(v);
        present = true;
    }
    if let Some(value) = fields.get("password_expiry") {
        present = true;
        match parse_password_expiry(&text(value)) {
            Ok(expiry) => patch.password_expiry = Some(expiry),
            Err(e) => warn!(error = %e, "ignoring password expiry"),
        }
    }
    if let Some(value) = fields.get("connection_limit") {
        present = true;
        patch.connection_limit = parse_limit("connection_limit", value);
    }
    if let Some(value) = fields.get("session_timeout") {
        present = true;
        patch.session_timeout = parse_limit("session_timeout", value);
    }
    if let Some(value) = fields.get("syslog_access") {
        present = true;
        let raw = text(value);
        if raw.is_empty() {
            patch.syslog_access = Some(None);
        } else {
            match raw.parse::<SyslogAccess>() {
                Ok(access) => patch.syslog_access = Some(Some(access)),
                Err(e) => warn!(error = %e, "ignoring syslog access"),
            }
        }
    }

    present.then_some(patch)
}

/// Build a [`DesiredState`] from a flat form body.
///
/// Malformed privilege keys and unparseable attribute values are skipped
/// with a log line; only a body that is not an object is rejected.
pub fn parse_submission(body: &Value, keys: &SubmissionKeys) -> Result<DesiredState, FormError> {
    let fields = body
        .as_object()
        .ok_or_else(|| FormError::NotAnObject(kind_of(body)))?;

    Ok(DesiredState {
        privileges: parse_privileges(fields),
        membership: parse_membership(fields, keys),
        attributes: parse_attributes(fields),
    })
}

/// Parse a flat form body already split into string pairs.
pub fn parse_pairs<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    keys: &SubmissionKeys,
) -> DesiredState {
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (key, value) in pairs {
        grouped
            .entry(key.to_string())
            .or_default()
            .push(Value::String(value.to_string()));
    }
    let fields: Map<String, Value> = grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            (key, value)
        })
        .collect();

    DesiredState {
        privileges: parse_privileges(&fields),
        membership: parse_membership(&fields, keys),
        attributes: parse_attributes(&fields),
    }
}
