use tracing::warn;

use crate::model::{ObjectType, PrivilegeType, Resolution, SchemaInventory};

/// Look `object` up in `inventory`.
///
/// `EXECUTE` checks functions before procedures; every other privilege
/// checks tables before views. A name present in both lists resolves to
/// the first kind in that order.
pub fn lookup(
    inventory: &SchemaInventory,
    object: &str,
    privilege: PrivilegeType,
) -> Option<ObjectType> {
    if privilege.is_execute() {
        if inventory.has_function(object) {
            Some(ObjectType::Function)
        } else if inventory.has_procedure(object) {
            Some(ObjectType::Procedure)
        } else {
            None
        }
    } else if inventory.has_table(object) {
        Some(ObjectType::Table)
    } else if inventory.has_view(object) {
        Some(ObjectType::View)
    } else {
        None
    }
}

/// Classification used when no inventory knows `object`.
///
/// An empty or self-named object is the schema itself. Anything else is a
/// best-effort guess: `FUNCTION` for `EXECUTE`, `TABLE` otherwise.
pub fn fallback(schema: &str, object: &str, privilege: PrivilegeType) -> Resolution {
    if privilege.is_execute() {
        warn!(schema, object, "routine not found in inventory, assuming FUNCTION");
        return Resolution::Uncertain(ObjectType::Function);
    }
    if object.is_empty() || object == schema {
        return Resolution::Confirmed(ObjectType::Schema);
    }
    warn!(schema, object, %privilege, "relation not found in inventory, assuming TABLE");
    Resolution::Uncertain(ObjectType::Table)
}

/// Resolve against a single inventory snapshot, without live refresh.
pub fn resolve(
    schema: &str,
    object: &str,
    privilege: PrivilegeType,
    inventory: Option<&SchemaInventory>,
) -> Resolution {
    inventory
        .and_then(|inventory| lookup(inventory, object, privilege))
        .map(Resolution::Confirmed)
        .unwrap_or_else(|| fallback(schema, object, privilege))
}

/// Resolve against `cached`, refreshing the inventory once on a miss.
///
/// `refresh` runs only when the cached inventory is absent or does not know
/// `object`. The refreshed inventory is handed back so the caller can keep
/// it for the rest of the pass. Refresh failures propagate.
pub fn resolve_with_refresh<E>(
    schema: &str,
    object: &str,
    privilege: PrivilegeType,
    cached: Option<&SchemaInventory>,
    refresh: impl FnOnce() -> Result<SchemaInventory, E>,
) -> Result<(Resolution, Option<SchemaInventory>), E> {
    if let Some(found) = cached.and_then(|inventory| lookup(inventory, object, privilege)) {
        return Ok((Resolution::Confirmed(found), None));
    }
    let refreshed = refresh()?;
    let resolution = resolve(schema, object, privilege, Some(&refreshed));
    Ok((resolution, Some(refreshed)))
}
