use std::collections::BTreeMap;

use crate::model::{DesiredPrivilege, GrantKey, PrivilegeGrant};

/// Privileges to add and remove to move from the current to the desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeDiff {
    /// Desired selections with no matching current grant, in key order.
    pub to_grant: Vec<DesiredPrivilege>,
    /// Current grants with no matching selection, in key order.
    ///
    /// These keep the object kind recorded by the catalog.
    pub to_revoke: Vec<PrivilegeGrant>,
}

impl PrivilegeDiff {
    /// True when nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.to_grant.is_empty() && self.to_revoke.is_empty()
    }
}

/// Diff current grants against desired selections, matching on [`GrantKey`] only.
///
/// Duplicate keys on either side collapse to a single entry; for desired
/// selections the first one carrying an explicit object kind wins.
pub fn diff_privileges(current: &[PrivilegeGrant], desired: &[DesiredPrivilege]) -> PrivilegeDiff {
    let mut current_by_key: BTreeMap<GrantKey, &PrivilegeGrant> = BTreeMap::new();
    for grant in current {
        current_by_key.entry(grant.key()).or_insert(grant);
    }

    let mut desired_by_key: BTreeMap<GrantKey, &DesiredPrivilege> = BTreeMap::new();
    for selection in desired {
        let key = &selection.key;
        desired_by_key
            .entry(GrantKey::new(key.schema.as_str(), key.object.as_str(), key.privilege))
            .and_modify(|existing| {
                if existing.object_type.is_none() && selection.object_type.is_some() {
                    *existing = selection;
                }
            })
            .or_insert(selection);
    }

    let to_grant = desired_by_key
        .iter()
        .filter(|(key, _)| !current_by_key.contains_key(*key))
        .map(|(key, selection)| DesiredPrivilege {
            key: key.clone(),
            object_type: selection.object_type,
        })
        .collect();

    let to_revoke = current_by_key
        .iter()
        .filter(|(key, _)| !desired_by_key.contains_key(key))
        .map(|(_, grant)| (*grant).clone())
        .collect();

    PrivilegeDiff {
        to_grant,
        to_revoke,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{ObjectType, PrivilegeType};

    fn held(object: &str, object_type: ObjectType, privilege: PrivilegeType) -> PrivilegeGrant {
        PrivilegeGrant::from_key(GrantKey::new("sales", object, privilege), object_type)
    }

    fn wanted(object: &str, privilege: PrivilegeType) -> DesiredPrivilege {
        DesiredPrivilege::new(GrantKey::new("sales", object, privilege))
    }

    #[test]
    fn object_type_is_not_part_of_the_match_key() {
        let current = vec![held("orders", ObjectType::View, PrivilegeType::Select)];
        let desired = vec![DesiredPrivilege::typed(
            GrantKey::new("sales", "orders", PrivilegeType::Select),
            ObjectType::Table,
        )];

        assert!(diff_privileges(&current, &desired).is_empty());
    }

    #[test]
    fn revokes_keep_the_catalog_classification() {
        let current = vec![held("daily", ObjectType::View, PrivilegeType::Select)];

        let diff = diff_privileges(&current, &[]);
        assert_eq!(diff.to_revoke.len(), 1);
        assert_eq!(diff.to_revoke[0].object_type, ObjectType::View);
        assert!(diff.to_grant.is_empty());
    }

    #[test]
    fn duplicate_selections_collapse_preferring_typed_ones() {
        let key = GrantKey::new("sales", "f", PrivilegeType::Execute);
        let desired = vec![
            DesiredPrivilege::new(key.clone()),
            DesiredPrivilege::typed(key.clone(), ObjectType::Procedure),
            wanted("orders", PrivilegeType::Insert),
        ];

        let diff = diff_privileges(&[], &desired);
        assert_eq!(diff.to_grant.len(), 2);
        let routine = diff
            .to_grant
            .iter()
            .find(|d| d.key == key)
            .expect("execute selection should be granted");
        assert_eq!(routine.object_type, Some(ObjectType::Procedure));
    }

    #[test]
    fn self_named_selection_matches_schema_grant() {
        let current = vec![held("", ObjectType::Schema, PrivilegeType::Usage)];
        let desired = vec![DesiredPrivilege::new(GrantKey {
            schema: "sales".into(),
            object: "sales".into(),
            privilege: PrivilegeType::Usage,
        })];

        assert!(diff_privileges(&current, &desired).is_empty());
    }

    #[test]
    fn grants_and_revokes_partition_the_keyed_union() {
        use PrivilegeType::{Delete, Insert, Select, Update, Usage};

        let cases: Vec<(Vec<(&str, PrivilegeType)>, Vec<(&str, PrivilegeType)>)> = vec![
            (vec![], vec![]),
            (vec![("orders", Select)], vec![]),
            (vec![], vec![("orders", Select)]),
            (vec![("orders", Select)], vec![("orders", Select)]),
            (
                vec![("orders", Select), ("orders", Insert), ("", Usage)],
                vec![("orders", Select), ("customers", Update), ("sales", Usage)],
            ),
            (
                vec![("orders", Delete), ("orders", Delete), ("customers", Select)],
                vec![("orders", Insert), ("orders", Insert), ("customers", Select)],
            ),
            (vec![("orders", Select), ("customers", Select)], vec![("daily", Select)]),
        ];

        for (held_keys, wanted_keys) in cases {
            let current: Vec<_> = held_keys
                .iter()
                .map(|(object, privilege)| held(object, ObjectType::Table, *privilege))
                .collect();
            let desired: Vec<_> = wanted_keys
                .iter()
                .map(|(object, privilege)| wanted(object, *privilege))
                .collect();

            let current_keys: BTreeSet<GrantKey> = current.iter().map(PrivilegeGrant::key).collect();
            let desired_keys: BTreeSet<GrantKey> = desired.iter().map(|d| d.key.clone()).collect();

            let diff = diff_privileges(&current, &desired);
            let granted: BTreeSet<GrantKey> = diff.to_grant.iter().map(|d| d.key.clone()).collect();
            let revoked: BTreeSet<GrantKey> = diff.to_revoke.iter().map(PrivilegeGrant::key).collect();
            assert_eq!(granted.len(), diff.to_grant.len(), "duplicate grants for {wanted_keys:?}");
            assert_eq!(revoked.len(), diff.to_revoke.len(), "duplicate revokes for {held_keys:?}");

            assert!(granted.is_disjoint(&revoked), "{held_keys:?} vs {wanted_keys:?}");

            let kept: BTreeSet<GrantKey> = current_keys.intersection(&desired_keys).cloned().collect();
            let rebuilt: BTreeSet<GrantKey> = granted.union(&kept).chain(&revoked).cloned().collect();
            let union: BTreeSet<GrantKey> = current_keys.union(&desired_keys).cloned().collect();
            assert_eq!(rebuilt, union, "{held_keys:?} vs {wanted_keys:?}");
        }
    }
}
