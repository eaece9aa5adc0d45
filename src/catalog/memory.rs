use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{CatalogError, CatalogReader, StatementExecutor};
use crate::diff::membership::{MembershipAction, MembershipEdge};
use crate::generator::statement::{Change, Statement};
use crate::model::{
    Membership, Principal, PrincipalAttributes, PrincipalKind, PrivilegeGrant, SchemaInventory,
};

/// Catalog state of one principal inside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    /// Privileges held.
    #[serde(default)]
    pub privileges: Vec<PrivilegeGrant>,
    /// Membership sets.
    #[serde(default)]
    pub membership: Membership,
    /// Scalar attributes (users only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<PrincipalAttributes>,
}

/// Serializable picture of a warehouse's access-control state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Users by name.
    #[serde(default)]
    pub users: BTreeMap<String, PrincipalRecord>,
    /// Groups by name.
    #[serde(default)]
    pub groups: BTreeMap<String, PrincipalRecord>,
    /// Roles by name.
    #[serde(default)]
    pub roles: BTreeMap<String, PrincipalRecord>,
    /// Object inventories by schema name.
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaInventory>,
}

impl CatalogSnapshot {
    fn records(&self, kind: PrincipalKind) -> &BTreeMap<String, PrincipalRecord> {
        match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Group => &self.groups,
            PrincipalKind::Role => &self.roles,
        }
    }

    fn records_mut(&mut self, kind: PrincipalKind) -> &mut BTreeMap<String, PrincipalRecord> {
        match kind {
            PrincipalKind::User => &mut self.users,
            PrincipalKind::Group => &mut self.groups,
            PrincipalKind::Role => &mut self.roles,
        }
    }

    fn record(&self, principal: &Principal) -> Option<&PrincipalRecord> {
        self.records(principal.kind).get(&principal.name)
    }

    fn record_mut(&mut self, principal: &Principal) -> Option<&mut PrincipalRecord> {
        self.records_mut(principal.kind).get_mut(&principal.name)
    }
}

/// Catalog reader and statement executor over an in-memory snapshot.
///
/// Executed statements are applied to the snapshot through their
/// structured [`Change`], so a second pass observes the first one's effects.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    snapshot: CatalogSnapshot,
    fail_on: Vec<String>,
    unreadable: bool,
    executed: Vec<String>,
    inventory_reads: usize,
}

impl MemoryCatalog {
    /// Wrap an existing snapshot.
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Decode a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Encode the current snapshot as pretty JSON.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.snapshot)?)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    /// Make every statement whose SQL contains `needle` fail.
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on.push(needle.into());
        self
    }

    /// Make every catalog read fail.
    pub fn set_unreadable(&mut self, unreadable: bool) {
        self.unreadable = unreadable;
    }

    /// SQL of every statement that was executed successfully, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Number of schema inventory reads served.
    pub fn inventory_reads(&self) -> usize {
        self.inventory_reads
    }

    /// Insert or replace a principal record.
    pub fn insert(&mut self, principal: &Principal, record: PrincipalRecord) {
        self.snapshot
            .records_mut(principal.kind)
            .insert(principal.name.clone(), record);
    }

    /// Insert or replace a schema inventory.
    pub fn insert_schema(&mut self, schema: impl Into<String>, inventory: SchemaInventory) {
        self.snapshot.schemas.insert(schema.into(), inventory);
    }

    fn check_readable(&self, context: &str) -> Result<(), CatalogError> {
        if self.unreadable {
            return Err(CatalogError::Query {
                context: context.to_string(),
                message: "catalog unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn record_for_read(&self, principal: &Principal) -> Result<&PrincipalRecord, CatalogError> {
        self.snapshot
            .record(principal)
            .ok_or_else(|| CatalogError::UnknownPrincipal(principal.clone()))
    }

    fn apply(&mut self, change: &Change) -> bool {
        match change {
            Change::Grant { principal, grant } => {
                let Some(record) = self.snapshot.record_mut(principal) else {
                    return false;
                };
                let key = grant.key();
                record.privileges.retain(|held| !held.matches(&key));
                record.privileges.push(grant.clone());
                true
            }
            Change::Revoke { principal, grant } => {
                let Some(record) = self.snapshot.record_mut(principal) else {
                    return false;
                };
                let key = grant.key();
                record.privileges.retain(|held| !held.matches(&key));
                true
            }
            Change::Membership(change) => self.apply_membership(change.action, &change.edge),
            Change::Alter {
                principal, updated, ..
            } => {
                if principal.kind != PrincipalKind::User {
                    return false;
                }
                let Some(record) = self.snapshot.record_mut(principal) else {
                    return false;
                };
                record.attributes = Some(updated.clone());
                true
            }
            Change::Create(principal) => {
                if self.snapshot.record(principal).is_some() {
                    return false;
                }
                let record = PrincipalRecord {
                    attributes: (principal.kind == PrincipalKind::User)
                        .then(PrincipalAttributes::default),
                    ..PrincipalRecord::default()
                };
                self.insert(principal, record);
                true
            }
            Change::Drop(principal) => {
                if self
                    .snapshot
                    .records_mut(principal.kind)
                    .remove(&principal.name)
                    .is_none()
                {
                    return false;
                }
                self.scrub_memberships(principal);
                true
            }
        }
    }

    fn apply_membership(&mut self, action: MembershipAction, edge: &MembershipEdge) -> bool {
        let (owner, member) = match edge {
            MembershipEdge::GroupUser { group, user } => {
                (Principal::group(group.as_str()), Principal::user(user.as_str()))
            }
            MembershipEdge::RoleUser { role, user } => {
                (Principal::role(role.as_str()), Principal::user(user.as_str()))
            }
            MembershipEdge::RoleRole { role, grantee } => {
                if role == grantee {
                    return false;
                }
                (Principal::role(grantee.as_str()), Principal::role(role.as_str()))
            }
        };
        if self.snapshot.record(&owner).is_none() || self.snapshot.record(&member).is_none() {
            return false;
        }

        let add = action == MembershipAction::Add;
        let toggle = |set: &mut std::collections::BTreeSet<String>, name: &str| {
            if add {
                set.insert(name.to_string());
            } else {
                set.remove(name);
            }
        };

        match edge {
            MembershipEdge::GroupUser { group, user } => {
                if let Some(record) = self.snapshot.record_mut(&owner) {
                    toggle(&mut record.membership.users, user);
                }
                if let Some(record) = self.snapshot.record_mut(&member) {
                    toggle(&mut record.membership.groups, group);
                }
            }
            MembershipEdge::RoleUser { role, user } => {
                if let Some(record) = self.snapshot.record_mut(&owner) {
                    toggle(&mut record.membership.users, user);
                }
                if let Some(record) = self.snapshot.record_mut(&member) {
                    toggle(&mut record.membership.roles, role);
                }
            }
            MembershipEdge::RoleRole { role, .. } => {
                if let Some(record) = self.snapshot.record_mut(&owner) {
                    toggle(&mut record.membership.roles, role);
                }
            }
        }
        true
    }

    fn scrub_memberships(&mut self, dropped: &Principal) {
        let name = dropped.name.as_str();
        let all = self
            .snapshot
            .users
            .values_mut()
            .chain(self.snapshot.groups.values_mut())
            .chain(self.snapshot.roles.values_mut());
        for record in all {
            match dropped.kind {
                PrincipalKind::User => {
                    record.membership.users.remove(name);
                }
                PrincipalKind::Group => {
                    record.membership.groups.remove(name);
                }
                PrincipalKind::Role => {
                    record.membership.roles.remove(name);
                }
            }
        }
    }
}

impl CatalogReader for MemoryCatalog {
    fn privileges(&mut self, principal: &Principal) -> Result<Vec<PrivilegeGrant>, CatalogError> {
        self.check_readable("reading privileges")?;
        Ok(self.record_for_read(principal)?.privileges.clone())
    }

    fn membership(&mut self, principal: &Principal) -> Result<Membership, CatalogError> {
        self.check_readable("reading membership")?;
        Ok(self.record_for_read(principal)?.membership.clone())
    }

    fn attributes(
        &mut self,
        principal: &Principal,
    ) -> Result<Option<PrincipalAttributes>, CatalogError> {
        self.check_readable("reading attributes")?;
        let record = self.record_for_read(principal)?;
        if principal.kind != PrincipalKind::User {
            return Ok(None);
        }
        Ok(Some(record.attributes.clone().unwrap_or_default()))
    }

    fn schema_inventory(&mut self, schema: &str) -> Result<SchemaInventory, CatalogError> {
        self.check_readable("reading schema inventory")?;
        self.inventory_reads += 1;
        Ok(self
            .snapshot
            .schemas
            .get(schema)
            .cloned()
            .unwrap_or_default())
    }

    fn all_schemas(&mut self) -> Result<Vec<String>, CatalogError> {
        self.check_readable("listing schemas")?;
        Ok(self.snapshot.schemas.keys().cloned().collect())
    }

    fn exists(&mut self, principal: &Principal) -> Result<bool, CatalogError> {
        self.check_readable("looking up principal")?;
        Ok(self.snapshot.record(principal).is_some())
    }
}

impl StatementExecutor for MemoryCatalog {
    fn execute(&mut self, statement: &Statement) -> bool {
        if self
            .fail_on
            .iter()
            .any(|needle| statement.sql.contains(needle.as_str()))
        {
            debug!(sql = %statement.sql, "injected statement failure");
            return false;
        }
        let applied = self.apply(&statement.change);
        if applied {
            self.executed.push(statement.sql.clone());
        }
        applied
    }
}
