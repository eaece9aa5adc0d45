use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::Warehouse;
use crate::diff::attributes::diff_attributes;
use crate::diff::membership::{diff_membership, MembershipAction};
use crate::diff::privileges::diff_privileges;
use crate::generator::statement::{
    alter_statement, grant_statement, membership_statement, revoke_statement, Change, Statement,
};
use crate::model::{
    GrantKey, ObjectType, Principal, PrincipalKind, PrincipalState, PrivilegeGrant, Resolution,
};
use crate::reconcile::context::{PassState, ReconcileError, ReconciliationContext};
use crate::request::DesiredState;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Successful grants.
    pub granted: usize,
    /// Successful revokes.
    pub revoked: usize,
    /// Membership edges added.
    pub members_added: usize,
    /// Membership edges removed.
    pub members_removed: usize,
    /// Attribute clauses applied.
    pub attributes_altered: usize,
    /// Statements that succeeded, in execution order.
    pub executed: Vec<Statement>,
    /// Statements that failed, in execution order.
    pub failed: Vec<Statement>,
    /// New grants whose object kind was guessed.
    pub uncertain: Vec<GrantKey>,
    /// State re-read after execution; `None` if the refresh failed.
    pub snapshot: Option<PrincipalState>,
}

impl ReconciliationResult {
    /// True when at least one statement failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// True when there was nothing to execute.
    pub fn is_noop(&self) -> bool {
        self.executed.is_empty() && self.failed.is_empty()
    }

    fn record_success(&mut self, statement: Statement) {
        match &statement.change {
            Change::Grant { .. } => self.granted += 1,
            Change::Revoke { .. } => self.revoked += 1,
            Change::Membership(change) => match change.action {
                MembershipAction::Add => self.members_added += 1,
                MembershipAction::Remove => self.members_removed += 1,
            },
            Change::Alter { clauses, .. } => self.attributes_altered += clauses.len(),
            Change::Create(_) | Change::Drop(_) => {}
        }
        self.executed.push(statement);
    }
}

/// Generated, ordered statements of a pass before execution.
struct Prepared {
    statements: Vec<Statement>,
    uncertain: Vec<GrantKey>,
}

impl<W: Warehouse + ?Sized> ReconciliationContext<'_, W> {
    /// Bring `principal` to `desired` and report what happened.
    ///
    /// Statements run one at a time in the order revokes, grants, membership
    /// changes, attribute `ALTER`. A failed statement is recorded and the
    /// pass continues. A catalog read failure before execution aborts the
    /// pass with nothing applied.
    pub fn reconcile(
        mut self,
        principal: &Principal,
        desired: &DesiredState,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let prepared = self.prepare(principal, desired)?;

        self.advance(PassState::Executing)?;
        let mut result = ReconciliationResult {
            uncertain: prepared.uncertain,
            ..ReconciliationResult::default()
        };
        for statement in prepared.statements {
            debug!(sql = %statement.sql, "executing");
            if self.warehouse.execute(&statement) {
                result.record_success(statement);
            } else {
                warn!(sql = %statement.sql, %principal, "statement failed, continuing");
                result.failed.push(statement);
            }
        }

        self.advance(PassState::Done)?;
        result.snapshot = match self.warehouse.principal_state(principal) {
            Ok(state) => Some(state),
            Err(error) => {
                warn!(%principal, %error, "could not refresh state after reconciliation");
                None
            }
        };

        info!(
            %principal,
            granted = result.granted,
            revoked = result.revoked,
            members_added = result.members_added,
            members_removed = result.members_removed,
            attributes_altered = result.attributes_altered,
            failed = result.failed.len(),
            "reconciliation pass complete"
        );
        Ok(result)
    }

    /// Generate the ordered statements a pass would execute, without running them.
    pub fn plan(
        mut self,
        principal: &Principal,
        desired: &DesiredState,
    ) -> Result<Vec<Statement>, ReconcileError> {
        Ok(self.prepare(principal, desired)?.statements)
    }

    fn prepare(
        &mut self,
        principal: &Principal,
        desired: &DesiredState,
    ) -> Result<Prepared, ReconcileError> {
        let current = self.warehouse.principal_state(principal)?;
        self.advance(PassState::Loaded)?;

        let privileges = desired
            .privileges
            .as_deref()
            .map(|selected| diff_privileges(&current.privileges, selected))
            .unwrap_or_default();
        let membership = diff_membership(principal, &current.membership, &desired.membership);
        let attributes = match (&desired.attributes, principal.kind) {
            (Some(patch), PrincipalKind::User) => {
                let original = current.attributes.clone().unwrap_or_default();
                let updated = patch.apply(&original);
                let clauses = diff_attributes(&original, &updated);
                Some((clauses, updated))
            }
            (Some(_), _) => {
                warn!(%principal, "attributes apply to users only, ignoring");
                None
            }
            (None, _) => None,
        };
        self.advance(PassState::Diffed)?;

        let mut grants = Vec::with_capacity(privileges.to_grant.len());
        let mut uncertain = Vec::new();
        for selection in privileges.to_grant {
            let key = selection.key;
            let resolution = match selection.object_type {
                Some(object_type) => Resolution::Confirmed(object_type),
                None => self.inventory.resolve(
                    &mut *self.warehouse,
                    &key.schema,
                    &key.object,
                    key.privilege,
                )?,
            };
            let object_type = resolution.object_type();
            if key.object.is_empty() && object_type != ObjectType::Schema {
                warn!(%key, %object_type, "no object named, skipping grant");
                continue;
            }
            if resolution.is_uncertain() {
                uncertain.push(key.clone());
            }
            grants.push(PrivilegeGrant::from_key(key, object_type));
        }
        self.advance(PassState::Resolved)?;

        let mut statements: Vec<Statement> = privileges
            .to_revoke
            .iter()
            .map(|grant| revoke_statement(principal, grant))
            .collect();
        statements.extend(grants.iter().map(|grant| grant_statement(principal, grant)));
        statements.extend(membership.iter().map(membership_statement));
        if let Some((clauses, updated)) = attributes {
            statements.extend(alter_statement(principal, &clauses, &updated));
        }
        self.advance(PassState::Generated)?;

        Ok(Prepared {
            statements,
            uncertain,
        })
    }
}
