use thiserror::Error;
use tracing::info;

use crate::catalog::{CatalogError, Warehouse};
use crate::generator::statement::{create_statement, drop_statement, Statement};
use crate::model::{Principal, PrincipalKind};

/// Failure to create or drop a principal.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The catalog could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The principal to create already exists.
    #[error("{0} already exists")]
    AlreadyExists(Principal),
    /// The role is still granted to users.
    #[error("{role} is still granted to {} user(s): {}", .users.len(), .users.join(", "))]
    RoleInUse {
        /// Role that was to be dropped.
        role: Principal,
        /// Users holding the role.
        users: Vec<String>,
    },
    /// The warehouse rejected the statement.
    #[error("statement failed: {}", .0.sql)]
    Failed(Statement),
}

fn run<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    statement: Statement,
) -> Result<Statement, LifecycleError> {
    if warehouse.execute(&statement) {
        info!(sql = %statement.sql, "principal lifecycle statement applied");
        Ok(statement)
    } else {
        Err(LifecycleError::Failed(statement))
    }
}

/// Create `principal`. Users start with password login disabled.
pub fn create_principal<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    principal: &Principal,
) -> Result<Statement, LifecycleError> {
    if warehouse.exists(principal)? {
        return Err(LifecycleError::AlreadyExists(principal.clone()));
    }
    run(warehouse, create_statement(principal))
}

/// Drop `principal`.
///
/// Roles still granted to users are refused; revoke them first.
pub fn drop_principal<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    principal: &Principal,
) -> Result<Statement, LifecycleError> {
    if !warehouse.exists(principal)? {
        return Err(CatalogError::UnknownPrincipal(principal.clone()).into());
    }
    if principal.kind == PrincipalKind::Role {
        let users = warehouse.membership(principal)?.users;
        if !users.is_empty() {
            return Err(LifecycleError::RoleInUse {
                role: principal.clone(),
                users: users.into_iter().collect(),
            });
        }
    }
    run(warehouse, drop_statement(principal))
}
