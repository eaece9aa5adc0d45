//! Narrow interfaces to the warehouse: catalog reads and statement execution.

/// In-memory catalog backed by a JSON snapshot.
pub mod memory;
/// Live catalog over a Postgres-wire connection.
#[cfg(feature = "postgres")]
pub mod postgres;

use thiserror::Error;

use crate::generator::statement::Statement;
use crate::model::{
    Membership, Principal, PrincipalAttributes, PrincipalState, PrivilegeGrant, SchemaInventory,
};

/// Failure to read state from the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The principal does not exist in the catalog.
    #[error("{0} not found in catalog")]
    UnknownPrincipal(Principal),
    /// A catalog query failed.
    #[error("catalog query failed while {context}: {message}")]
    Query {
        /// What was being read.
        context: String,
        /// Underlying driver message.
        message: String,
    },
    /// A catalog snapshot could not be decoded or encoded.
    #[error("invalid catalog snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Read-only access to current access-control state.
///
/// Empty results are valid and distinct from errors.
pub trait CatalogReader {
    /// Object privileges currently held by `principal`.
    fn privileges(&mut self, principal: &Principal) -> Result<Vec<PrivilegeGrant>, CatalogError>;

    /// Membership sets of `principal`.
    fn membership(&mut self, principal: &Principal) -> Result<Membership, CatalogError>;

    /// Scalar attributes of `principal`; `None` for groups and roles.
    fn attributes(
        &mut self,
        principal: &Principal,
    ) -> Result<Option<PrincipalAttributes>, CatalogError>;

    /// Known object names of `schema`.
    fn schema_inventory(&mut self, schema: &str) -> Result<SchemaInventory, CatalogError>;

    /// Names of every schema.
    fn all_schemas(&mut self) -> Result<Vec<String>, CatalogError>;

    /// Whether `principal` exists.
    fn exists(&mut self, principal: &Principal) -> Result<bool, CatalogError>;

    /// Load everything recorded about `principal`.
    fn principal_state(&mut self, principal: &Principal) -> Result<PrincipalState, CatalogError> {
        if !self.exists(principal)? {
            return Err(CatalogError::UnknownPrincipal(principal.clone()));
        }
        Ok(PrincipalState {
            principal: principal.clone(),
            privileges: self.privileges(principal)?,
            membership: self.membership(principal)?,
            attributes: self.attributes(principal)?,
        })
    }
}

/// Runs one mutating statement at a time.
///
/// Implementations report success or failure only, and must return a
/// bounded failure instead of hanging on network problems.
pub trait StatementExecutor {
    /// Execute `statement`, returning whether it succeeded.
    fn execute(&mut self, statement: &Statement) -> bool;
}

/// A connection able to both read the catalog and execute statements.
pub trait Warehouse: CatalogReader + StatementExecutor {}

impl<T: CatalogReader + StatementExecutor + ?Sized> Warehouse for T {}
