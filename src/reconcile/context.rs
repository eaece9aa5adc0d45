use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{CatalogError, Warehouse};
use crate::model::SchemaInventory;
use crate::resolver::cache::InventoryCache;

/// Stage reached by a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PassState {
    /// Context created, nothing read yet.
    Pending,
    /// Current state loaded from the catalog.
    Loaded,
    /// Current and desired state compared.
    Diffed,
    /// Object kinds of new grants resolved.
    Resolved,
    /// Statements generated.
    Generated,
    /// Statements being applied.
    Executing,
    /// Pass complete.
    Done,
}

impl PassState {
    fn next(self) -> Option<PassState> {
        match self {
            PassState::Pending => Some(PassState::Loaded),
            PassState::Loaded => Some(PassState::Diffed),
            PassState::Diffed => Some(PassState::Resolved),
            PassState::Resolved => Some(PassState::Generated),
            PassState::Generated => Some(PassState::Executing),
            PassState::Executing => Some(PassState::Done),
            PassState::Done => None,
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassState::Pending => write!(f, "PENDING"),
            PassState::Loaded => write!(f, "LOADED"),
            PassState::Diffed => write!(f, "DIFFED"),
            PassState::Resolved => write!(f, "RESOLVED"),
            PassState::Generated => write!(f, "GENERATED"),
            PassState::Executing => write!(f, "EXECUTING"),
            PassState::Done => write!(f, "DONE"),
        }
    }
}

/// Pass-level failure. Nothing has been executed when one is returned.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Current state or an inventory could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A pass stage was entered out of order.
    #[error("reconciliation pass cannot move from {from} to {to}")]
    OutOfOrder {
        /// Stage the pass was in.
        from: PassState,
        /// Stage that was requested.
        to: PassState,
    },
}

/// Everything one reconciliation pass needs, and nothing that outlives it.
///
/// The warehouse is borrowed for the lifetime of the context; running a
/// pass consumes the context, so neither the borrow nor the inventory cache
/// is reused by a later pass.
pub struct ReconciliationContext<'a, W: Warehouse + ?Sized> {
    pub(crate) warehouse: &'a mut W,
    pub(crate) inventory: InventoryCache,
    state: PassState,
}

impl<'a, W: Warehouse + ?Sized> ReconciliationContext<'a, W> {
    /// Start a pass over `warehouse` with an empty inventory cache.
    pub fn new(warehouse: &'a mut W) -> Self {
        Self {
            warehouse,
            inventory: InventoryCache::new(),
            state: PassState::Pending,
        }
    }

    /// Seed the cache with a possibly stale inventory for `schema`.
    pub fn with_inventory(mut self, schema: impl Into<String>, inventory: SchemaInventory) -> Self {
        self.inventory.seed(schema, inventory);
        self
    }

    /// Load the inventory of every schema up front.
    ///
    /// Returns the number of schemas loaded.
    pub fn preload_inventory(&mut self) -> Result<usize, CatalogError> {
        let schemas = self.warehouse.all_schemas()?;
        for schema in &schemas {
            self.inventory.load(&mut *self.warehouse, schema)?;
        }
        info!(schemas = schemas.len(), "preloaded schema inventories");
        Ok(schemas.len())
    }

    /// Current pass stage.
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Inventory cache of this pass.
    pub fn inventory(&self) -> &InventoryCache {
        &self.inventory
    }

    pub(crate) fn advance(&mut self, to: PassState) -> Result<(), ReconcileError> {
        if self.state.next() != Some(to) {
            return Err(ReconcileError::OutOfOrder {
                from: self.state,
                to,
            });
        }
        debug!(from = %self.state, %to, "pass state transition");
        self.state = to;
        Ok(())
    }
}
