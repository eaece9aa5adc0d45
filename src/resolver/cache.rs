use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::catalog::{CatalogError, CatalogReader};
use crate::model::{PrivilegeType, Resolution, SchemaInventory};
use crate::resolver::object_type::{resolve, resolve_with_refresh};

/// Schema inventories known during one reconciliation pass.
///
/// Seeded inventories may be stale. A schema is refreshed from the catalog
/// at most once per pass, the first time a lookup against it misses.
#[derive(Debug, Default)]
pub struct InventoryCache {
    entries: BTreeMap<String, SchemaInventory>,
    refreshed: BTreeSet<String>,
}

impl InventoryCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `schema` with a possibly stale inventory.
    pub fn seed(&mut self, schema: impl Into<String>, inventory: SchemaInventory) {
        let schema = schema.into();
        self.refreshed.remove(&schema);
        self.entries.insert(schema, inventory);
    }

    /// Load `schema` live and mark it fresh for the rest of the pass.
    pub fn load<R: CatalogReader + ?Sized>(
        &mut self,
        reader: &mut R,
        schema: &str,
    ) -> Result<(), CatalogError> {
        let inventory = reader.schema_inventory(schema)?;
        self.store_fresh(schema, inventory);
        Ok(())
    }

    /// Cached inventory for `schema`, if any.
    pub fn get(&self, schema: &str) -> Option<&SchemaInventory> {
        self.entries.get(schema)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the object kind of `schema.object` for `privilege`.
    pub fn resolve<R: CatalogReader + ?Sized>(
        &mut self,
        reader: &mut R,
        schema: &str,
        object: &str,
        privilege: PrivilegeType,
    ) -> Result<Resolution, CatalogError> {
        if self.refreshed.contains(schema) {
            return Ok(resolve(schema, object, privilege, self.entries.get(schema)));
        }
        let (resolution, refreshed) = resolve_with_refresh(
            schema,
            object,
            privilege,
            self.entries.get(schema),
            || {
                debug!(schema, object, "inventory miss, refreshing from catalog");
                reader.schema_inventory(schema)
            },
        )?;
        if let Some(inventory) = refreshed {
            self.store_fresh(schema, inventory);
        }
        Ok(resolution)
    }

    fn store_fresh(&mut self, schema: &str, inventory: SchemaInventory) {
        self.entries.insert(schema.to_string(), inventory);
        self.refreshed.insert(schema.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::{CatalogSnapshot, MemoryCatalog};
    use crate::model::ObjectType;

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new(CatalogSnapshot::default());
        catalog.insert_schema(
            "sales",
            SchemaInventory {
                tables: ["orders".to_string()].into(),
                views: ["returns".to_string()].into(),
                ..SchemaInventory::default()
            },
        );
        catalog
    }

    #[test]
    fn stale_seed_is_refreshed_on_miss() {
        let mut catalog = catalog();
        let mut cache = InventoryCache::new();
        cache.seed("sales", SchemaInventory::default());

        let resolution = cache
            .resolve(&mut catalog, "sales", "returns", PrivilegeType::Select)
            .unwrap();
        assert_eq!(resolution, Resolution::Confirmed(ObjectType::View));
        assert_eq!(catalog.inventory_reads(), 1);
    }

    #[test]
    fn schema_is_refreshed_at_most_once_per_pass() {
        let mut catalog = catalog();
        let mut cache = InventoryCache::new();

        for object in ["missing", "also_missing", "orders"] {
            cache
                .resolve(&mut catalog, "sales", object, PrivilegeType::Select)
                .unwrap();
        }
        assert_eq!(catalog.inventory_reads(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_object_after_refresh_is_uncertain() {
        let mut catalog = catalog();
        let mut cache = InventoryCache::new();
        let resolution = cache
            .resolve(&mut catalog, "sales", "ghost", PrivilegeType::Insert)
            .unwrap();
        assert_eq!(resolution, Resolution::Uncertain(ObjectType::Table));
    }
}
