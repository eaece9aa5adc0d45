use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Known object names of one schema, used only to disambiguate object kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInventory {
    /// Base table names.
    #[serde(default)]
    pub tables: BTreeSet<String>,
    /// View names.
    #[serde(default)]
    pub views: BTreeSet<String>,
    /// Function names.
    #[serde(default)]
    pub functions: BTreeSet<String>,
    /// Stored procedure names.
    #[serde(default)]
    pub procedures: BTreeSet<String>,
}

impl SchemaInventory {
    /// True when `name` is a known table.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// True when `name` is a known view.
    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains(name)
    }

    /// True when `name` is a known function.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// True when `name` is a known procedure.
    pub fn has_procedure(&self, name: &str) -> bool {
        self.procedures.contains(name)
    }

    /// True when the inventory lists nothing at all.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.functions.is_empty()
            && self.procedures.is_empty()
    }
}
