//! A named collection of tables.

use std::collections::HashMap;

use super::Table;

/// A database owns its tables. Dropping a `Database` drops every
/// `Table` in it; there is no separate teardown step.
pub struct Database {
    name: String,
    tables: HashMap<String, Table>,
}

impl Database {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), table);
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(name)
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Iterates every table the database owns, for the snapshot
    /// store's save path and for WAL checkpoint CRC computation.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.tables.values().any(Table::is_dirty)
    }
}
