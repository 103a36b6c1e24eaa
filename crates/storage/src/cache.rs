//! Cache management for liveq.
//!
//! This module provides the `TableCache` struct which manages multiple table
//! stores. Every successful mutation call is one commit: it produces one
//! `TableDiff` per table, stamped with a monotonic sequence number and handed
//! to the registered commit hooks.

use crate::diff::TableDiff;
use crate::hook::{CommitHook, HookId};
use crate::row_store::RowStore;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use liveq_core::schema::Table;
use liveq_core::{Error, Result, Row, Value};

/// Cache for managing multiple table stores.
pub struct TableCache {
    /// Table name → RowStore mapping.
    tables: BTreeMap<String, RowStore>,
    /// Registered commit hooks, in registration order.
    hooks: Vec<(HookId, Rc<dyn CommitHook>)>,
    next_hook_id: HookId,
    /// Sequence number of the last commit.
    sequence: u64,
}

impl TableCache {
    /// Creates a new empty table cache.
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            hooks: Vec::new(),
            next_hook_id: 1,
            sequence: 0,
        }
    }

    /// Creates a table in the cache.
    pub fn create_table(&mut self, schema: Table) -> Result<()> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(Error::invalid_schema(format!(
                "Table already exists: {}",
                name
            )));
        }
        log::debug!("create table {}", name);
        self.tables.insert(name, RowStore::new(schema));
        Ok(())
    }

    /// Drops a table from the cache. Commits a diff flagged as dropped.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        let mut store = self
            .tables
            .remove(name)
            .ok_or_else(|| Error::table_not_found(name))?;
        log::debug!("drop table {}", name);
        let rows = store.clear();
        self.commit(TableDiff::dropped(store.schema_rc(), rows));
        Ok(())
    }

    /// Gets a reference to a table store.
    pub fn get_table(&self, name: &str) -> Option<&RowStore> {
        self.tables.get(name)
    }

    /// Gets a table store or fails with `TableNotFound`.
    pub fn table(&self, name: &str) -> Result<&RowStore> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut RowStore> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns all table names.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Checks if a table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Gets a row by table name and primary key.
    pub fn get(&self, table: &str, key: &Value) -> Result<Option<Rc<Row>>> {
        Ok(self.table(table)?.get(key))
    }

    /// Inserts or replaces a row. Returns its primary key.
    pub fn put(&mut self, table: &str, row: Row) -> Result<Value> {
        let store = self.table_mut(table)?;
        let (pk, old, new) = store.put(row)?;
        let mut diff = TableDiff::new(store.schema_rc());
        diff.record(pk.clone(), old, Some(new));
        self.commit(diff);
        Ok(pk)
    }

    /// Inserts or replaces several rows as one commit.
    ///
    /// Either every row is stored or, on the first failure, none is.
    pub fn bulk_put(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<Value>> {
        let store = self.table_mut(table)?;
        let mut diff = TableDiff::new(store.schema_rc());
        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            match store.put(row) {
                Ok((pk, old, new)) => {
                    diff.record(pk.clone(), old, Some(new));
                    keys.push(pk);
                }
                Err(e) => {
                    log::debug!("bulk put on {} rolled back: {}", table, e);
                    for (pk, change) in diff.changes() {
                        store.restore(pk, change.old.clone());
                    }
                    return Err(e);
                }
            }
        }
        self.commit(diff);
        Ok(keys)
    }

    /// Deletes a row by primary key. Returns true if a row was removed.
    pub fn delete(&mut self, table: &str, key: &Value) -> Result<bool> {
        self.bulk_delete(table, core::slice::from_ref(key))
            .map(|removed| removed > 0)
    }

    /// Deletes several rows as one commit. Missing keys are ignored.
    /// Returns the number of removed rows.
    pub fn bulk_delete(&mut self, table: &str, keys: &[Value]) -> Result<usize> {
        let store = self.table_mut(table)?;
        let mut diff = TableDiff::new(store.schema_rc());
        for key in keys {
            if let Some(old) = store.delete(key) {
                diff.record(key.clone(), Some(old), None);
            }
        }
        let removed = diff.len();
        self.commit(diff);
        Ok(removed)
    }

    /// Removes every row of a table as one commit. Returns the number of
    /// removed rows.
    pub fn clear_table(&mut self, name: &str) -> Result<usize> {
        let store = self.table_mut(name)?;
        let rows = store.clear();
        let mut diff = TableDiff::new(store.schema_rc());
        for (pk, row) in rows {
            diff.record(pk, Some(row), None);
        }
        let removed = diff.len();
        self.commit(diff);
        Ok(removed)
    }

    /// Registers a commit hook.
    pub fn add_commit_hook(&mut self, hook: Rc<dyn CommitHook>) -> HookId {
        let id = self.next_hook_id;
        self.next_hook_id += 1;
        self.hooks.push((id, hook));
        id
    }

    /// Removes a commit hook. Returns true if it was registered.
    pub fn remove_commit_hook(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _)| *hook_id != id);
        self.hooks.len() != before
    }

    /// Returns the sequence number of the last commit.
    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    /// Stamps the diff and notifies hooks. Empty diffs are not committed.
    fn commit(&mut self, mut diff: TableDiff) {
        if diff.is_empty() {
            return;
        }
        self.sequence += 1;
        diff.set_sequence(self.sequence);
        log::trace!(
            "commit #{} on {}: {} change(s)",
            self.sequence,
            diff.table_name(),
            diff.len()
        );
        for (_, hook) in &self.hooks {
            hook.on_commit(&diff);
        }
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use core::cell::RefCell;
    use liveq_core::schema::TableBuilder;
    use liveq_core::DataType;

    fn test_schema(name: &str) -> Table {
        TableBuilder::new(name)
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .add_index("name", true)
            .unwrap()
            .build()
            .unwrap()
    }

    fn user(id: i64, name: &str) -> Row {
        Row::new(vec![Value::Int64(id), Value::String(name.into())])
    }

    /// Captures committed diffs.
    fn recording(cache: &mut TableCache) -> Rc<RefCell<Vec<TableDiff>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        cache.add_commit_hook(Rc::new(move |diff: &TableDiff| {
            sink.borrow_mut().push(diff.clone())
        }));
        seen
    }

    #[test]
    fn test_cache_create_table() {
        let mut cache = TableCache::new();
        assert!(cache.create_table(test_schema("users")).is_ok());
        assert!(cache.has_table("users"));
        assert!(cache.create_table(test_schema("users")).is_err());
        assert_eq!(cache.table_names(), vec!["users"]);
    }

    #[test]
    fn test_cache_put_and_get() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();

        let pk = cache.put("users", user(1, "Alice")).unwrap();
        assert_eq!(pk, Value::Int64(1));
        assert!(cache.get("users", &Value::Int64(1)).unwrap().is_some());
        assert!(cache.get("users", &Value::Int64(2)).unwrap().is_none());
        assert!(cache.get("missing", &Value::Int64(1)).is_err());
    }

    #[test]
    fn test_cache_commit_sequence() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();
        let seen = recording(&mut cache);

        cache.put("users", user(1, "Alice")).unwrap();
        cache.bulk_put("users", vec![user(2, "Bob"), user(3, "Carol")]).unwrap();
        cache.delete("users", &Value::Int64(1)).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].len(), 2);
        let sequences: Vec<u64> = seen.iter().map(|d| d.sequence()).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(cache.last_sequence(), 3);
    }

    #[test]
    fn test_cache_noop_delete_is_not_committed() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();
        let seen = recording(&mut cache);

        assert!(!cache.delete("users", &Value::Int64(42)).unwrap());
        assert_eq!(cache.clear_table("users").unwrap(), 0);
        assert!(seen.borrow().is_empty());
        assert_eq!(cache.last_sequence(), 0);
    }

    #[test]
    fn test_cache_bulk_put_is_atomic() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();
        cache.put("users", user(1, "Alice")).unwrap();
        let seen = recording(&mut cache);

        // Third row violates the unique name index.
        let result = cache.bulk_put(
            "users",
            vec![user(1, "Alicia"), user(2, "Bob"), user(3, "Alicia")],
        );
        assert!(result.is_err());
        assert!(seen.borrow().is_empty());

        let store = cache.get_table("users").unwrap();
        assert_eq!(store.len(), 1);
        let row = store.get(&Value::Int64(1)).unwrap();
        assert_eq!(row.get(1), Some(&Value::from("Alice")));
        assert_eq!(store.index_get_keys("name", &"Alice".into()).unwrap().len(), 1);
        assert!(store.index_get_keys("name", &"Alicia".into()).unwrap().is_empty());
    }

    #[test]
    fn test_cache_clear_table() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();
        cache.bulk_put("users", vec![user(1, "Alice"), user(2, "Bob")]).unwrap();
        let seen = recording(&mut cache);

        assert_eq!(cache.clear_table("users").unwrap(), 2);
        assert!(cache.has_table("users"));
        assert_eq!(cache.get_table("users").unwrap().len(), 0);
        assert_eq!(seen.borrow()[0].len(), 2);
    }

    #[test]
    fn test_cache_drop_table() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();
        let seen = recording(&mut cache);

        assert!(cache.drop_table("users").is_ok());
        assert!(!cache.has_table("users"));
        assert!(cache.drop_table("users").is_err());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_dropped());
    }

    #[test]
    fn test_cache_remove_hook() {
        let mut cache = TableCache::new();
        cache.create_table(test_schema("users")).unwrap();
        let counter = Rc::new(RefCell::new(0));
        let c = counter.clone();
        let id = cache.add_commit_hook(Rc::new(move |_: &TableDiff| *c.borrow_mut() += 1));

        cache.put("users", user(1, "Alice")).unwrap();
        assert!(cache.remove_commit_hook(id));
        assert!(!cache.remove_commit_hook(id));
        cache.put("users", user(2, "Bob")).unwrap();
        assert_eq!(*counter.borrow(), 1);
    }
}
