//! Table handle for writes and point reads.

use crate::database::Database;
use liveq_core::{Result, Row, Value};
use std::rc::Rc;

/// A handle to one table of a `Database`.
///
/// Every write call commits at most one diff, so live queries observe a
/// `bulk_put` of many rows as a single change.
pub struct TableHandle<'db> {
    db: &'db Database,
    name: String,
}

impl<'db> TableHandle<'db> {
    pub(crate) fn new(db: &'db Database, name: &str) -> Self {
        Self {
            db,
            name: name.to_string(),
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts or replaces a row. Returns its primary key.
    pub fn put(&self, row: Row) -> Result<Value> {
        self.db.write(|cache| cache.put(&self.name, row))
    }

    /// Inserts or replaces rows atomically.
    pub fn bulk_put(&self, rows: Vec<Row>) -> Result<Vec<Value>> {
        self.db.write(|cache| cache.bulk_put(&self.name, rows))
    }

    /// Deletes a row by primary key. Returns true if it existed.
    pub fn delete(&self, key: &Value) -> Result<bool> {
        self.db.write(|cache| cache.delete(&self.name, key))
    }

    /// Deletes rows by primary key. Returns how many existed.
    pub fn bulk_delete(&self, keys: &[Value]) -> Result<usize> {
        self.db.write(|cache| cache.bulk_delete(&self.name, keys))
    }

    /// Removes every row. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        self.db.write(|cache| cache.clear_table(&self.name))
    }

    /// Reads a row by primary key, untracked.
    pub fn get(&self, key: &Value) -> Result<Option<Rc<Row>>> {
        self.db.cache().borrow().get(&self.name, key)
    }

    /// Returns the row count.
    pub fn count(&self) -> Result<usize> {
        Ok(self.db.cache().borrow().table(&self.name)?.len())
    }
}
