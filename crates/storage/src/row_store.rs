//! Row storage for liveq.
//!
//! This module provides the `RowStore` struct which manages rows for a single
//! table, keyed by primary key, including secondary index maintenance.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use liveq_core::schema::Table;
use liveq_core::{Error, KeyRange, Result, Row, Value};

/// A secondary index: index key → primary keys holding it.
struct SecondaryIndex {
    column: usize,
    unique: bool,
    entries: BTreeMap<Value, BTreeSet<Value>>,
}

impl SecondaryIndex {
    fn new(column: usize, unique: bool) -> Self {
        Self {
            column,
            unique,
            entries: BTreeMap::new(),
        }
    }

    fn key_of(&self, row: &Row) -> Value {
        row.get(self.column).cloned().unwrap_or(Value::Null)
    }

    fn add(&mut self, key: Value, pk: Value) {
        self.entries.entry(key).or_default().insert(pk);
    }

    fn remove(&mut self, key: &Value, pk: &Value) {
        if let Some(pks) = self.entries.get_mut(key) {
            pks.remove(pk);
            if pks.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// Returns true if `key` is held by a row other than `pk`.
    fn conflicts(&self, key: &Value, pk: &Value) -> bool {
        self.entries
            .get(key)
            .map(|pks| pks.iter().any(|p| p != pk))
            .unwrap_or(false)
    }
}

/// Row storage for a single table.
pub struct RowStore {
    schema: Rc<Table>,
    rows: BTreeMap<Value, Rc<Row>>,
    secondary_indices: BTreeMap<String, SecondaryIndex>,
}

impl RowStore {
    /// Creates a new row store for the given table schema.
    pub fn new(schema: Table) -> Self {
        let secondary_indices = schema
            .indices()
            .iter()
            .map(|idx| {
                (
                    idx.name().to_string(),
                    SecondaryIndex::new(idx.column(), idx.is_unique()),
                )
            })
            .collect();

        Self {
            schema: Rc::new(schema),
            rows: BTreeMap::new(),
            secondary_indices,
        }
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Table {
        &self.schema
    }

    /// Returns a shared handle to the table schema.
    pub fn schema_rc(&self) -> Rc<Table> {
        self.schema.clone()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row, or replaces the row with the same primary key.
    ///
    /// Returns the primary key, the replaced row (if any) and the stored row.
    pub fn put(&mut self, row: Row) -> Result<(Value, Option<Rc<Row>>, Rc<Row>)> {
        self.schema.validate_row(&row)?;
        let pk = self
            .schema
            .primary_key_of(&row)
            .cloned()
            .ok_or_else(|| Error::null_constraint(self.schema.primary_key().name()))?;

        for (name, idx) in &self.secondary_indices {
            if idx.unique {
                let key = idx.key_of(&row);
                if idx.conflicts(&key, &pk) {
                    return Err(Error::unique_constraint(name.clone(), key));
                }
            }
        }

        let old = self.rows.get(&pk).cloned();
        let mut row = row;
        if let Some(ref old_row) = old {
            row.set_version(old_row.version().wrapping_add(1));
            self.unindex(&pk, old_row);
        }

        let row = Rc::new(row);
        self.index(&pk, &row);
        self.rows.insert(pk.clone(), row.clone());
        Ok((pk, old, row))
    }

    /// Deletes the row with the given primary key. Missing keys are a no-op.
    pub fn delete(&mut self, pk: &Value) -> Option<Rc<Row>> {
        let row = self.rows.remove(pk)?;
        self.unindex(pk, &row);
        Some(row)
    }

    /// Restores the row stored under `pk` to `state` without validation.
    ///
    /// Used to roll back a partially applied bulk operation.
    pub(crate) fn restore(&mut self, pk: &Value, state: Option<Rc<Row>>) {
        if let Some(current) = self.rows.remove(pk) {
            self.unindex(pk, &current);
        }
        if let Some(row) = state {
            self.index(pk, &row);
            self.rows.insert(pk.clone(), row);
        }
    }

    /// Removes all rows and returns them in primary key order.
    pub fn clear(&mut self) -> Vec<(Value, Rc<Row>)> {
        for idx in self.secondary_indices.values_mut() {
            idx.entries.clear();
        }
        core::mem::take(&mut self.rows).into_iter().collect()
    }

    fn index(&mut self, pk: &Value, row: &Row) {
        for idx in self.secondary_indices.values_mut() {
            let key = idx.key_of(row);
            idx.add(key, pk.clone());
        }
    }

    fn unindex(&mut self, pk: &Value, row: &Row) {
        for idx in self.secondary_indices.values_mut() {
            let key = idx.key_of(row);
            idx.remove(&key, pk);
        }
    }

    /// Gets a row by primary key.
    pub fn get(&self, pk: &Value) -> Option<Rc<Row>> {
        self.rows.get(pk).cloned()
    }

    /// Gets rows for the given primary keys, skipping missing ones.
    pub fn get_many(&self, pks: &[Value]) -> Vec<Rc<Row>> {
        pks.iter().filter_map(|pk| self.rows.get(pk).cloned()).collect()
    }

    /// Returns an iterator over all rows in primary key order.
    pub fn scan(&self) -> impl Iterator<Item = Rc<Row>> + '_ {
        self.rows.values().cloned()
    }

    /// Returns all primary keys in order.
    pub fn primary_keys(&self) -> Vec<Value> {
        self.rows.keys().cloned().collect()
    }

    fn secondary(&self, index: &str) -> Result<Option<&SecondaryIndex>> {
        if self.schema.primary_key().name() == index {
            return Ok(None);
        }
        self.secondary_indices
            .get(index)
            .map(Some)
            .ok_or_else(|| Error::index_not_found(self.schema.name(), index))
    }

    /// Primary keys of rows whose `index` value lies in `range`, ordered by
    /// index value then primary key.
    ///
    /// `index` may name the primary key column.
    pub fn index_range_keys(&self, index: &str, range: &KeyRange<Value>) -> Result<Vec<Value>> {
        let secondary = self.secondary(index)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let keys = match secondary {
            None => self.rows.range(range.as_bounds()).map(|(pk, _)| pk.clone()).collect(),
            Some(idx) => idx
                .entries
                .range(range.as_bounds())
                .flat_map(|(_, pks)| pks.iter().cloned())
                .collect(),
        };
        Ok(keys)
    }

    /// Primary keys of rows whose `index` value equals `value`.
    pub fn index_get_keys(&self, index: &str, value: &Value) -> Result<Vec<Value>> {
        self.index_range_keys(index, &KeyRange::only(value.clone()))
    }

    /// Primary keys of rows whose string `index` value starts with `prefix`.
    pub fn index_prefix_keys(&self, index: &str, prefix: &str) -> Result<Vec<Value>> {
        let secondary = self.secondary(index)?;
        let start = Value::String(prefix.to_string());
        let range = KeyRange::lower_bound(start, false);
        let keys = match secondary {
            None => self
                .rows
                .range(range.as_bounds())
                .take_while(|(pk, _)| pk.starts_with(prefix))
                .map(|(pk, _)| pk.clone())
                .collect(),
            Some(idx) => idx
                .entries
                .range(range.as_bounds())
                .take_while(|(key, _)| key.starts_with(prefix))
                .flat_map(|(_, pks)| pks.iter().cloned())
                .collect(),
        };
        Ok(keys)
    }

    /// Primary keys of rows whose `index` value is one of `values`, ordered by
    /// index value then primary key. Duplicate values are ignored.
    pub fn index_any_of_keys(&self, index: &str, values: &[Value]) -> Result<Vec<Value>> {
        let secondary = self.secondary(index)?;
        let wanted: BTreeSet<&Value> = values.iter().collect();
        let keys = match secondary {
            None => wanted
                .into_iter()
                .filter(|v| self.rows.contains_key(*v))
                .cloned()
                .collect(),
            Some(idx) => wanted
                .into_iter()
                .filter_map(|v| idx.entries.get(v))
                .flat_map(|pks| pks.iter().cloned())
                .collect(),
        };
        Ok(keys)
    }
}
