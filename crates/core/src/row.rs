//! Row structure for liveq.
//!
//! A `Row` is positional: values are indexed by column position in the owning
//! table's schema. Rows are identified by their primary-key column, not by a
//! separate id.

use crate::value::Value;
use alloc::vec::Vec;

/// A row in a table.
#[derive(Clone, Debug)]
pub struct Row {
    /// Version number for change detection. Incremented when a row replaces
    /// an existing row with the same primary key.
    version: u64,
    /// Values stored in this row, indexed by column position.
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given values.
    /// Version defaults to 1 for new rows.
    pub fn new(values: Vec<Value>) -> Self {
        Self { version: 1, values }
    }

    /// Returns the version number.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the version number.
    #[inline]
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Returns a reference to the values.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Gets a value at the given column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of values in this row.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows compare by content; the version is bookkeeping.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
