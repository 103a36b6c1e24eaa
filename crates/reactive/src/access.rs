//! Access descriptors.
//!
//! Every read a query performs through `QueryContext` is recorded as an
//! `AccessDescriptor`: which table, which index (or the primary key), and what
//! shape of lookup. Invalidation is decided by matching descriptors against
//! committed `TableDiff`s, never by re-running the query.

use alloc::collections::BTreeSet;
use alloc::string::String;
use core::cmp::Ordering;
use liveq_core::{KeyRange, Value};
use liveq_storage::TableDiff;

/// Shape of one recorded read.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessKind {
    /// Lookup of a single key.
    Equals(Value),
    /// String keys starting with the prefix.
    Prefix(String),
    /// Any of a set of keys, frozen when the read happened.
    AnyOf(BTreeSet<Value>),
    /// Keys inside a range.
    Range(KeyRange<Value>),
    /// The whole table.
    Full,
}

impl AccessKind {
    /// Returns true if a row whose index value is `value` is covered by this
    /// read. Keys compare by index order, so `Int64(1)` and `Float64(1.0)`
    /// are the same key here as they are in the store.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            AccessKind::Equals(k) => value.cmp(k) == Ordering::Equal,
            AccessKind::Prefix(p) => value.starts_with(p),
            AccessKind::AnyOf(set) => set.contains(value),
            AccessKind::Range(range) => !range.is_empty() && range.contains(value),
            AccessKind::Full => true,
        }
    }
}

/// A read of `table` through `index` (an index name or the primary key name).
#[derive(Clone, Debug, PartialEq)]
pub struct AccessDescriptor {
    table: String,
    index: String,
    kind: AccessKind,
}

impl AccessDescriptor {
    /// Creates a descriptor.
    pub fn new(table: impl Into<String>, index: impl Into<String>, kind: AccessKind) -> Self {
        Self {
            table: table.into(),
            index: index.into(),
            kind,
        }
    }

    /// Creates a whole-table descriptor.
    pub fn full(table: impl Into<String>) -> Self {
        Self::new(table, String::new(), AccessKind::Full)
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the index name. Empty for whole-table reads.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Returns the access kind.
    pub fn kind(&self) -> &AccessKind {
        &self.kind
    }

    /// Returns true if `diff` may change the rows this read returned.
    ///
    /// Both the old and the new state of every changed row are checked, so
    /// rows moving into and out of the read are both caught. A dropped table
    /// intersects every read of it.
    pub fn intersects(&self, diff: &TableDiff) -> bool {
        if diff.table_name() != self.table {
            return false;
        }
        if diff.is_dropped() {
            return true;
        }
        match self.kind {
            AccessKind::Full => !diff.is_empty(),
            _ => diff.index_values(&self.index).any(|v| {
                let hit = self.kind.matches(v);
                if hit {
                    log::trace!("{}.{} matched {:?} by {:?}", self.table, self.index, v, self.kind);
                }
                hit
            }),
        }
    }
}
