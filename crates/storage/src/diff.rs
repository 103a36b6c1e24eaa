//! Per-commit change sets.
//!
//! A `TableDiff` records, for every primary key touched by one commit, the row
//! before and after the commit. Repeated changes to the same key within a
//! commit are coalesced.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::vec::Vec;
use liveq_core::schema::Table;
use liveq_core::{Row, Value};

/// Kind of a single row change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The key was absent before the commit.
    Insert,
    /// The key was present before and after the commit.
    Update,
    /// The key was absent after the commit.
    Delete,
}

/// Row state before and after a commit for one primary key.
#[derive(Clone, Debug)]
pub struct RowChange {
    /// Row before the commit.
    pub old: Option<Rc<Row>>,
    /// Row after the commit.
    pub new: Option<Rc<Row>>,
}

impl RowChange {
    /// Returns the kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, _) => ChangeKind::Insert,
            (Some(_), Some(_)) => ChangeKind::Update,
            (Some(_), None) => ChangeKind::Delete,
        }
    }

    /// Iterates over the old and new rows that exist.
    pub fn rows(&self) -> impl Iterator<Item = &Rc<Row>> {
        self.old.iter().chain(self.new.iter())
    }
}

/// Change set of one commit on one table.
#[derive(Clone, Debug)]
pub struct TableDiff {
    schema: Rc<Table>,
    changes: BTreeMap<Value, RowChange>,
    dropped: bool,
    sequence: u64,
}

impl TableDiff {
    /// Creates an empty diff for the given table.
    pub fn new(schema: Rc<Table>) -> Self {
        Self {
            schema,
            changes: BTreeMap::new(),
            dropped: false,
            sequence: 0,
        }
    }

    /// Creates a diff describing a dropped table. Every remaining row is
    /// recorded as deleted.
    pub fn dropped(schema: Rc<Table>, rows: impl IntoIterator<Item = (Value, Rc<Row>)>) -> Self {
        let mut diff = Self::new(schema);
        for (pk, row) in rows {
            diff.record(pk, Some(row), None);
        }
        diff.dropped = true;
        diff
    }

    /// Records a change of `key` from `old` to `new`.
    ///
    /// If the key was already touched in this diff, the earliest `old` is kept.
    /// A key that ends up absent both before and after is removed.
    pub fn record(&mut self, key: Value, old: Option<Rc<Row>>, new: Option<Rc<Row>>) {
        let old = match self.changes.remove(&key) {
            Some(prev) => prev.old,
            None => old,
        };
        if old.is_none() && new.is_none() {
            return;
        }
        self.changes.insert(key, RowChange { old, new });
    }

    /// Returns the table name.
    pub fn table_name(&self) -> &str {
        self.schema.name()
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Table {
        &self.schema
    }

    /// Returns true if the diff carries no information. A dropped diff is
    /// never empty.
    pub fn is_empty(&self) -> bool {
        !self.dropped && self.changes.is_empty()
    }

    /// Returns true if this diff describes a dropped table.
    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    /// Returns the number of changed keys.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns changes keyed by primary key.
    pub fn changes(&self) -> &BTreeMap<Value, RowChange> {
        &self.changes
    }

    /// Returns the commit sequence number, assigned when the diff is committed.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Iterates over old and new values of column `index` for every changed
    /// row. May yield duplicates. Yields nothing if the column is unknown.
    pub fn index_values<'a>(&'a self, index: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let column = self.schema.get_column_index(index);
        self.changes
            .values()
            .flat_map(|change| change.rows())
            .filter_map(move |row| column.and_then(|c| row.get(c)))
    }

    /// Returns the distinct old and new values of column `index` for every
    /// changed row, in ascending order.
    pub fn affected_keys(&self, index: &str) -> Vec<Value> {
        self.index_values(index)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
