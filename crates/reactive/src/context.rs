//! Query context.
//!
//! `QueryContext` is the only way a tracked query reads data. Each terminal
//! read (`to_vec`, `primary_keys`, `count`, `get`) returns rows from the store
//! and records one `AccessDescriptor` describing what was read.
//!
//! ```text
//! ctx.table("layers")?                  -> TableReader
//!    .where_("groupPath")?              -> WhereClause
//!    .starts_with("level_A/")           -> Collection
//!    .primary_keys()?                   -> Vec<Value>, records Prefix("level_A/")
//! ```

use crate::access::{AccessDescriptor, AccessKind};
use crate::dependency::DependencySet;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use liveq_core::{Error, KeyRange, Result, Row, Value};
use liveq_storage::{RowStore, TableCache};

/// Read access to the store during one query execution.
pub struct QueryContext<'a> {
    cache: &'a TableCache,
    dependencies: RefCell<DependencySet>,
}

impl<'a> QueryContext<'a> {
    /// Creates a context over `cache` with an empty dependency set.
    pub fn new(cache: &'a TableCache) -> Self {
        Self {
            cache,
            dependencies: RefCell::new(DependencySet::new()),
        }
    }

    /// Opens a table for reading.
    pub fn table(&self, name: &str) -> Result<TableReader<'_, 'a>> {
        let store = self.cache.table(name)?;
        Ok(TableReader { ctx: self, store })
    }

    /// Returns the commit sequence number of the state being read.
    pub fn sequence(&self) -> u64 {
        self.cache.last_sequence()
    }

    /// Returns a copy of the reads recorded so far.
    pub fn dependencies(&self) -> DependencySet {
        self.dependencies.borrow().clone()
    }

    /// Consumes the context and returns the recorded reads.
    pub fn into_dependencies(self) -> DependencySet {
        self.dependencies.into_inner()
    }

    fn record(&self, descriptor: AccessDescriptor) {
        self.dependencies.borrow_mut().record(descriptor);
    }
}

/// Reads over a single table.
pub struct TableReader<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    store: &'a RowStore,
}

impl<'c, 'a> TableReader<'c, 'a> {
    fn name(&self) -> &str {
        self.store.schema().name()
    }

    fn primary_key_name(&self) -> &str {
        self.store.schema().primary_key().name()
    }

    /// Gets a row by primary key.
    pub fn get(&self, key: impl Into<Value>) -> Option<Rc<Row>> {
        let key = key.into();
        let row = self.store.get(&key);
        self.ctx.record(AccessDescriptor::new(
            self.name(),
            self.primary_key_name(),
            AccessKind::Equals(key),
        ));
        row
    }

    /// Returns every row in primary key order.
    pub fn to_vec(&self) -> Vec<Rc<Row>> {
        self.ctx.record(AccessDescriptor::full(self.name()));
        self.store.scan().collect()
    }

    /// Returns every primary key in order.
    pub fn primary_keys(&self) -> Vec<Value> {
        self.ctx.record(AccessDescriptor::full(self.name()));
        self.store.primary_keys()
    }

    /// Returns the number of rows.
    pub fn count(&self) -> usize {
        self.ctx.record(AccessDescriptor::full(self.name()));
        self.store.len()
    }

    /// Starts a lookup through `index`, which may also name the primary key.
    pub fn where_(&self, index: &str) -> Result<WhereClause<'c, 'a>> {
        if !self.store.schema().has_index(index) {
            return Err(Error::index_not_found(self.name(), index));
        }
        Ok(WhereClause {
            ctx: self.ctx,
            store: self.store,
            index: index.to_string(),
        })
    }
}

/// A lookup through one index, awaiting its condition.
pub struct WhereClause<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    store: &'a RowStore,
    index: String,
}

impl<'c, 'a> WhereClause<'c, 'a> {
    fn collection(self, kind: AccessKind) -> Collection<'c, 'a> {
        Collection {
            ctx: self.ctx,
            store: self.store,
            index: self.index,
            kind,
        }
    }

    /// Index value equal to `value`.
    pub fn equals(self, value: impl Into<Value>) -> Collection<'c, 'a> {
        self.collection(AccessKind::Equals(value.into()))
    }

    /// String index value starting with `prefix`.
    pub fn starts_with(self, prefix: impl Into<String>) -> Collection<'c, 'a> {
        self.collection(AccessKind::Prefix(prefix.into()))
    }

    /// Index value equal to any of `values`. The set is captured now.
    pub fn any_of<I, V>(self, values: I) -> Collection<'c, 'a>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.collection(AccessKind::AnyOf(values.into_iter().map(Into::into).collect()))
    }

    /// Index value in `[lower, upper)`.
    pub fn between(self, lower: impl Into<Value>, upper: impl Into<Value>) -> Collection<'c, 'a> {
        self.in_range(KeyRange::bound(lower.into(), upper.into(), false, true))
    }

    /// Index value strictly greater than `value`.
    pub fn above(self, value: impl Into<Value>) -> Collection<'c, 'a> {
        self.in_range(KeyRange::lower_bound(value.into(), true))
    }

    /// Index value strictly less than `value`.
    pub fn below(self, value: impl Into<Value>) -> Collection<'c, 'a> {
        self.in_range(KeyRange::upper_bound(value.into(), true))
    }

    /// Index value inside an arbitrary range.
    pub fn in_range(self, range: KeyRange<Value>) -> Collection<'c, 'a> {
        self.collection(AccessKind::Range(range))
    }
}

/// A pending indexed read. Nothing is read or recorded until a terminal
/// method is called.
pub struct Collection<'c, 'a> {
    ctx: &'c QueryContext<'a>,
    store: &'a RowStore,
    index: String,
    kind: AccessKind,
}

impl<'c, 'a> Collection<'c, 'a> {
    /// Resolves the matching primary keys, ordered by index value then
    /// primary key, and records the read.
    pub fn primary_keys(self) -> Result<Vec<Value>> {
        let keys = match &self.kind {
            AccessKind::Equals(v) => self.store.index_get_keys(&self.index, v)?,
            AccessKind::Prefix(p) => self.store.index_prefix_keys(&self.index, p)?,
            AccessKind::AnyOf(set) => {
                let values: Vec<Value> = set.iter().cloned().collect();
                self.store.index_any_of_keys(&self.index, &values)?
            }
            AccessKind::Range(range) => self.store.index_range_keys(&self.index, range)?,
            AccessKind::Full => self.store.primary_keys(),
        };
        let table = self.store.schema().name().to_string();
        self.ctx
            .record(AccessDescriptor::new(table, self.index, self.kind));
        Ok(keys)
    }

    /// Resolves the matching rows and records the read.
    pub fn to_vec(self) -> Result<Vec<Rc<Row>>> {
        let store = self.store;
        let keys = self.primary_keys()?;
        Ok(store.get_many(&keys))
    }

    /// Counts the matching rows and records the read.
    pub fn count(self) -> Result<usize> {
        self.primary_keys().map(|keys| keys.len())
    }

    /// Returns the first matching row, if any, and records the read.
    pub fn first(self) -> Result<Option<Rc<Row>>> {
        let store = self.store;
        let keys = self.primary_keys()?;
        Ok(keys.first().and_then(|k| store.get(k)))
    }
}
