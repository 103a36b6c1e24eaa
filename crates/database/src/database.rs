//! Database - Main entry point for liveq.
//!
//! This module provides the `Database` struct which owns the table store and
//! the live query engine observing it.

use crate::config::DatabaseConfig;
use crate::table::TableHandle;
use liveq_core::schema::Table;
use liveq_core::{Error, Result};
use liveq_reactive::{
    FlushMode, LiveQueryError, QueryContext, QueryOptions, ReactiveEngine, Subscription,
};
use liveq_storage::TableCache;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// The main database interface.
///
/// Provides methods for:
/// - Creating and dropping tables
/// - Writes through table handles
/// - Live queries, single and two-stage
/// - Flushing pending live query work
pub struct Database {
    name: String,
    cache: Rc<RefCell<TableCache>>,
    engine: ReactiveEngine,
    config: DatabaseConfig,
    closed: Cell<bool>,
}

impl Database {
    /// Creates a new, empty database.
    pub fn new(name: &str, config: DatabaseConfig) -> Self {
        let cache = Rc::new(RefCell::new(TableCache::new()));
        let engine = ReactiveEngine::new(cache.clone(), config.engine_config().clone());
        log::debug!("open database {}", name);
        Self {
            name: name.to_string(),
            cache,
            engine,
            config,
            closed: Cell::new(false),
        }
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Returns the live query engine.
    pub fn engine(&self) -> &ReactiveEngine {
        &self.engine
    }

    /// Creates a table.
    pub fn create_table(&self, schema: Table) -> Result<()> {
        self.ensure_open()?;
        self.cache.borrow_mut().create_table(schema)
    }

    /// Drops a table. Live queries that read it are re-run and fail.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.write(|cache| cache.drop_table(name))
    }

    /// Gets a handle to a table.
    pub fn table(&self, name: &str) -> Result<TableHandle<'_>> {
        if !self.cache.borrow().has_table(name) {
            return Err(Error::table_not_found(name));
        }
        Ok(TableHandle::new(self, name))
    }

    /// Returns all table names.
    pub fn table_names(&self) -> Vec<String> {
        self.cache
            .borrow()
            .table_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Checks if a table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.cache.borrow().has_table(name)
    }

    /// Runs a read once, without tracking.
    pub fn read<T, Q>(&self, query: Q) -> Result<T>
    where
        Q: Fn(&QueryContext<'_>) -> Result<T>,
    {
        self.engine.execute(query).map(|exec| exec.value)
    }

    /// Subscribes to a live query. See `ReactiveEngine::subscribe`.
    ///
    /// In immediate mode the initial result is delivered before this
    /// returns, once the subscription is registered.
    pub fn live_query<T, Q, N, E>(&self, query: Q, on_next: N, on_error: E) -> Subscription
    where
        T: 'static,
        Q: Fn(&QueryContext<'_>) -> Result<T> + 'static,
        N: Fn(T) + 'static,
        E: Fn(LiveQueryError) + 'static,
    {
        self.live_query_with(query, QueryOptions::new(), on_next, on_error)
    }

    /// Subscribes to a live query with options.
    pub fn live_query_with<T, Q, N, E>(
        &self,
        query: Q,
        options: QueryOptions,
        on_next: N,
        on_error: E,
    ) -> Subscription
    where
        T: 'static,
        Q: Fn(&QueryContext<'_>) -> Result<T> + 'static,
        N: Fn(T) + 'static,
        E: Fn(LiveQueryError) + 'static,
    {
        let sub = self.engine.subscribe_with(query, options, on_next, on_error);
        self.settle();
        sub
    }

    /// Subscribes to a two-stage live query. See
    /// `ReactiveEngine::subscribe_chain`.
    pub fn live_query_chain<U, T, Q, D, N, E>(
        &self,
        upstream: Q,
        downstream: D,
        on_next: N,
        on_error: E,
    ) -> Subscription
    where
        U: 'static,
        T: 'static,
        Q: Fn(&QueryContext<'_>) -> Result<U> + 'static,
        D: Fn(&QueryContext<'_>, &U) -> Result<T> + 'static,
        N: Fn(T) + 'static,
        E: Fn(LiveQueryError) + 'static,
    {
        self.live_query_chain_with(upstream, downstream, QueryOptions::new(), on_next, on_error)
    }

    /// Subscribes to a two-stage live query with options for the upstream
    /// stage.
    pub fn live_query_chain_with<U, T, Q, D, N, E>(
        &self,
        upstream: Q,
        downstream: D,
        options: QueryOptions,
        on_next: N,
        on_error: E,
    ) -> Subscription
    where
        U: 'static,
        T: 'static,
        Q: Fn(&QueryContext<'_>) -> Result<U> + 'static,
        D: Fn(&QueryContext<'_>, &U) -> Result<T> + 'static,
        N: Fn(T) + 'static,
        E: Fn(LiveQueryError) + 'static,
    {
        let sub = self
            .engine
            .subscribe_chain_with(upstream, downstream, options, on_next, on_error);
        self.settle();
        sub
    }

    /// Drains pending live query work. Returns the number of emissions.
    pub fn flush(&self) -> usize {
        self.engine.flush()
    }

    /// Returns true if live query work is pending.
    pub fn has_pending(&self) -> bool {
        self.engine.has_pending()
    }

    /// Ends every live query and rejects further writes. Idempotent.
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        log::debug!("close database {}", self.name);
        self.engine.shutdown();
    }

    /// Returns true once `close()` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.get() {
            return Err(Error::invalid_operation(format!(
                "Database {} is closed",
                self.name
            )));
        }
        Ok(())
    }

    /// Applies one write call. In immediate mode the engine is flushed once
    /// the store is released.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut TableCache) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let result = f(&mut self.cache.borrow_mut())?;
        self.settle();
        Ok(result)
    }

    fn settle(&self) {
        if self.config.engine_config().get_flush_mode() == FlushMode::Immediate {
            self.engine.flush();
        }
    }

    pub(crate) fn cache(&self) -> &RefCell<TableCache> {
        &self.cache
    }
}
