//! Tracked query units.
//!
//! A unit is one independently tracked query held by the registry. Running a
//! unit executes its query against the store and returns an `Outcome`; the
//! callbacks the outcome carries are invoked by the registry afterwards, once
//! no store or registry borrow is held, so callbacks are free to write or to
//! unsubscribe.

use crate::context::QueryContext;
use crate::dependency::DependencySet;
use crate::error::LiveQueryError;
use crate::execute::execute;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use liveq_core::Result;
use liveq_storage::TableCache;

/// A tracked query.
pub type QueryFn<T> = Rc<dyn Fn(&QueryContext<'_>) -> Result<T>>;
/// Receives every result of a live query.
pub type NextCallback<T> = Rc<dyn Fn(T)>;
/// Receives the error that terminates a live query.
pub type ErrorCallback = Rc<dyn Fn(LiveQueryError)>;

/// Result of running a unit once.
pub(crate) enum Outcome {
    /// The query succeeded. `deliver` hands the result on; `emits` is true
    /// when that reaches the subscriber rather than another unit.
    Ready {
        dependencies: DependencySet,
        sequence: u64,
        emits: bool,
        deliver: Box<dyn FnOnce()>,
    },
    /// The unit has no input yet.
    Waiting,
    /// The query failed.
    Failed {
        error: LiveQueryError,
        report: ErrorCallback,
    },
}

/// One independently tracked query.
pub(crate) trait Unit {
    fn run(&self, cache: &TableCache) -> Outcome;
}

/// Per-subscription options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    tables: Vec<String>,
}

impl QueryOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the tables the query reads. Any declared table the query
    /// never reads through the context is tracked as a whole.
    pub fn tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tables = tables.into_iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    /// Returns the declared tables.
    pub fn declared_tables(&self) -> &[String] {
        &self.tables
    }

    /// Widens `dependencies` to cover every declared table, logging each
    /// table that was not covered.
    pub(crate) fn apply(&self, dependencies: &mut DependencySet) {
        for table in dependencies.ensure_tables(&self.tables) {
            let err = LiveQueryError::dependency_tracking(
                table,
                "declared but never read, tracking the whole table",
            );
            log::warn!("{}", err);
        }
    }
}

/// A single live query: one unit that emits straight to its subscriber.
pub(crate) struct LiveQuery<T> {
    query: QueryFn<T>,
    on_next: NextCallback<T>,
    on_error: ErrorCallback,
    options: QueryOptions,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new(
        query: QueryFn<T>,
        on_next: NextCallback<T>,
        on_error: ErrorCallback,
        options: QueryOptions,
    ) -> Self {
        Self {
            query,
            on_next,
            on_error,
            options,
        }
    }
}

impl<T: 'static> Unit for LiveQuery<T> {
    fn run(&self, cache: &TableCache) -> Outcome {
        match execute(cache, &*self.query) {
            Ok(exec) => {
                let mut dependencies = exec.dependencies;
                self.options.apply(&mut dependencies);
                let on_next = self.on_next.clone();
                let value = exec.value;
                Outcome::Ready {
                    dependencies,
                    sequence: exec.sequence,
                    emits: true,
                    deliver: Box::new(move || on_next(value)),
                }
            }
            Err(e) => Outcome::Failed {
                error: LiveQueryError::QueryExecution(e),
                report: self.on_error.clone(),
            },
        }
    }
}
