//! One-shot tracked execution.

use crate::context::QueryContext;
use crate::dependency::DependencySet;
use liveq_core::Result;
use liveq_storage::TableCache;

/// The outcome of running a query once.
#[derive(Clone, Debug)]
pub struct Execution<T> {
    /// The query result.
    pub value: T,
    /// Every read the query performed.
    pub dependencies: DependencySet,
    /// Commit sequence number of the state the query observed.
    pub sequence: u64,
}

/// Runs `query` against the current state of `cache`, recording its reads.
pub fn execute<T, Q>(cache: &TableCache, query: &Q) -> Result<Execution<T>>
where
    Q: Fn(&QueryContext<'_>) -> Result<T> + ?Sized,
{
    let ctx = QueryContext::new(cache);
    let value = query(&ctx)?;
    Ok(Execution {
        value,
        sequence: ctx.sequence(),
        dependencies: ctx.into_dependencies(),
    })
}
