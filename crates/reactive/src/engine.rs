//! The reactive query engine.
//!
//! `ReactiveEngine` ties a shared `TableCache` to a `QueryRegistry`: it
//! installs a commit hook that forwards every committed diff to the registry,
//! and exposes the subscribe / flush / shutdown surface.

use crate::compose::{chain, ChainFn};
use crate::config::EngineConfig;
use crate::context::QueryContext;
use crate::error::LiveQueryError;
use crate::execute::{execute, Execution};
use crate::live_query::{LiveQuery, QueryOptions, Unit};
use crate::registry::{QueryRegistry, RegistryState};
use crate::subscription::Subscription;
use alloc::rc::{Rc, Weak};
use alloc::vec;
use core::cell::{Cell, RefCell};
use liveq_core::Result;
use liveq_storage::{CommitHook, HookId, TableCache, TableDiff};

/// Forwards commits to the registry without keeping it alive.
struct MutationRelay {
    registry: Weak<RefCell<RegistryState>>,
}

impl CommitHook for MutationRelay {
    fn on_commit(&self, diff: &TableDiff) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().on_mutation(diff);
        }
    }
}

/// Live query engine over a shared table cache.
pub struct ReactiveEngine {
    cache: Rc<RefCell<TableCache>>,
    registry: QueryRegistry,
    hook: Cell<Option<HookId>>,
    config: EngineConfig,
}

impl ReactiveEngine {
    /// Creates an engine observing `cache`.
    ///
    /// The cache must not be borrowed while this runs.
    pub fn new(cache: Rc<RefCell<TableCache>>, config: EngineConfig) -> Self {
        let registry = QueryRegistry::new(&config);
        let relay = MutationRelay {
            registry: registry.downgrade(),
        };
        let hook = cache.borrow_mut().add_commit_hook(Rc::new(relay));
        Self {
            cache,
            registry,
            hook: Cell::new(Some(hook)),
            config,
        }
    }

    /// Returns the observed cache.
    pub fn cache(&self) -> &Rc<RefCell<TableCache>> {
        &self.cache
    }

    /// Returns the registry.
    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `query` once against the current state.
    pub fn execute<T, Q>(&self, query: Q) -> Result<Execution<T>>
    where
        Q: Fn(&QueryContext<'_>) -> Result<T>,
    {
        execute(&self.cache.borrow(), &query)
    }

    /// Subscribes to a live query.
    ///
    /// `on_next` receives the initial result on the next flush and a fresh
    /// result after every flush whose commits intersect what the query last
    /// read. `on_error` receives the error that terminates the subscription.
    pub fn subscribe<T, Q, N, E>(&self, query: Q, on_next: N, on_error: E) -> Subscription
    where
        T: 'static,
        Q: Fn(&QueryContext<'_>) -> Result<T> + 'static,
        N: Fn(T) + 'static,
        E: Fn(LiveQueryError) + 'static,
    {
        self.subscribe_with(query, QueryOptions::new(), on_next, on_error)
    }

    /// Subscribes to a live query with options.
    pub fn subscribe_with<T, Q, N, E>(
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
        let unit: Rc<dyn Unit> = Rc::new(LiveQuery::new(
            Rc::new(query),
            Rc::new(on_next),
            Rc::new(on_error),
            options,
        ));
        self.registry.register(vec![unit])
    }

    /// Subscribes to a two-stage live query.
    ///
    /// `upstream` produces an input (typically a key list) and `downstream`
    /// reads with it. A commit touching upstream reads re-runs both stages in
    /// the same flush and yields one emission; a commit touching only
    /// downstream reads re-runs only the downstream stage.
    pub fn subscribe_chain<U, T, Q, D, N, E>(
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
        self.subscribe_chain_with(upstream, downstream, QueryOptions::new(), on_next, on_error)
    }

    /// Subscribes to a two-stage live query with options. The declared
    /// tables widen the upstream stage.
    pub fn subscribe_chain_with<U, T, Q, D, N, E>(
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
        let downstream: ChainFn<U, T> = Rc::new(downstream);
        let (source, sink) = chain(
            Rc::new(upstream),
            downstream,
            Rc::new(on_next),
            Rc::new(on_error),
            options,
        );
        self.registry.register(vec![source, sink])
    }

    /// Handles a committed diff. Called by the commit hook; public for
    /// stores that deliver diffs some other way.
    pub fn on_mutation(&self, diff: &TableDiff) {
        self.registry.on_mutation(diff);
    }

    /// Drains pending recomputations. Returns the number of emissions.
    ///
    /// Must not be called while the cache is mutably borrowed.
    pub fn flush(&self) -> usize {
        self.registry.flush(&self.cache)
    }

    /// Returns true if a flush has work to do.
    pub fn has_pending(&self) -> bool {
        self.registry.has_pending()
    }

    /// Unsubscribes everything and detaches from the cache. Idempotent.
    pub fn shutdown(&self) {
        if let Some(hook) = self.hook.take() {
            self.cache.borrow_mut().remove_commit_hook(hook);
        }
        self.registry.shutdown();
    }
}

impl Drop for ReactiveEngine {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            if let Ok(mut cache) = self.cache.try_borrow_mut() {
                cache.remove_commit_hook(hook);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::SubscriptionState;
    use alloc::vec::Vec;
    use liveq_core::schema::TableBuilder;
    use liveq_core::{DataType, Row, Value};

    fn engine() -> ReactiveEngine {
        let mut cache = TableCache::new();
        cache
            .create_table(
                TableBuilder::new("items")
                    .unwrap()
                    .add_column("id", DataType::String)
                    .unwrap()
                    .add_column("layerId", DataType::String)
                    .unwrap()
                    .add_primary_key("id")
                    .unwrap()
                    .add_index("layerId", false)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        ReactiveEngine::new(Rc::new(RefCell::new(cache)), EngineConfig::default())
    }

    fn put(engine: &ReactiveEngine, id: &str, layer: &str) {
        engine
            .cache()
            .borrow_mut()
            .put("items", Row::new(vec![id.into(), layer.into()]))
            .unwrap();
    }

    fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(T)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v: T| sink.borrow_mut().push(v))
    }

    #[test]
    fn test_commit_hook_drives_invalidation() {
        let engine = engine();
        let (seen, on_next) = recorder::<usize>();
        let _sub = engine.subscribe(
            |ctx: &QueryContext<'_>| ctx.table("items")?.where_("layerId")?.equals("la").count(),
            on_next,
            |_| {},
        );
        assert_eq!(engine.flush(), 1);

        put(&engine, "i1", "lb");
        assert!(!engine.has_pending());
        put(&engine, "i2", "la");
        assert!(engine.has_pending());
        assert_eq!(engine.flush(), 1);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_execute() {
        let engine = engine();
        put(&engine, "i1", "la");
        let exec = engine
            .execute(|ctx: &QueryContext<'_>| Ok(ctx.table("items")?.primary_keys()))
            .unwrap();
        assert_eq!(exec.value, vec![Value::from("i1")]);
        assert_eq!(exec.sequence, 1);
    }

    #[test]
    fn test_chain_emits_once_per_flush() {
        let engine = engine();
        let (seen, on_next) = recorder::<usize>();
        let _sub = engine.subscribe_chain(
            |_: &QueryContext<'_>| Ok(vec![Value::from("la"), Value::from("lc")]),
            |ctx: &QueryContext<'_>, layers: &Vec<Value>| {
                ctx.table("items")?
                    .where_("layerId")?
                    .any_of(layers.iter().cloned())
                    .count()
            },
            on_next,
            |_| {},
        );
        assert_eq!(engine.flush(), 1);
        put(&engine, "i1", "lc");
        put(&engine, "i2", "lb");
        assert_eq!(engine.flush(), 1);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_shutdown_detaches() {
        let engine = engine();
        let (seen, on_next) = recorder::<usize>();
        let sub = engine.subscribe(
            |ctx: &QueryContext<'_>| Ok(ctx.table("items")?.count()),
            on_next,
            |_| {},
        );
        engine.shutdown();
        engine.shutdown();
        assert_eq!(sub.state(), SubscriptionState::Unsubscribed);

        put(&engine, "i1", "la");
        assert_eq!(engine.flush(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_chain_declared_tables_widen_upstream() {
        let engine = engine();
        let (seen, on_next) = recorder::<usize>();
        let _sub = engine.subscribe_chain_with(
            |_: &QueryContext<'_>| Ok(vec![Value::from("la")]),
            |ctx: &QueryContext<'_>, layers: &Vec<Value>| {
                ctx.table("items")?
                    .where_("layerId")?
                    .any_of(layers.iter().cloned())
                    .count()
            },
            QueryOptions::new().tables(["items"]),
            on_next,
            |_| {},
        );
        assert_eq!(engine.flush(), 1);

        // Outside the downstream key set, but the upstream tracks all items.
        put(&engine, "i1", "lz");
        assert_eq!(engine.flush(), 1);
        assert_eq!(*seen.borrow(), vec![0, 0]);
    }

    #[test]
    fn test_numeric_equals_sees_other_numeric_type() {
        let mut cache = TableCache::new();
        cache
            .create_table(
                TableBuilder::new("ranks")
                    .unwrap()
                    .add_column("id", DataType::Int64)
                    .unwrap()
                    .add_column("rank", DataType::Int64)
                    .unwrap()
                    .add_primary_key("id")
                    .unwrap()
                    .add_index("rank", false)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let engine = ReactiveEngine::new(Rc::new(RefCell::new(cache)), EngineConfig::default());

        let (by_rank, on_rank) = recorder::<usize>();
        let _rank = engine.subscribe(
            |ctx: &QueryContext<'_>| ctx.table("ranks")?.where_("rank")?.equals(1.0f64).count(),
            on_rank,
            |_| {},
        );
        let (by_key, on_key) = recorder::<bool>();
        let _key = engine.subscribe(
            |ctx: &QueryContext<'_>| Ok(ctx.table("ranks")?.get(7.0f64).is_some()),
            on_key,
            |_| {},
        );
        engine.flush();

        engine
            .cache()
            .borrow_mut()
            .put("ranks", Row::new(vec![Value::Int64(7), Value::Int64(1)]))
            .unwrap();
        assert_eq!(engine.flush(), 2);
        assert_eq!(*by_rank.borrow(), vec![0, 1]);
        assert_eq!(*by_key.borrow(), vec![false, true]);
    }
}
