//! Query registry and flush scheduling.
//!
//! `QueryRegistry` tracks every live query unit together with the dependency
//! set of its latest execution, routes committed `TableDiff`s to the units
//! they affect and drains the resulting dirty set in `flush()`.
//!
//! Commits only mark units dirty. Any number of commits between two flushes
//! therefore cost one recomputation per affected unit. Within a flush units
//! run by rank (upstream stages first) and then by registration order.
//! Commits made by callbacks during a flush are picked up by a follow-up
//! round of the same flush.

use crate::config::EngineConfig;
use crate::dependency::DependencySet;
use crate::error::{LiveQueryError, LiveQueryResult};
use crate::live_query::{Outcome, Unit};
use crate::subscription::{SharedState, Subscription, SubscriptionId, SubscriptionState};
use alloc::collections::BTreeSet;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::{HashMap, HashSet};
use liveq_storage::{TableCache, TableDiff};

/// Unique identifier for a registered query unit.
pub type QueryId = u64;

/// A registered unit and what it last read.
struct Node {
    unit: Rc<dyn Unit>,
    subscription: SubscriptionId,
    rank: u32,
    /// The unit that consumes this unit's output.
    feeds: Option<QueryId>,
    dependencies: DependencySet,
    last_sequence: u64,
}

struct SubscriptionEntry {
    state: SharedState,
    units: Vec<QueryId>,
}

pub(crate) struct RegistryState {
    nodes: HashMap<QueryId, Node>,
    subscriptions: HashMap<SubscriptionId, SubscriptionEntry>,
    /// Table name -> units whose dependency set reads it
    table_units: HashMap<String, HashSet<QueryId>>,
    dirty: BTreeSet<QueryId>,
    next_query_id: QueryId,
    next_subscription_id: SubscriptionId,
    flushing: bool,
    shut_down: bool,
    max_flush_rounds: usize,
}

impl RegistryState {
    fn new(config: &EngineConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            subscriptions: HashMap::new(),
            table_units: HashMap::new(),
            dirty: BTreeSet::new(),
            next_query_id: 1,
            next_subscription_id: 1,
            flushing: false,
            shut_down: false,
            max_flush_rounds: config.get_max_flush_rounds(),
        }
    }

    /// Removes a subscription and its units. Does not touch its state.
    fn remove_subscription(&mut self, id: SubscriptionId) -> Option<SubscriptionEntry> {
        let entry = self.subscriptions.remove(&id)?;
        for unit in &entry.units {
            if let Some(node) = self.nodes.remove(unit) {
                self.unindex(*unit, &node.dependencies);
            }
            self.dirty.remove(unit);
        }
        Some(entry)
    }

    fn unindex(&mut self, id: QueryId, dependencies: &DependencySet) {
        for table in dependencies.tables() {
            if let Some(units) = self.table_units.get_mut(table) {
                units.remove(&id);
                if units.is_empty() {
                    self.table_units.remove(table);
                }
            }
        }
    }

    fn index(&mut self, id: QueryId, dependencies: &DependencySet) {
        for table in dependencies.tables() {
            self.table_units
                .entry(table.to_string())
                .or_default()
                .insert(id);
        }
    }

    /// Takes the unit out of the dirty set for running. Returns None if the
    /// unit is gone or its subscription no longer delivers.
    fn checkout(&mut self, id: QueryId) -> Option<Rc<dyn Unit>> {
        self.dirty.remove(&id);
        let node = self.nodes.get(&id)?;
        let entry = self.subscriptions.get(&node.subscription)?;
        if !entry.state.get().is_live() {
            return None;
        }
        Some(node.unit.clone())
    }

    /// Stores a fresh dependency set. Returns the unit fed by this one and
    /// the subscription state, or None if the result must be discarded.
    fn accept(
        &mut self,
        id: QueryId,
        dependencies: DependencySet,
        sequence: u64,
    ) -> Option<(Option<(u32, QueryId)>, SharedState)> {
        let node = self.nodes.get(&id)?;
        if sequence < node.last_sequence {
            log::debug!(
                "unit #{} discarded stale result (sequence {} < {})",
                id,
                sequence,
                node.last_sequence
            );
            return None;
        }
        let old = core::mem::take(&mut self.nodes.get_mut(&id)?.dependencies);
        self.unindex(id, &old);
        self.index(id, &dependencies);

        let node = self.nodes.get_mut(&id)?;
        node.dependencies = dependencies;
        node.last_sequence = sequence;
        let subscription = node.subscription;
        let feeds = node.feeds;

        let feeds = feeds.and_then(|next| self.nodes.get(&next).map(|n| (n.rank, next)));
        let state = self.subscriptions.get(&subscription)?.state.clone();
        Some((feeds, state))
    }

    /// Terminates the subscription owning `id` after a query error. Returns
    /// true if the subscription was still live.
    fn fail(&mut self, id: QueryId) -> bool {
        let subscription = match self.nodes.get(&id) {
            Some(node) => node.subscription,
            None => return false,
        };
        match self.remove_subscription(subscription) {
            Some(entry) if entry.state.get().is_live() => {
                entry.state.set(SubscriptionState::Errored);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn on_mutation(&mut self, diff: &TableDiff) {
        let candidates = match self.table_units.get(diff.table_name()) {
            Some(units) => units,
            None => return,
        };
        let mut hit = Vec::new();
        for id in candidates {
            if let Some(node) = self.nodes.get(id) {
                if node.dependencies.intersects(diff) {
                    hit.push(*id);
                }
            }
        }
        log::debug!(
            "commit #{} on {}: {} of {} unit(s) invalidated",
            diff.sequence(),
            diff.table_name(),
            hit.len(),
            candidates.len()
        );
        self.dirty.extend(hit);
    }

    /// Moves the dirty set into a run queue ordered by rank, then id.
    fn take_dirty(&mut self) -> BTreeSet<(u32, QueryId)> {
        let dirty = core::mem::take(&mut self.dirty);
        dirty
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|n| (n.rank, id)))
            .collect()
    }

    pub(crate) fn unregister(
        state: &Rc<RefCell<RegistryState>>,
        id: SubscriptionId,
    ) -> LiveQueryResult<()> {
        let entry = state
            .borrow_mut()
            .remove_subscription(id)
            .ok_or_else(|| LiveQueryError::subscription_state(id))?;
        if !entry.state.get().is_terminal() {
            entry.state.set(SubscriptionState::Unsubscribed);
        }
        log::debug!("unsubscribe #{}", id);
        Ok(())
    }
}

/// Resets the flushing flag even if a callback panics.
struct FlushGuard<'a>(&'a RefCell<RegistryState>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.flushing = false;
        }
    }
}

/// A registry that tracks live query units and routes changes to them.
///
/// The registry is an explicit object owned by its engine; nothing about it
/// is global. Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct QueryRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl QueryRegistry {
    /// Creates a new query registry.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(RegistryState::new(config))),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<RegistryState>> {
        Rc::downgrade(&self.state)
    }

    /// Registers a subscription made of `units`, where each unit feeds the
    /// next one. Every unit is marked dirty, so the initial execution happens
    /// on the next flush and never inside this call.
    pub(crate) fn register(&self, units: Vec<Rc<dyn Unit>>) -> Subscription {
        let mut st = self.state.borrow_mut();
        let id = st.next_subscription_id;
        st.next_subscription_id += 1;
        let shared: SharedState = Rc::new(Cell::new(SubscriptionState::Created));

        if st.shut_down {
            log::warn!("subscribe #{} rejected: registry is shut down", id);
            shared.set(SubscriptionState::Unsubscribed);
            return Subscription::new(id, shared, Weak::new());
        }

        let first = st.next_query_id;
        let count = units.len() as QueryId;
        st.next_query_id += count;
        let mut ids = Vec::with_capacity(units.len());
        for (rank, unit) in units.into_iter().enumerate() {
            let query_id = first + rank as QueryId;
            let feeds = if query_id + 1 < first + count {
                Some(query_id + 1)
            } else {
                None
            };
            st.nodes.insert(
                query_id,
                Node {
                    unit,
                    subscription: id,
                    rank: rank as u32,
                    feeds,
                    dependencies: DependencySet::new(),
                    last_sequence: 0,
                },
            );
            st.dirty.insert(query_id);
            ids.push(query_id);
        }
        st.subscriptions.insert(
            id,
            SubscriptionEntry {
                state: shared.clone(),
                units: ids,
            },
        );
        shared.set(SubscriptionState::Pending);
        log::debug!("subscribe #{} ({} unit(s))", id, count);
        Subscription::new(id, shared, Rc::downgrade(&self.state))
    }

    /// Removes a subscription. Fails with `SubscriptionState` if the id is
    /// unknown or already finished.
    pub fn unregister(&self, id: SubscriptionId) -> LiveQueryResult<()> {
        RegistryState::unregister(&self.state, id)
    }

    /// Marks every unit whose latest dependency set intersects `diff` as
    /// dirty.
    pub fn on_mutation(&self, diff: &TableDiff) {
        self.state.borrow_mut().on_mutation(diff);
    }

    /// Recomputes every dirty unit against `cache` and delivers the results.
    ///
    /// Returns the number of emissions delivered to subscribers. A nested
    /// call made from a callback returns 0 immediately; its work is done by
    /// the running flush.
    pub fn flush(&self, cache: &RefCell<TableCache>) -> usize {
        {
            let mut st = self.state.borrow_mut();
            if st.flushing || st.dirty.is_empty() {
                return 0;
            }
            st.flushing = true;
        }
        let _guard = FlushGuard(&self.state);
        let max_rounds = self.state.borrow().max_flush_rounds;

        let mut emitted = 0;
        let mut rounds = 0;
        loop {
            let mut queue = self.state.borrow_mut().take_dirty();
            if queue.is_empty() {
                break;
            }
            if rounds == max_rounds {
                log::warn!(
                    "flush stopped after {} rounds, {} unit(s) left for the next flush",
                    rounds,
                    queue.len()
                );
                self.state
                    .borrow_mut()
                    .dirty
                    .extend(queue.into_iter().map(|(_, id)| id));
                break;
            }
            rounds += 1;
            log::debug!("flush round {}: {} unit(s)", rounds, queue.len());

            while let Some((_, id)) = queue.pop_first() {
                let unit = match self.state.borrow_mut().checkout(id) {
                    Some(unit) => unit,
                    None => continue,
                };
                let outcome = unit.run(&cache.borrow());
                match outcome {
                    Outcome::Waiting => {}
                    Outcome::Ready {
                        dependencies,
                        sequence,
                        emits,
                        deliver,
                    } => {
                        let accepted = self.state.borrow_mut().accept(id, dependencies, sequence);
                        let (feeds, state) = match accepted {
                            Some(accepted) => accepted,
                            None => continue,
                        };
                        // Unsubscribed while the query ran.
                        if !state.get().is_live() {
                            continue;
                        }
                        if let Some(next) = feeds {
                            queue.insert(next);
                        }
                        if emits {
                            state.set(SubscriptionState::Active);
                            emitted += 1;
                        }
                        deliver();
                    }
                    Outcome::Failed { error, report } => {
                        let live = self.state.borrow_mut().fail(id);
                        if live {
                            log::debug!("unit #{} failed: {}", id, error);
                            report(error);
                        }
                    }
                }
            }
        }
        emitted
    }

    /// Drains every subscription, marking each `Unsubscribed`. Later
    /// registrations are rejected.
    pub fn shutdown(&self) {
        let entries: Vec<SubscriptionEntry> = {
            let mut st = self.state.borrow_mut();
            st.shut_down = true;
            st.nodes.clear();
            st.table_units.clear();
            st.dirty.clear();
            st.subscriptions.drain().map(|(_, e)| e).collect()
        };
        log::debug!("registry shutdown: {} subscription(s) drained", entries.len());
        for entry in entries {
            if !entry.state.get().is_terminal() {
                entry.state.set(SubscriptionState::Unsubscribed);
            }
        }
    }

    /// Returns true once `shutdown()` has run.
    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.state.borrow().subscriptions.len()
    }

    /// Returns the number of registered units.
    pub fn query_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    /// Returns true if a flush has work to do.
    pub fn has_pending(&self) -> bool {
        !self.state.borrow().dirty.is_empty()
    }

    /// Returns the number of units reading `table`.
    pub fn queries_for_table(&self, table: &str) -> usize {
        self.state
            .borrow()
            .table_units
            .get(table)
            .map(|units| units.len())
            .unwrap_or(0)
    }

    /// Returns the latest dependency set of every unit of a subscription,
    /// upstream first.
    pub fn dependencies(&self, id: SubscriptionId) -> Vec<DependencySet> {
        let st = self.state.borrow();
        st.subscriptions
            .get(&id)
            .map(|entry| {
                entry
                    .units
                    .iter()
                    .filter_map(|unit| st.nodes.get(unit).map(|n| n.dependencies.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
