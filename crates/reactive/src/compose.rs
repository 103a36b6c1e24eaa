//! Two-stage live queries.
//!
//! A chained subscription is two units joined by one edge. The source unit
//! runs the upstream query and stores its output in a shared slot; the
//! registry then re-runs the sink unit, which reads the slot as the input of
//! the downstream query. Each unit keeps its own dependency set, so a write
//! that only touches downstream tables re-runs only the sink.

use crate::context::QueryContext;
use crate::error::LiveQueryError;
use crate::execute::execute;
use crate::live_query::{ErrorCallback, NextCallback, Outcome, QueryFn, QueryOptions, Unit};
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use liveq_core::Result;
use liveq_storage::TableCache;

/// A downstream query, parameterised by the upstream output.
pub type ChainFn<U, T> = Rc<dyn Fn(&QueryContext<'_>, &U) -> Result<T>>;

type Slot<U> = Rc<RefCell<Option<U>>>;

/// Upstream stage: feeds its output to the sink.
pub(crate) struct ChainSource<U> {
    query: QueryFn<U>,
    slot: Slot<U>,
    on_error: ErrorCallback,
    options: QueryOptions,
}

impl<U: 'static> Unit for ChainSource<U> {
    fn run(&self, cache: &TableCache) -> Outcome {
        match execute(cache, &*self.query) {
            Ok(exec) => {
                let mut dependencies = exec.dependencies;
                self.options.apply(&mut dependencies);
                let slot = self.slot.clone();
                let value = exec.value;
                Outcome::Ready {
                    dependencies,
                    sequence: exec.sequence,
                    emits: false,
                    deliver: Box::new(move || *slot.borrow_mut() = Some(value)),
                }
            }
            Err(e) => Outcome::Failed {
                error: LiveQueryError::QueryExecution(e),
                report: self.on_error.clone(),
            },
        }
    }
}

/// Downstream stage: emits the composed result.
pub(crate) struct ChainSink<U, T> {
    query: ChainFn<U, T>,
    slot: Slot<U>,
    on_next: NextCallback<T>,
    on_error: ErrorCallback,
}

impl<U: 'static, T: 'static> Unit for ChainSink<U, T> {
    fn run(&self, cache: &TableCache) -> Outcome {
        let input = self.slot.borrow();
        let input = match input.as_ref() {
            Some(input) => input,
            None => return Outcome::Waiting,
        };
        let query = &self.query;
        match execute(cache, &|ctx: &QueryContext<'_>| query(ctx, input)) {
            Ok(exec) => {
                let on_next = self.on_next.clone();
                let value = exec.value;
                Outcome::Ready {
                    dependencies: exec.dependencies,
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

/// Builds the two units of a chained subscription, upstream first. Both
/// stages report errors through the same callback.
pub(crate) fn chain<U: 'static, T: 'static>(
    upstream: QueryFn<U>,
    downstream: ChainFn<U, T>,
    on_next: NextCallback<T>,
    on_error: ErrorCallback,
    options: QueryOptions,
) -> (Rc<dyn Unit>, Rc<dyn Unit>) {
    let slot: Slot<U> = Rc::new(RefCell::new(None));
    let source = ChainSource {
        query: upstream,
        slot: slot.clone(),
        on_error: on_error.clone(),
        options,
    };
    let sink = ChainSink {
        query: downstream,
        slot,
        on_next,
        on_error,
    };
    (Rc::new(source), Rc::new(sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use liveq_core::schema::TableBuilder;
    use liveq_core::{DataType, Row, Value};

    fn cache() -> TableCache {
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
        cache
            .put("items", Row::new(vec!["i1".into(), "la".into()]))
            .unwrap();
        cache
    }

    fn units() -> (Rc<dyn Unit>, Rc<dyn Unit>, Rc<RefCell<Vec<usize>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let (source, target) = chain(
            Rc::new(|_: &QueryContext<'_>| -> Result<Vec<Value>> { Ok(vec![Value::from("la")]) }),
            Rc::new(|ctx: &QueryContext<'_>, layers: &Vec<Value>| -> Result<usize> {
                ctx.table("items")?
                    .where_("layerId")?
                    .any_of(layers.iter().cloned())
                    .count()
            }),
            Rc::new(move |n: usize| sink.borrow_mut().push(n)),
            Rc::new(|_: LiveQueryError| {}),
            QueryOptions::new(),
        );
        (source, target, seen)
    }

    #[test]
    fn test_sink_waits_for_input() {
        let cache = cache();
        let (_, sink, _) = units();
        assert!(matches!(sink.run(&cache), Outcome::Waiting));
    }

    #[test]
    fn test_source_feeds_sink() {
        let cache = cache();
        let (source, sink, seen) = units();

        match source.run(&cache) {
            Outcome::Ready { emits, deliver, .. } => {
                assert!(!emits);
                deliver();
            }
            _ => panic!("expected upstream result"),
        }
        match sink.run(&cache) {
            Outcome::Ready { emits, deliver, dependencies, .. } => {
                assert!(emits);
                assert_eq!(dependencies.len(), 1);
                deliver();
            }
            _ => panic!("expected downstream result"),
        }
        assert_eq!(*seen.borrow(), vec![1]);
    }
}
