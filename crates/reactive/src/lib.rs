//! liveq Reactive - Live query engine for liveq.
//!
//! This crate decides, for every committed write, which live queries could
//! have a different result, recomputes only those, and delivers each new
//! result once per batch of writes.
//!
//! # Core Concepts
//!
//! - `QueryContext`: The read API a tracked query uses; every read is recorded
//! - `AccessDescriptor`: One recorded read (table, index, equals/prefix/any-of/range/full)
//! - `DependencySet`: The reads of a query's most recent execution
//! - `QueryRegistry`: Routes committed diffs to affected queries, drains them on flush
//! - `ReactiveEngine`: Owns the registry and hooks it into a `TableCache`
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use liveq_core::schema::TableBuilder;
//! use liveq_core::{DataType, Row, Value};
//! use liveq_reactive::{EngineConfig, QueryContext, ReactiveEngine};
//! use liveq_storage::TableCache;
//!
//! let mut cache = TableCache::new();
//! let layers = TableBuilder::new("layers")
//!     .unwrap()
//!     .add_column("id", DataType::String)
//!     .unwrap()
//!     .add_column("groupPath", DataType::String)
//!     .unwrap()
//!     .add_primary_key("id")
//!     .unwrap()
//!     .add_index("groupPath", false)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! cache.create_table(layers).unwrap();
//! let cache = Rc::new(RefCell::new(cache));
//! let engine = ReactiveEngine::new(cache.clone(), EngineConfig::default());
//!
//! let counts = Rc::new(RefCell::new(Vec::new()));
//! let sink = counts.clone();
//! let sub = engine.subscribe(
//!     |ctx: &QueryContext<'_>| {
//!         ctx.table("layers")?.where_("groupPath")?.starts_with("level_A/").count()
//!     },
//!     move |n: usize| sink.borrow_mut().push(n),
//!     |err| panic!("{}", err),
//! );
//! engine.flush();
//!
//! let row = Row::new(vec![Value::from("layer_A000"), Value::from("level_A/")]);
//! cache.borrow_mut().put("layers", row).unwrap();
//! engine.flush();
//!
//! assert_eq!(*counts.borrow(), vec![0, 1]);
//! sub.unsubscribe();
//! ```

#![no_std]

extern crate alloc;

pub mod access;
pub mod compose;
pub mod config;
pub mod context;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod execute;
pub mod live_query;
pub mod registry;
pub mod subscription;

pub use access::{AccessDescriptor, AccessKind};
pub use compose::ChainFn;
pub use config::{EngineConfig, FlushMode};
pub use context::{Collection, QueryContext, TableReader, WhereClause};
pub use dependency::DependencySet;
pub use engine::ReactiveEngine;
pub use error::{LiveQueryError, LiveQueryResult};
pub use execute::{execute, Execution};
pub use live_query::{ErrorCallback, NextCallback, QueryFn, QueryOptions};
pub use registry::{QueryId, QueryRegistry};
pub use subscription::{Subscription, SubscriptionId, SubscriptionState};
