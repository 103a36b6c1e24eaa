//! liveq Database - Entry point for the liveq live query store.
//!
//! This crate wires the indexed table store to the live query engine:
//! writes go through table handles, and every subscribed query is re-run
//! only when a committed write touches what it read.
//!
//! # Core Components
//!
//! - `Database`: Owns the tables and the live query engine
//! - `TableHandle`: Writes and point reads on one table
//! - `DatabaseConfig`: Flush mode and round limit
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use liveq_core::schema::TableBuilder;
//! use liveq_core::{DataType, Row, Value};
//! use liveq_database::{Database, DatabaseConfig};
//! use liveq_reactive::QueryContext;
//!
//! let db = Database::new("mydb", DatabaseConfig::new());
//! db.create_table(
//!     TableBuilder::new("items")
//!         .unwrap()
//!         .add_column("id", DataType::String)
//!         .unwrap()
//!         .add_column("layerId", DataType::String)
//!         .unwrap()
//!         .add_primary_key("id")
//!         .unwrap()
//!         .add_index("layerId", false)
//!         .unwrap()
//!         .build()
//!         .unwrap(),
//! )
//! .unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let sub = db.live_query(
//!     |ctx: &QueryContext<'_>| ctx.table("items")?.where_("layerId")?.equals("layer_A").count(),
//!     move |n: usize| sink.borrow_mut().push(n),
//!     |err| panic!("{}", err),
//! );
//! db.flush();
//!
//! let items = db.table("items").unwrap();
//! items.put(Row::new(vec![Value::from("i1"), Value::from("layer_A")])).unwrap();
//! items.put(Row::new(vec![Value::from("i2"), Value::from("layer_B")])).unwrap();
//! db.flush();
//!
//! assert_eq!(*seen.borrow(), vec![0, 1]);
//! sub.unsubscribe();
//! ```

pub mod config;
pub mod database;
pub mod table;

pub use config::DatabaseConfig;
pub use database::Database;
pub use table::TableHandle;

pub use liveq_reactive::{
    FlushMode, LiveQueryError, QueryContext, QueryOptions, Subscription, SubscriptionState,
};
