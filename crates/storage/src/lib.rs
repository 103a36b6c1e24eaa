//! liveq Storage - In-memory table store for liveq.
//!
//! This crate provides the storage collaborator the reactive engine observes:
//!
//! - `RowStore`: Rows of one table keyed by primary key, with secondary indices
//! - `TableCache`: Multi-table store; every mutation call is one commit
//! - `TableDiff`: The per-commit record of which rows changed and how
//! - `CommitHook`: Notification fired after every non-empty commit
//!
//! # Example
//!
//! ```rust
//! use liveq_storage::TableCache;
//! use liveq_core::schema::TableBuilder;
//! use liveq_core::{DataType, Row, Value};
//!
//! let mut cache = TableCache::new();
//! let schema = TableBuilder::new("layers")
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
//! cache.create_table(schema).unwrap();
//!
//! let row = Row::new(vec![Value::from("layer_A"), Value::from("level_A/")]);
//! cache.put("layers", row).unwrap();
//!
//! let store = cache.get_table("layers").unwrap();
//! assert_eq!(store.index_prefix_keys("groupPath", "level_A/").unwrap().len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod diff;
pub mod hook;
pub mod row_store;

pub use cache::TableCache;
pub use diff::{ChangeKind, RowChange, TableDiff};
pub use hook::{CommitHook, HookId};
pub use row_store::RowStore;
