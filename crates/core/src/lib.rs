//! liveq Core - Core types and schema definitions for liveq.
//!
//! This crate provides the foundational types shared by the store and the
//! reactive query engine:
//!
//! - `DataType`: Supported data types (Boolean, Int64, Float64, String)
//! - `Value`: Runtime values that can be stored in a row
//! - `Row`: A row of values with a change-detection version
//! - `KeyRange`: Key ranges used by index scans and range dependencies
//! - `schema`: Schema definitions (Column, Table, IndexDef)
//! - `Error`: Error types for store and query operations
//!
//! # Example
//!
//! ```rust
//! use liveq_core::{DataType, Value, Row};
//! use liveq_core::schema::TableBuilder;
//!
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
//!
//! let row = Row::new(vec![Value::from("layer_A"), Value::from("level_A/")]);
//! assert_eq!(layers.primary_key_of(&row), Some(&Value::from("layer_A")));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod key_range;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use key_range::KeyRange;
pub use row::Row;
pub use types::DataType;
pub use value::Value;
