//! Schema module for liveq.
//!
//! This module contains schema definitions: columns, tables and indices.

mod column;
mod index;
mod table;

pub use column::Column;
pub use index::IndexDef;
pub use table::{Table, TableBuilder};
