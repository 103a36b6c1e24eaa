//! Secondary index definition for liveq schema.
//!
//! Indices are single-column and named after the column they cover, so
//! `where_("groupPath")` addresses the index on the `groupPath` column.

use alloc::string::String;

/// A secondary index definition in a table schema.
#[derive(Clone, Debug)]
pub struct IndexDef {
    /// Index name (the indexed column's name).
    name: String,
    /// Position of the indexed column.
    column: usize,
    /// Whether this index enforces uniqueness.
    unique: bool,
}

impl IndexDef {
    /// Creates a new index definition.
    pub fn new(name: impl Into<String>, column: usize) -> Self {
        Self {
            name: name.into(),
            column,
            unique: false,
        }
    }

    /// Sets whether the index is unique.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Returns the index name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed column position.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns whether this index enforces uniqueness.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }
}
