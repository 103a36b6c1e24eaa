//! Table definition for liveq schema.

use super::column::Column;
use super::index::IndexDef;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::DataType;
use crate::value::Value;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// A table definition: columns, a single-column primary key and any number of
/// single-column secondary indices.
#[derive(Clone, Debug)]
pub struct Table {
    /// Table name.
    name: String,
    /// Column definitions.
    columns: Vec<Column>,
    /// Position of the primary key column.
    primary_key: usize,
    /// Secondary index definitions.
    indices: Vec<IndexDef>,
}

impl Table {
    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the secondary indices.
    #[inline]
    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    /// Returns the primary key column.
    #[inline]
    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Gets a column index by name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Gets a secondary index by name.
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indices.iter().find(|i| i.name() == name)
    }

    /// Returns true if `name` addresses the primary key or a secondary index.
    pub fn has_index(&self, name: &str) -> bool {
        self.primary_key().name() == name || self.get_index(name).is_some()
    }

    /// Extracts the primary key value from a row.
    pub fn primary_key_of<'r>(&self, row: &'r Row) -> Option<&'r Value> {
        row.get(self.primary_key)
    }

    /// Extracts the value a row holds for the named index.
    ///
    /// The primary key column is addressable by its own name.
    pub fn index_value_of<'r>(&self, row: &'r Row, index: &str) -> Option<&'r Value> {
        if self.primary_key().name() == index {
            return row.get(self.primary_key);
        }
        self.get_index(index).and_then(|idx| row.get(idx.column()))
    }

    /// Validates a row against this schema: arity, types and nullability.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::invalid_operation(format!(
                "Row for table {} has {} values, expected {}",
                self.name,
                row.len(),
                self.columns.len()
            )));
        }

        for (col, value) in self.columns.iter().zip(row.values()) {
            match value.data_type() {
                None => {
                    if !col.is_nullable() {
                        return Err(Error::null_constraint(col.name()));
                    }
                }
                Some(dt) if dt != col.data_type() => {
                    return Err(Error::type_mismatch(col.name(), col.data_type(), dt));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    primary_key: Option<usize>,
    indices: Vec<IndexDef>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            primary_key: None,
            indices: Vec::new(),
        })
    }

    /// Validates a name follows naming rules.
    fn check_naming_rules(name: &str) -> Result<()> {
        let first = match name.chars().next() {
            Some(c) => c,
            None => return Err(Error::invalid_schema("Name cannot be empty")),
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::invalid_schema(format!(
                "Name must start with letter or underscore: {}",
                name
            )));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::invalid_schema(format!(
                "Name contains invalid characters: {}",
                name
            )));
        }
        Ok(())
    }

    fn column_position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| Error::invalid_schema(format!("Column not found: {}", name)))
    }

    /// Adds a column to the table.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::invalid_schema(format!("Column already exists: {}", name)));
        }
        let position = self.columns.len();
        self.columns.push(Column::new(name, data_type).with_index(position));
        Ok(self)
    }

    /// Marks columns as nullable. Unknown names are ignored.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Sets the primary key column.
    pub fn add_primary_key(mut self, column: &str) -> Result<Self> {
        if self.primary_key.is_some() {
            return Err(Error::invalid_schema(format!(
                "Primary key already defined for table {}",
                self.name
            )));
        }
        self.primary_key = Some(self.column_position(column)?);
        Ok(self)
    }

    /// Adds a secondary index on `column`. The index is named after the column.
    pub fn add_index(mut self, column: &str, unique: bool) -> Result<Self> {
        let position = self.column_position(column)?;
        if self.indices.iter().any(|i| i.name() == column) {
            return Err(Error::invalid_schema(format!("Index already exists: {}", column)));
        }
        self.indices.push(IndexDef::new(column, position).unique(unique));
        Ok(self)
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<Table> {
        let primary_key = self.primary_key.ok_or_else(|| {
            Error::invalid_schema(format!("Table {} has no primary key", self.name))
        })?;

        if self.columns[primary_key].is_nullable() {
            return Err(Error::invalid_schema(format!(
                "Primary key column cannot be nullable: {}",
                self.columns[primary_key].name()
            )));
        }

        if self.indices.iter().any(|i| i.column() == primary_key) {
            return Err(Error::invalid_schema(format!(
                "Primary key column {} cannot carry a secondary index",
                self.columns[primary_key].name()
            )));
        }

        Ok(Table {
            name: self.name,
            columns: self.columns,
            primary_key,
            indices: self.indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn items_table() -> Table {
        TableBuilder::new("items")
            .unwrap()
            .add_column("id", DataType::String)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("layerId", DataType::String)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .add_index("name", false)
            .unwrap()
            .add_index("layerId", false)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_builder() {
        let table = items_table();
        assert_eq!(table.name(), "items");
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.primary_key().name(), "id");
        assert_eq!(table.indices().len(), 2);
    }

    #[test]
    fn test_table_get_column() {
        let table = items_table();
        assert!(table.get_column("id").is_some());
        assert_eq!(table.get_column_index("layerId"), Some(2));
        assert!(table.get_column("unknown").is_none());
    }

    #[test]
    fn test_has_index() {
        let table = items_table();
        assert!(table.has_index("id"));
        assert!(table.has_index("layerId"));
        assert!(!table.has_index("missing"));
    }

    #[test]
    fn test_index_value_of() {
        let table = items_table();
        let row = Row::new(vec!["i1".into(), "item_1".into(), "layer_A".into()]);
        assert_eq!(table.primary_key_of(&row), Some(&Value::from("i1")));
        assert_eq!(table.index_value_of(&row, "layerId"), Some(&Value::from("layer_A")));
        assert_eq!(table.index_value_of(&row, "id"), Some(&Value::from("i1")));
        assert_eq!(table.index_value_of(&row, "nope"), None);
    }

    #[test]
    fn test_validate_row() {
        let table = items_table();
        let ok = Row::new(vec!["i1".into(), "item_1".into(), "layer_A".into()]);
        assert!(table.validate_row(&ok).is_ok());

        let short = Row::new(vec!["i1".into()]);
        assert!(matches!(table.validate_row(&short), Err(Error::InvalidOperation { .. })));

        let wrong_type = Row::new(vec!["i1".into(), Value::Int64(3), "layer_A".into()]);
        assert!(matches!(table.validate_row(&wrong_type), Err(Error::TypeMismatch { .. })));

        let null = Row::new(vec!["i1".into(), Value::Null, "layer_A".into()]);
        assert!(matches!(table.validate_row(&null), Err(Error::NullConstraint { .. })));
    }

    #[test]
    fn test_nullable_column_accepts_null() {
        let table = TableBuilder::new("notes")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("body", DataType::String)
            .unwrap()
            .add_nullable(&["body"])
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap();
        let row = Row::new(vec![Value::Int64(1), Value::Null]);
        assert!(table.validate_row(&row).is_ok());
    }

    #[test]
    fn test_invalid_column_name() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("123invalid", DataType::Int64);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_column() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("id", DataType::Int64);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_primary_key() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .build();
        assert!(matches!(result, Err(Error::InvalidSchema { .. })));
    }

    #[test]
    fn test_index_on_unknown_column() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_index("missing", false);
        assert!(result.is_err());
    }
}
